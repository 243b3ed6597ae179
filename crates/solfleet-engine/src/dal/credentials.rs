/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! This module provides a Data Access Layer (DAL) for managing Credential entities in the database.

use diesel::prelude::*;
use uuid::Uuid;

use crate::dal::DAL;
use crate::store::StoreError;
use solfleet_models::models::credentials::{Credential, NewCredential};
use solfleet_models::schema::credentials;

/// Represents the Data Access Layer for Credential-related operations.
pub struct CredentialsDAL<'a> {
    /// Reference to the main DAL instance.
    pub dal: &'a DAL,
}

impl CredentialsDAL<'_> {
    /// Stores a freshly sealed credential for a plant.
    pub fn create(&self, new_credential: &NewCredential) -> Result<Credential, StoreError> {
        let conn = &mut self.dal.conn()?;
        Ok(diesel::insert_into(credentials::table)
            .values(new_credential)
            .get_result(conn)?)
    }

    /// Retrieves the credential owned by a plant, if any.
    pub fn get_for_plant(&self, owner_plant_id: Uuid) -> Result<Option<Credential>, StoreError> {
        use solfleet_models::schema::credentials::dsl::*;
        let conn = &mut self.dal.conn()?;
        Ok(credentials
            .filter(plant_id.eq(owner_plant_id))
            .first(conn)
            .optional()?)
    }

    /// Lists every credential row. Used by key rotation.
    pub fn list(&self) -> Result<Vec<Credential>, StoreError> {
        use solfleet_models::schema::credentials::dsl::*;
        let conn = &mut self.dal.conn()?;
        Ok(credentials.order(created_at.asc()).load::<Credential>(conn)?)
    }

    /// Replaces a credential's sealed blob after re-encryption.
    pub fn update_blob(
        &self,
        credential_id: Uuid,
        blob: Vec<u8>,
        version: i32,
    ) -> Result<(), StoreError> {
        let conn = &mut self.dal.conn()?;
        diesel::update(credentials::table.filter(credentials::id.eq(credential_id)))
            .set((
                credentials::encrypted_blob.eq(blob),
                credentials::key_version.eq(version),
                credentials::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)?;
        Ok(())
    }
}
