/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! This module provides a Data Access Layer (DAL) for managing Plant entities in the database.

use diesel::prelude::*;
use uuid::Uuid;

use crate::dal::DAL;
use crate::store::StoreError;
use solfleet_models::models::plants::{IntegrationStatus, NewPlant, Plant, PlantStatus};
use solfleet_models::schema::plants;

/// Represents the Data Access Layer for Plant-related operations.
pub struct PlantsDAL<'a> {
    /// Reference to the main DAL instance.
    pub dal: &'a DAL,
}

impl PlantsDAL<'_> {
    /// Registers a new plant.
    pub fn create(&self, new_plant: &NewPlant) -> Result<Plant, StoreError> {
        let conn = &mut self.dal.conn()?;
        Ok(diesel::insert_into(plants::table)
            .values(new_plant)
            .get_result(conn)?)
    }

    /// Retrieves a non-deleted plant by its UUID.
    pub fn get(&self, plant_id: Uuid) -> Result<Option<Plant>, StoreError> {
        use solfleet_models::schema::plants::dsl::*;
        let conn = &mut self.dal.conn()?;
        Ok(plants
            .filter(id.eq(plant_id))
            .filter(deleted_at.is_null())
            .first(conn)
            .optional()?)
    }

    /// Lists all plants the scheduler may poll: `integration_status = ACTIVE`
    /// and not soft-deleted.
    pub fn list_active(&self) -> Result<Vec<Plant>, StoreError> {
        use solfleet_models::schema::plants::dsl::*;
        let conn = &mut self.dal.conn()?;
        Ok(plants
            .filter(integration_status.eq(IntegrationStatus::Active.as_str()))
            .filter(deleted_at.is_null())
            .order(created_at.asc())
            .load::<Plant>(conn)?)
    }

    /// Writes a new derived health status for the plant.
    pub fn update_status(&self, plant_id: Uuid, new_status: PlantStatus) -> Result<(), StoreError> {
        let conn = &mut self.dal.conn()?;
        diesel::update(plants::table.filter(plants::id.eq(plant_id)))
            .set((
                plants::status.eq(new_status.as_str()),
                plants::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)?;
        Ok(())
    }

    /// Changes whether the poller may contact the vendor for this plant
    /// (e.g. quarantine after an authentication failure).
    pub fn update_integration_status(
        &self,
        plant_id: Uuid,
        new_status: IntegrationStatus,
    ) -> Result<(), StoreError> {
        let conn = &mut self.dal.conn()?;
        diesel::update(plants::table.filter(plants::id.eq(plant_id)))
            .set((
                plants::integration_status.eq(new_status.as_str()),
                plants::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)?;
        Ok(())
    }
}
