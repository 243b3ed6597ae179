/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Credential Module
//!
//! Vendor credentials for a plant, stored encrypted. The blob is opaque to
//! everything except the credential vault; `key_version` records which master
//! key generation sealed it so rotation can re-encrypt lazily.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::plants::Brand;

/// Represents an encrypted vendor credential in the database.
///
/// Unique per `(plant_id, brand)`; a plant owns exactly one credential for
/// its brand and it is removed with the plant.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::credentials)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Credential {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub plant_id: Uuid,
    pub brand: String,
    /// Sealed credential material; never logged, never serialized to clients.
    pub encrypted_blob: Vec<u8>,
    pub key_version: i32,
}

/// Represents a new credential to be inserted into the database.
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::credentials)]
pub struct NewCredential {
    pub plant_id: Uuid,
    pub brand: String,
    pub encrypted_blob: Vec<u8>,
    pub key_version: i32,
}

impl NewCredential {
    pub fn new(
        plant_id: Uuid,
        brand: Brand,
        encrypted_blob: Vec<u8>,
        key_version: i32,
    ) -> Result<Self, String> {
        if plant_id.is_nil() {
            return Err("Invalid plant ID".to_string());
        }
        if encrypted_blob.is_empty() {
            return Err("Encrypted blob cannot be empty".to_string());
        }
        if key_version < 1 {
            return Err("Key version must be positive".to_string());
        }

        Ok(NewCredential {
            plant_id,
            brand: brand.as_str().to_string(),
            encrypted_blob,
            key_version,
        })
    }
}
