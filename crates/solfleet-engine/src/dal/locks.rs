/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! This module provides a Data Access Layer (DAL) for the plant lock table.
//!
//! One row per lock key. Acquisition is a single upsert whose DO UPDATE is
//! guarded by lease expiry, so "absent", "expired" and "held" are decided
//! atomically by the database; release deletes only when the caller token
//! still matches.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::time::Duration;

use crate::dal::DAL;
use crate::store::StoreError;
use solfleet_models::schema::plant_locks;

/// Represents the Data Access Layer for distributed plant locks.
pub struct LocksDAL<'a> {
    /// Reference to the main DAL instance.
    pub dal: &'a DAL,
}

impl LocksDAL<'_> {
    /// Acquire-if-absent-or-expired. Returns false when another holder has a
    /// live lease.
    pub fn acquire(
        &self,
        lock_key: &str,
        lock_holder: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let conn = &mut self.dal.conn()?;
        let expires =
            now + chrono::Duration::from_std(ttl)
                .map_err(|e| StoreError::Invariant(format!("lock TTL out of range: {}", e)))?;

        let upsert = diesel::insert_into(plant_locks::table)
            .values((
                plant_locks::key.eq(lock_key),
                plant_locks::holder.eq(lock_holder),
                plant_locks::acquired_at.eq(now),
                plant_locks::expires_at.eq(expires),
            ))
            .on_conflict(plant_locks::key)
            .do_update()
            .set((
                plant_locks::holder.eq(lock_holder),
                plant_locks::acquired_at.eq(now),
                plant_locks::expires_at.eq(expires),
            ));
        let taken =
            diesel::query_dsl::methods::FilterDsl::filter(upsert, plant_locks::expires_at.le(now))
                .execute(conn)?;

        Ok(taken > 0)
    }

    /// Release-if-owner. Returns false when the key was not held by `lock_holder`.
    pub fn release(&self, lock_key: &str, lock_holder: &str) -> Result<bool, StoreError> {
        let conn = &mut self.dal.conn()?;
        let released = diesel::delete(
            plant_locks::table
                .filter(plant_locks::key.eq(lock_key))
                .filter(plant_locks::holder.eq(lock_holder)),
        )
        .execute(conn)?;
        Ok(released > 0)
    }
}
