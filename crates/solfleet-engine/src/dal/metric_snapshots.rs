/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! This module provides a Data Access Layer (DAL) for managing MetricSnapshot
//! entities in the database.
//!
//! The `(plant_id, date)` unique index is what makes polling idempotent: a
//! repeated poll for the same local day lands on the same row.

use chrono::NaiveDate;
use diesel::prelude::*;
use uuid::Uuid;

use crate::dal::DAL;
use crate::store::StoreError;
use solfleet_models::models::metric_snapshots::{MetricSnapshot, NewMetricSnapshot};
use solfleet_models::schema::metric_snapshots;

/// Represents the Data Access Layer for MetricSnapshot-related operations.
pub struct MetricSnapshotsDAL<'a> {
    /// Reference to the main DAL instance.
    pub dal: &'a DAL,
}

impl MetricSnapshotsDAL<'_> {
    /// Inserts or replaces the snapshot for the row's `(plant_id, date)`.
    ///
    /// Same local day, same row: values are overwritten, never summed.
    pub fn upsert(&self, snapshot: &NewMetricSnapshot) -> Result<(), StoreError> {
        let conn = &mut self.dal.conn()?;
        diesel::insert_into(metric_snapshots::table)
            .values(snapshot)
            .on_conflict((metric_snapshots::plant_id, metric_snapshots::date))
            .do_update()
            .set((snapshot, metric_snapshots::updated_at.eq(diesel::dsl::now)))
            .execute(conn)?;
        Ok(())
    }

    /// Inserts only when the `(plant_id, date)` row does not exist yet.
    ///
    /// Backfill uses this: historical rows must never clobber data a live
    /// poll already wrote. Returns whether a row was written.
    pub fn insert_if_absent(&self, snapshot: &NewMetricSnapshot) -> Result<bool, StoreError> {
        let conn = &mut self.dal.conn()?;
        let inserted = diesel::insert_into(metric_snapshots::table)
            .values(snapshot)
            .on_conflict((metric_snapshots::plant_id, metric_snapshots::date))
            .do_nothing()
            .execute(conn)?;
        Ok(inserted > 0)
    }

    /// Dates in `[from, to]` that already have a snapshot for the plant.
    pub fn dates_between(
        &self,
        owner_plant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<NaiveDate>, StoreError> {
        use solfleet_models::schema::metric_snapshots::dsl::*;
        let conn = &mut self.dal.conn()?;
        Ok(metric_snapshots
            .filter(plant_id.eq(owner_plant_id))
            .filter(date.ge(from))
            .filter(date.le(to))
            .select(date)
            .order(date.asc())
            .load::<NaiveDate>(conn)?)
    }

    pub fn get_for_date(
        &self,
        owner_plant_id: Uuid,
        snapshot_date: NaiveDate,
    ) -> Result<Option<MetricSnapshot>, StoreError> {
        use solfleet_models::schema::metric_snapshots::dsl::*;
        let conn = &mut self.dal.conn()?;
        Ok(metric_snapshots
            .filter(plant_id.eq(owner_plant_id))
            .filter(date.eq(snapshot_date))
            .first(conn)
            .optional()?)
    }

    pub fn latest(&self, owner_plant_id: Uuid) -> Result<Option<MetricSnapshot>, StoreError> {
        use solfleet_models::schema::metric_snapshots::dsl::*;
        let conn = &mut self.dal.conn()?;
        Ok(metric_snapshots
            .filter(plant_id.eq(owner_plant_id))
            .order(date.desc())
            .first(conn)
            .optional()?)
    }

    /// `today_energy_kwh` of up to `limit` days strictly before `before`,
    /// most recent first. Feeds the low-generation median.
    pub fn daily_energy_before(
        &self,
        owner_plant_id: Uuid,
        before: NaiveDate,
        limit: i64,
    ) -> Result<Vec<f64>, StoreError> {
        use solfleet_models::schema::metric_snapshots::dsl::*;
        let conn = &mut self.dal.conn()?;
        Ok(metric_snapshots
            .filter(plant_id.eq(owner_plant_id))
            .filter(date.lt(before))
            .order(date.desc())
            .limit(limit)
            .select(today_energy_kwh)
            .load::<f64>(conn)?)
    }
}
