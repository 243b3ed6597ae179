/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Typed persistence operations used by the monitoring pipeline.
//!
//! The pipeline never issues SQL; it goes through [`Store`], which the diesel
//! DAL implements for production and the test suite implements in memory.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use solfleet_models::models::alerts::{Alert, AlertSeverity, AlertType, NewAlert};
use solfleet_models::models::credentials::Credential;
use solfleet_models::models::metric_snapshots::{MetricSnapshot, NewMetricSnapshot};
use solfleet_models::models::plants::{IntegrationStatus, Plant, PlantStatus};
use solfleet_models::models::poll_logs::NewPollLog;

/// Errors surfaced by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("store invariant violated: {0}")]
    Invariant(String),
}

/// Durable, transactional persistence for the monitoring engine.
///
/// Implementations must guarantee at most one metric snapshot per
/// `(plant_id, date)` and support the alert dedup lookup by
/// `(plant_id, type, vendor_alarm_code, device_sn)` over active states.
pub trait Store: Send + Sync {
    // Plants

    /// Fetches a plant by id; soft-deleted plants are not returned.
    fn plant(&self, plant_id: Uuid) -> Result<Option<Plant>, StoreError>;

    /// All plants with `integration_status = ACTIVE` and not soft-deleted.
    fn active_plants(&self) -> Result<Vec<Plant>, StoreError>;

    fn update_plant_status(&self, plant_id: Uuid, status: PlantStatus) -> Result<(), StoreError>;

    fn update_integration_status(
        &self,
        plant_id: Uuid,
        status: IntegrationStatus,
    ) -> Result<(), StoreError>;

    // Credentials

    fn credential_for_plant(&self, plant_id: Uuid) -> Result<Option<Credential>, StoreError>;

    // Metric snapshots

    /// Inserts or replaces the snapshot for `(plant_id, date)`. On update the
    /// day's values are overwritten, never summed.
    fn upsert_snapshot(&self, snapshot: &NewMetricSnapshot) -> Result<(), StoreError>;

    /// Inserts only when no row exists for `(plant_id, date)`; used by the
    /// backfill sweep, which must never overwrite. Returns whether a row was
    /// written.
    fn insert_snapshot_if_absent(&self, snapshot: &NewMetricSnapshot) -> Result<bool, StoreError>;

    /// The set of dates in `[from, to]` that already have a snapshot.
    fn snapshot_dates(
        &self,
        plant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<NaiveDate>, StoreError>;

    fn snapshot_for_date(
        &self,
        plant_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<MetricSnapshot>, StoreError>;

    /// Most recent snapshot for the plant by date, if any.
    fn latest_snapshot(&self, plant_id: Uuid) -> Result<Option<MetricSnapshot>, StoreError>;

    /// `today_energy_kwh` of up to `limit` snapshots strictly before `before`,
    /// most recent first.
    fn daily_energy_before(
        &self,
        plant_id: Uuid,
        before: NaiveDate,
        limit: i64,
    ) -> Result<Vec<f64>, StoreError>;

    // Alerts

    /// The at-most-one active (NEW or ACKED) alert for the dedup key.
    fn active_alert_for_key(
        &self,
        plant_id: Uuid,
        alert_type: AlertType,
        vendor_alarm_code: &str,
        device_sn: &str,
    ) -> Result<Option<Alert>, StoreError>;

    fn active_critical_alert_count(&self, plant_id: Uuid) -> Result<i64, StoreError>;

    fn insert_alert(&self, alert: &NewAlert) -> Result<Alert, StoreError>;

    /// Refreshes an active alert in place: bumps `last_seen_at`, applies the
    /// (possibly upgraded) severity and message, and records whether the
    /// notification layer should re-send.
    fn refresh_alert(
        &self,
        alert_id: Uuid,
        severity: AlertSeverity,
        message: &str,
        last_seen_at: DateTime<Utc>,
        notifiable: bool,
    ) -> Result<(), StoreError>;

    fn resolve_alert(&self, alert_id: Uuid, cleared_at: DateTime<Utc>) -> Result<(), StoreError>;

    // Poll logs

    fn insert_poll_log(&self, log: &NewPollLog) -> Result<(), StoreError>;
}
