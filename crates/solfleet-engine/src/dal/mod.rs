/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Data Access Layer for the monitoring engine.
//!
//! One sub-DAL per entity, all sharing the same connection pool. The [`DAL`]
//! also implements the [`Store`] and [`LockService`] traits the pipeline is
//! written against, so production wiring is just `Arc::new(dal.clone())`.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::PgConnection;
use std::time::Duration;
use uuid::Uuid;

mod alerts;
mod credentials;
mod locks;
mod metric_snapshots;
mod plants;
mod poll_logs;

pub use alerts::AlertsDAL;
pub use credentials::CredentialsDAL;
pub use locks::LocksDAL;
pub use metric_snapshots::MetricSnapshotsDAL;
pub use plants::PlantsDAL;
pub use poll_logs::PollLogsDAL;

use crate::lock::LockService;
use crate::store::{Store, StoreError};
use solfleet_models::models::alerts::{Alert, AlertSeverity, AlertType, NewAlert};
use solfleet_models::models::credentials::Credential;
use solfleet_models::models::metric_snapshots::{MetricSnapshot, NewMetricSnapshot};
use solfleet_models::models::plants::{IntegrationStatus, Plant, PlantStatus};
use solfleet_models::models::poll_logs::NewPollLog;

#[derive(Clone)]
pub struct DAL {
    pub pool: Pool<ConnectionManager<PgConnection>>,
}

impl DAL {
    pub fn new(pool: Pool<ConnectionManager<PgConnection>>) -> Self {
        DAL { pool }
    }

    pub(crate) fn conn(
        &self,
    ) -> Result<PooledConnection<ConnectionManager<PgConnection>>, StoreError> {
        Ok(self.pool.get()?)
    }

    /// Cheap connectivity probe for readiness checks.
    pub fn probe(&self) -> Result<(), StoreError> {
        use diesel::prelude::*;
        let mut conn = self.conn()?;
        diesel::sql_query("SELECT 1").execute(&mut conn)?;
        Ok(())
    }

    pub fn plants(&self) -> PlantsDAL {
        PlantsDAL { dal: self }
    }

    pub fn credentials(&self) -> CredentialsDAL {
        CredentialsDAL { dal: self }
    }

    pub fn metric_snapshots(&self) -> MetricSnapshotsDAL {
        MetricSnapshotsDAL { dal: self }
    }

    pub fn alerts(&self) -> AlertsDAL {
        AlertsDAL { dal: self }
    }

    pub fn poll_logs(&self) -> PollLogsDAL {
        PollLogsDAL { dal: self }
    }

    pub fn locks(&self) -> LocksDAL {
        LocksDAL { dal: self }
    }
}

impl Store for DAL {
    fn plant(&self, plant_id: Uuid) -> Result<Option<Plant>, StoreError> {
        self.plants().get(plant_id)
    }

    fn active_plants(&self) -> Result<Vec<Plant>, StoreError> {
        self.plants().list_active()
    }

    fn update_plant_status(&self, plant_id: Uuid, status: PlantStatus) -> Result<(), StoreError> {
        self.plants().update_status(plant_id, status)
    }

    fn update_integration_status(
        &self,
        plant_id: Uuid,
        status: IntegrationStatus,
    ) -> Result<(), StoreError> {
        self.plants().update_integration_status(plant_id, status)
    }

    fn credential_for_plant(&self, plant_id: Uuid) -> Result<Option<Credential>, StoreError> {
        self.credentials().get_for_plant(plant_id)
    }

    fn upsert_snapshot(&self, snapshot: &NewMetricSnapshot) -> Result<(), StoreError> {
        self.metric_snapshots().upsert(snapshot)
    }

    fn insert_snapshot_if_absent(&self, snapshot: &NewMetricSnapshot) -> Result<bool, StoreError> {
        self.metric_snapshots().insert_if_absent(snapshot)
    }

    fn snapshot_dates(
        &self,
        plant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<NaiveDate>, StoreError> {
        self.metric_snapshots().dates_between(plant_id, from, to)
    }

    fn snapshot_for_date(
        &self,
        plant_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<MetricSnapshot>, StoreError> {
        self.metric_snapshots().get_for_date(plant_id, date)
    }

    fn latest_snapshot(&self, plant_id: Uuid) -> Result<Option<MetricSnapshot>, StoreError> {
        self.metric_snapshots().latest(plant_id)
    }

    fn daily_energy_before(
        &self,
        plant_id: Uuid,
        before: NaiveDate,
        limit: i64,
    ) -> Result<Vec<f64>, StoreError> {
        self.metric_snapshots()
            .daily_energy_before(plant_id, before, limit)
    }

    fn active_alert_for_key(
        &self,
        plant_id: Uuid,
        alert_type: AlertType,
        vendor_alarm_code: &str,
        device_sn: &str,
    ) -> Result<Option<Alert>, StoreError> {
        self.alerts()
            .active_for_key(plant_id, alert_type, vendor_alarm_code, device_sn)
    }

    fn active_critical_alert_count(&self, plant_id: Uuid) -> Result<i64, StoreError> {
        self.alerts().active_critical_count(plant_id)
    }

    fn insert_alert(&self, alert: &NewAlert) -> Result<Alert, StoreError> {
        self.alerts().create(alert)
    }

    fn refresh_alert(
        &self,
        alert_id: Uuid,
        severity: AlertSeverity,
        message: &str,
        last_seen_at: DateTime<Utc>,
        notifiable: bool,
    ) -> Result<(), StoreError> {
        self.alerts()
            .refresh(alert_id, severity, message, last_seen_at, notifiable)
    }

    fn resolve_alert(&self, alert_id: Uuid, cleared_at: DateTime<Utc>) -> Result<(), StoreError> {
        self.alerts().resolve(alert_id, cleared_at)
    }

    fn insert_poll_log(&self, log: &NewPollLog) -> Result<(), StoreError> {
        self.poll_logs().create(log)
    }
}

impl LockService for DAL {
    fn acquire(
        &self,
        key: &str,
        holder: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.locks().acquire(key, holder, ttl, now)
    }

    fn release(&self, key: &str, holder: &str) -> Result<bool, StoreError> {
        self.locks().release(key, holder)
    }
}
