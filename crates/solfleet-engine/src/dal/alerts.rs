/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! This module provides a Data Access Layer (DAL) for managing Alert entities in the database.
//!
//! Dedup queries always compare `vendor_alarm_code` and `device_sn` as
//! strings; "not reported" is stored as `''`, never NULL, so the compound
//! index matches reliably.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::dal::DAL;
use crate::store::StoreError;
use solfleet_models::models::alerts::{
    Alert, AlertSeverity, AlertState, AlertType, NewAlert,
};
use solfleet_models::schema::alerts;

const ACTIVE_STATES: [&str; 2] = ["NEW", "ACKED"];

/// Represents the Data Access Layer for Alert-related operations.
pub struct AlertsDAL<'a> {
    /// Reference to the main DAL instance.
    pub dal: &'a DAL,
}

impl AlertsDAL<'_> {
    /// The at-most-one active alert matching the dedup key.
    pub fn active_for_key(
        &self,
        owner_plant_id: Uuid,
        kind: AlertType,
        code: &str,
        serial: &str,
    ) -> Result<Option<Alert>, StoreError> {
        use solfleet_models::schema::alerts::dsl::*;
        let conn = &mut self.dal.conn()?;
        Ok(alerts
            .filter(plant_id.eq(owner_plant_id))
            .filter(alert_type.eq(kind.as_str()))
            .filter(vendor_alarm_code.eq(code))
            .filter(device_sn.eq(serial))
            .filter(state.eq_any(ACTIVE_STATES))
            .first(conn)
            .optional()?)
    }

    pub fn active_critical_count(&self, owner_plant_id: Uuid) -> Result<i64, StoreError> {
        use solfleet_models::schema::alerts::dsl::*;
        let conn = &mut self.dal.conn()?;
        Ok(alerts
            .filter(plant_id.eq(owner_plant_id))
            .filter(state.eq_any(ACTIVE_STATES))
            .filter(severity.eq(AlertSeverity::Critical.as_str()))
            .count()
            .get_result(conn)?)
    }

    pub fn create(&self, new_alert: &NewAlert) -> Result<Alert, StoreError> {
        let conn = &mut self.dal.conn()?;
        Ok(diesel::insert_into(alerts::table)
            .values(new_alert)
            .get_result(conn)?)
    }

    /// Refreshes an active alert on re-observation of its condition.
    pub fn refresh(
        &self,
        alert_id: Uuid,
        new_severity: AlertSeverity,
        new_message: &str,
        seen_at: DateTime<Utc>,
        can_notify: bool,
    ) -> Result<(), StoreError> {
        let conn = &mut self.dal.conn()?;
        diesel::update(alerts::table.filter(alerts::id.eq(alert_id)))
            .set((
                alerts::severity.eq(new_severity.as_str()),
                alerts::message.eq(new_message),
                alerts::last_seen_at.eq(seen_at),
                alerts::notifiable.eq(can_notify),
                alerts::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)?;
        Ok(())
    }

    /// Terminal transition to RESOLVED. The row stays for history; a
    /// re-occurrence of the same condition creates a fresh row.
    pub fn resolve(&self, alert_id: Uuid, cleared: DateTime<Utc>) -> Result<(), StoreError> {
        let conn = &mut self.dal.conn()?;
        diesel::update(alerts::table.filter(alerts::id.eq(alert_id)))
            .set((
                alerts::state.eq(AlertState::Resolved.as_str()),
                alerts::cleared_at.eq(cleared),
                alerts::notifiable.eq(false),
                alerts::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)?;
        Ok(())
    }
}
