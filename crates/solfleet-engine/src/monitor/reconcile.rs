/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Alert reconciliation: merges vendor alarms and derived conditions with the
//! stored alert set.
//!
//! Dedup identity is `(plant_id, type, vendor_alarm_code, device_sn)` over
//! the active states NEW/ACKED. Derived conditions (OFFLINE, LOW_GEN) ride
//! the same machinery with empty code and serial. For each incoming signal:
//!
//! - active row exists, signal active: refresh in place (severity only ever
//!   upgrades, message and last_seen_at update, no new row)
//! - active row exists, signal inactive: transition to RESOLVED
//! - no active row, signal active: insert a NEW alert
//! - no active row, signal inactive: nothing to do

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::adapters::NormalizedAlarm;
use crate::store::{Store, StoreError};
use solfleet_models::models::alerts::{AlertSeverity, AlertType, NewAlert};

/// Minimum gap between notifications for the same alert.
const RENOTIFY_AFTER_HOURS: i64 = 6;

/// One condition to reconcile, vendor-reported or derived.
#[derive(Debug, Clone)]
pub struct AlarmSignal {
    pub alert_type: AlertType,
    pub vendor_alarm_code: String,
    pub device_sn: String,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
    pub is_active: bool,
    pub severity: AlertSeverity,
}

impl AlarmSignal {
    /// A vendor alarm, normalized onto the dedup key (None -> `""`).
    pub fn from_vendor(alarm: NormalizedAlarm) -> Self {
        Self {
            alert_type: AlertType::Fault,
            vendor_alarm_code: alarm.vendor_alarm_code,
            device_sn: alarm.device_sn.unwrap_or_default(),
            message: alarm.message,
            occurred_at: alarm.occurred_at,
            is_active: alarm.is_active,
            severity: alarm.severity,
        }
    }

    /// A derived condition (OFFLINE / LOW_GEN); keyed with empty code and serial.
    pub fn derived(
        alert_type: AlertType,
        is_active: bool,
        severity: AlertSeverity,
        message: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            alert_type,
            vendor_alarm_code: String::new(),
            device_sn: String::new(),
            message,
            occurred_at: now,
            is_active,
            severity,
        }
    }
}

/// Counters for logging and metrics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub raised: usize,
    pub refreshed: usize,
    pub resolved: usize,
}

/// Applies the four-case merge for every signal.
///
/// `silenced_until` suppresses the notifiable flag while the operator mute
/// window is open; alert rows are still created and resolved normally.
pub fn reconcile(
    store: &dyn Store,
    plant_id: Uuid,
    now: DateTime<Utc>,
    silenced_until: Option<DateTime<Utc>>,
    signals: &[AlarmSignal],
) -> Result<ReconcileOutcome, StoreError> {
    let mut outcome = ReconcileOutcome::default();
    let silenced = silenced_until.map(|until| now < until).unwrap_or(false);

    for signal in signals {
        let existing = store.active_alert_for_key(
            plant_id,
            signal.alert_type,
            &signal.vendor_alarm_code,
            &signal.device_sn,
        )?;

        match (existing, signal.is_active) {
            (Some(alert), true) => {
                // Severity never downgrades while the condition is active.
                let severity = alert
                    .severity_parsed()
                    .map(|current| current.max(signal.severity))
                    .unwrap_or(signal.severity);

                let due = alert
                    .last_notified_at
                    .map(|last| now - last >= chrono::Duration::hours(RENOTIFY_AFTER_HOURS))
                    .unwrap_or(true);

                store.refresh_alert(alert.id, severity, &signal.message, now, due && !silenced)?;
                outcome.refreshed += 1;
            }
            (Some(alert), false) => {
                store.resolve_alert(alert.id, now)?;
                outcome.resolved += 1;
            }
            (None, true) => {
                let mut new_alert = NewAlert::new(
                    plant_id,
                    signal.alert_type,
                    signal.severity,
                    Some(signal.vendor_alarm_code.clone()),
                    Some(signal.device_sn.clone()),
                    signal.message.clone(),
                    signal.occurred_at,
                    now,
                )
                .map_err(StoreError::Invariant)?;
                new_alert.notifiable = !silenced;
                store.insert_alert(&new_alert)?;
                outcome.raised += 1;
            }
            (None, false) => {}
        }
    }

    Ok(outcome)
}
