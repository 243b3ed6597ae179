/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Alert Module
//!
//! This module defines structures and methods for managing plant alerts.
//!
//! ## Data Model
//!
//! Alerts are deduplicated on the composite key `(plant_id, alert_type,
//! vendor_alarm_code, device_sn)` while in an active state: at most one row
//! with that key may be NEW or ACKED at a time. `vendor_alarm_code` and
//! `device_sn` are stored as empty strings when the source reports nothing,
//! so the key never mixes NULL and `''`.
//!
//! ## Lifecycle
//!
//! - `NEW` on insertion.
//! - `NEW -> ACKED` only by operator action.
//! - `NEW | ACKED -> RESOLVED` by the reconciler when the condition clears.
//! - `RESOLVED` is terminal; a re-occurrence creates a new row.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Alarm severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "LOW",
            AlertSeverity::Medium => "MEDIUM",
            AlertSeverity::High => "HIGH",
            AlertSeverity::Critical => "CRITICAL",
        }
    }

    pub fn parse(s: &str) -> Option<AlertSeverity> {
        match s {
            "LOW" => Some(AlertSeverity::Low),
            "MEDIUM" => Some(AlertSeverity::Medium),
            "HIGH" => Some(AlertSeverity::High),
            "CRITICAL" => Some(AlertSeverity::Critical),
            _ => None,
        }
    }
}

/// Alert lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertState {
    New,
    Acked,
    Resolved,
}

impl AlertState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertState::New => "NEW",
            AlertState::Acked => "ACKED",
            AlertState::Resolved => "RESOLVED",
        }
    }

    pub fn parse(s: &str) -> Option<AlertState> {
        match s {
            "NEW" => Some(AlertState::New),
            "ACKED" => Some(AlertState::Acked),
            "RESOLVED" => Some(AlertState::Resolved),
            _ => None,
        }
    }

    /// NEW and ACKED block a new alert on the same dedup key; RESOLVED does not.
    pub fn is_active(&self) -> bool {
        matches!(self, AlertState::New | AlertState::Acked)
    }
}

/// Alert kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    /// Vendor-reported device or plant fault.
    Fault,
    /// Derived: no vendor contact for more than 24 hours.
    Offline,
    /// Derived: today's production far below the recent median.
    LowGen,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Fault => "FAULT",
            AlertType::Offline => "OFFLINE",
            AlertType::LowGen => "LOW_GEN",
        }
    }

    pub fn parse(s: &str) -> Option<AlertType> {
        match s {
            "FAULT" => Some(AlertType::Fault),
            "OFFLINE" => Some(AlertType::Offline),
            "LOW_GEN" => Some(AlertType::LowGen),
            _ => None,
        }
    }
}

/// Represents an alert in the database.
#[derive(Queryable, Selectable, Identifiable, AsChangeset, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::alerts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Alert {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub plant_id: Uuid,
    pub alert_type: String,
    pub severity: String,
    pub state: String,
    /// Vendor alarm code, or `""` for derived alerts.
    pub vendor_alarm_code: String,
    /// Device serial, or `""` when not device-scoped.
    pub device_sn: String,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
    pub cleared_at: Option<DateTime<Utc>>,
    pub last_notified_at: Option<DateTime<Utc>>,
    pub last_seen_at: DateTime<Utc>,
    /// Set by the reconciler when the notification layer should (re-)send.
    pub notifiable: bool,
}

impl Alert {
    pub fn severity_parsed(&self) -> Option<AlertSeverity> {
        AlertSeverity::parse(&self.severity)
    }

    pub fn state_parsed(&self) -> Option<AlertState> {
        AlertState::parse(&self.state)
    }

    pub fn is_active(&self) -> bool {
        self.state_parsed().map(|s| s.is_active()).unwrap_or(false)
    }
}

/// Represents a new alert to be inserted into the database.
#[derive(Insertable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::alerts)]
pub struct NewAlert {
    pub plant_id: Uuid,
    pub alert_type: String,
    pub severity: String,
    pub state: String,
    pub vendor_alarm_code: String,
    pub device_sn: String,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub notifiable: bool,
}

impl NewAlert {
    /// Creates a new `NewAlert` in state NEW.
    ///
    /// `vendor_alarm_code` and `device_sn` take `None` for "not reported" and
    /// are normalized to empty strings so the dedup key is stable.
    pub fn new(
        plant_id: Uuid,
        alert_type: AlertType,
        severity: AlertSeverity,
        vendor_alarm_code: Option<String>,
        device_sn: Option<String>,
        message: String,
        occurred_at: DateTime<Utc>,
        last_seen_at: DateTime<Utc>,
    ) -> Result<Self, String> {
        if plant_id.is_nil() {
            return Err("Invalid plant ID".to_string());
        }
        if message.trim().is_empty() {
            return Err("Alert message cannot be empty".to_string());
        }

        Ok(NewAlert {
            plant_id,
            alert_type: alert_type.as_str().to_string(),
            severity: severity.as_str().to_string(),
            state: AlertState::New.as_str().to_string(),
            vendor_alarm_code: vendor_alarm_code.unwrap_or_default(),
            device_sn: device_sn.unwrap_or_default(),
            message,
            occurred_at,
            last_seen_at,
            notifiable: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_alert_normalizes_none_to_empty() {
        let now = Utc::now();
        let alert = NewAlert::new(
            Uuid::new_v4(),
            AlertType::Offline,
            AlertSeverity::Critical,
            None,
            None,
            "no vendor contact for 26h".to_string(),
            now,
            now,
        )
        .unwrap();

        assert_eq!(alert.vendor_alarm_code, "");
        assert_eq!(alert.device_sn, "");
        assert_eq!(alert.state, "NEW");
        assert!(alert.notifiable);
    }

    #[test]
    fn test_new_alert_rejects_empty_message() {
        let now = Utc::now();
        let result = NewAlert::new(
            Uuid::new_v4(),
            AlertType::Fault,
            AlertSeverity::Medium,
            Some("GRID_FAULT_001".to_string()),
            Some("INV-1".to_string()),
            "".to_string(),
            now,
            now,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(AlertSeverity::Critical > AlertSeverity::High);
        assert!(AlertSeverity::High > AlertSeverity::Medium);
        assert!(AlertSeverity::Medium > AlertSeverity::Low);
    }

    #[test]
    fn test_state_activity() {
        assert!(AlertState::New.is_active());
        assert!(AlertState::Acked.is_active());
        assert!(!AlertState::Resolved.is_active());
    }

    #[test]
    fn test_type_round_trip() {
        for t in [AlertType::Fault, AlertType::Offline, AlertType::LowGen] {
            assert_eq!(AlertType::parse(t.as_str()), Some(t));
        }
        assert_eq!(AlertType::parse("GRID"), None);
    }
}
