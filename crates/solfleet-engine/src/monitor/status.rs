/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Pure health-status evaluation for a plant.
//!
//! First matching rule wins:
//!
//! 1. Integration not ACTIVE -> GREY
//! 2. Any active CRITICAL alert, or no vendor contact for >= 24h, or
//!    low-generation at RED -> RED
//! 3. Vendor contact between 2h and 24h ago, or low-generation at
//!    YELLOW -> YELLOW
//! 4. Otherwise -> GREEN
//!
//! The 2.0h and 24.0h boundaries belong to the higher-severity bucket, so
//! exactly 2h of silence is YELLOW and exactly 24h is RED. A plant that has
//! never been seen at all is treated as stale.

use chrono::{DateTime, Utc};

use crate::monitor::derive::LowGenLevel;
use crate::monitor::hours_since;
use solfleet_models::models::plants::{IntegrationStatus, PlantStatus};

const STALE_YELLOW_HOURS: f64 = 2.0;
const STALE_RED_HOURS: f64 = 24.0;

/// Everything the evaluation depends on.
#[derive(Debug, Clone)]
pub struct StatusInputs {
    pub integration_status: IntegrationStatus,
    pub now: DateTime<Utc>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub active_critical_alerts: i64,
    pub low_gen: LowGenLevel,
}

/// Derives the health tag. Pure; no I/O.
pub fn evaluate(inputs: &StatusInputs) -> PlantStatus {
    if inputs.integration_status != IntegrationStatus::Active {
        return PlantStatus::Grey;
    }

    let silent_hours = inputs
        .last_seen_at
        .map(|seen| hours_since(inputs.now, seen))
        .unwrap_or(f64::INFINITY);

    if inputs.active_critical_alerts > 0
        || silent_hours >= STALE_RED_HOURS
        || inputs.low_gen == LowGenLevel::Red
    {
        return PlantStatus::Red;
    }

    if silent_hours >= STALE_YELLOW_HOURS || inputs.low_gen == LowGenLevel::Yellow {
        return PlantStatus::Yellow;
    }

    PlantStatus::Green
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base_inputs() -> StatusInputs {
        let now = Utc.with_ymd_and_hms(2026, 2, 18, 14, 30, 0).unwrap();
        StatusInputs {
            integration_status: IntegrationStatus::Active,
            now,
            last_seen_at: Some(now - chrono::Duration::minutes(5)),
            active_critical_alerts: 0,
            low_gen: LowGenLevel::None,
        }
    }

    #[test]
    fn test_fresh_active_plant_is_green() {
        assert_eq!(evaluate(&base_inputs()), PlantStatus::Green);
    }

    #[test]
    fn test_inactive_integration_is_grey_regardless() {
        let mut inputs = base_inputs();
        inputs.integration_status = IntegrationStatus::PausedAuthError;
        inputs.active_critical_alerts = 3;
        inputs.low_gen = LowGenLevel::Red;
        assert_eq!(evaluate(&inputs), PlantStatus::Grey);
    }

    #[test]
    fn test_critical_alert_forces_red() {
        let mut inputs = base_inputs();
        inputs.active_critical_alerts = 1;
        assert_eq!(evaluate(&inputs), PlantStatus::Red);
    }

    #[test]
    fn test_low_gen_red_forces_red() {
        let mut inputs = base_inputs();
        inputs.low_gen = LowGenLevel::Red;
        assert_eq!(evaluate(&inputs), PlantStatus::Red);
    }

    #[test]
    fn test_low_gen_yellow_is_yellow() {
        let mut inputs = base_inputs();
        inputs.low_gen = LowGenLevel::Yellow;
        assert_eq!(evaluate(&inputs), PlantStatus::Yellow);
    }

    #[test]
    fn test_staleness_boundaries() {
        let mut inputs = base_inputs();

        // Just under 2h: GREEN
        inputs.last_seen_at = Some(inputs.now - chrono::Duration::minutes(119));
        assert_eq!(evaluate(&inputs), PlantStatus::Green);

        // Exactly 2h: YELLOW (boundary belongs to the higher bucket)
        inputs.last_seen_at = Some(inputs.now - chrono::Duration::hours(2));
        assert_eq!(evaluate(&inputs), PlantStatus::Yellow);

        // Just under 24h: YELLOW
        inputs.last_seen_at = Some(inputs.now - chrono::Duration::minutes(24 * 60 - 1));
        assert_eq!(evaluate(&inputs), PlantStatus::Yellow);

        // Exactly 24h: RED
        inputs.last_seen_at = Some(inputs.now - chrono::Duration::hours(24));
        assert_eq!(evaluate(&inputs), PlantStatus::Red);
    }

    #[test]
    fn test_never_seen_is_red() {
        let mut inputs = base_inputs();
        inputs.last_seen_at = None;
        assert_eq!(evaluate(&inputs), PlantStatus::Red);
    }
}
