/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Metric Snapshot Module
//!
//! One row per plant per local calendar day, summarizing that day's
//! production. The `(plant_id, date)` pair is unique: a poll that lands on a
//! day that already has a row replaces the day's values rather than adding
//! to them.
//!
//! ## Units
//!
//! Power columns are watts, energy columns are kilowatt-hours, timestamps are
//! UTC instants. `date` is the local calendar date in the plant's IANA
//! timezone, not UTC.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a daily metric snapshot in the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::metric_snapshots)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MetricSnapshot {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub plant_id: Uuid,
    /// Local calendar date in the plant's timezone.
    pub date: NaiveDate,
    /// The IANA zone `date` was computed in, recorded for traceability.
    pub timezone: String,
    /// Energy produced so far on `date`, in kWh. Never null.
    pub today_energy_kwh: f64,
    /// Instantaneous production at the last sample, in W.
    pub current_power_w: Option<f64>,
    /// Power flowing to the grid in W; negative means import where the
    /// vendor distinguishes direction.
    pub grid_injection_power_w: Option<f64>,
    /// Lifetime energy of the plant, in kWh.
    pub total_energy_kwh: Option<f64>,
    /// When the vendor last heard from the plant.
    pub last_seen_at: DateTime<Utc>,
    /// When the vendor sampled the values in this row.
    pub source_sampled_at: DateTime<Utc>,
}

/// Represents a new metric snapshot to be inserted into the database.
///
/// Doubles as the changeset for the daily upsert; `treat_none_as_null` so a
/// field the vendor stopped reporting is cleared rather than left stale.
#[derive(Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::metric_snapshots)]
#[diesel(treat_none_as_null = true)]
pub struct NewMetricSnapshot {
    pub plant_id: Uuid,
    pub date: NaiveDate,
    pub timezone: String,
    pub today_energy_kwh: f64,
    pub current_power_w: Option<f64>,
    pub grid_injection_power_w: Option<f64>,
    pub total_energy_kwh: Option<f64>,
    pub last_seen_at: DateTime<Utc>,
    pub source_sampled_at: DateTime<Utc>,
}

impl NewMetricSnapshot {
    /// Creates a new `NewMetricSnapshot`, enforcing the unit contract.
    ///
    /// `today_energy_kwh` is mandatory and must be finite and non-negative; a
    /// pipeline that cannot produce it must fail rather than write a partial
    /// row.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        plant_id: Uuid,
        date: NaiveDate,
        timezone: String,
        today_energy_kwh: f64,
        current_power_w: Option<f64>,
        grid_injection_power_w: Option<f64>,
        total_energy_kwh: Option<f64>,
        last_seen_at: DateTime<Utc>,
        source_sampled_at: DateTime<Utc>,
    ) -> Result<Self, String> {
        if plant_id.is_nil() {
            return Err("Invalid plant ID".to_string());
        }
        if !today_energy_kwh.is_finite() || today_energy_kwh < 0.0 {
            return Err("today_energy_kwh must be finite and non-negative".to_string());
        }
        if let Some(p) = current_power_w {
            if !p.is_finite() || p < 0.0 {
                return Err("current_power_w must be finite and non-negative".to_string());
            }
        }
        if let Some(p) = grid_injection_power_w {
            if !p.is_finite() {
                return Err("grid_injection_power_w must be finite".to_string());
            }
        }
        if let Some(e) = total_energy_kwh {
            if !e.is_finite() || e < 0.0 {
                return Err("total_energy_kwh must be finite and non-negative".to_string());
            }
        }
        if timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(format!("Invalid IANA timezone: {}", timezone));
        }

        Ok(NewMetricSnapshot {
            plant_id,
            date,
            timezone,
            today_energy_kwh,
            current_power_w,
            grid_injection_power_w,
            total_energy_kwh,
            last_seen_at,
            source_sampled_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(today_energy_kwh: f64, current_power_w: Option<f64>) -> Result<NewMetricSnapshot, String> {
        let ts = Utc.with_ymd_and_hms(2026, 2, 18, 14, 30, 0).unwrap();
        NewMetricSnapshot::new(
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2026, 2, 18).unwrap(),
            "America/Sao_Paulo".to_string(),
            today_energy_kwh,
            current_power_w,
            None,
            None,
            ts,
            ts,
        )
    }

    #[test]
    fn test_new_snapshot_success() {
        assert!(sample(28.5, Some(4500.0)).is_ok());
    }

    #[test]
    fn test_new_snapshot_rejects_negative_energy() {
        assert!(sample(-0.1, None).is_err());
    }

    #[test]
    fn test_new_snapshot_rejects_nan_energy() {
        assert!(sample(f64::NAN, None).is_err());
    }

    #[test]
    fn test_new_snapshot_rejects_negative_power() {
        assert!(sample(1.0, Some(-200.0)).is_err());
    }

    #[test]
    fn test_new_snapshot_allows_negative_grid_injection() {
        let ts = Utc.with_ymd_and_hms(2026, 2, 18, 14, 30, 0).unwrap();
        let result = NewMetricSnapshot::new(
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2026, 2, 18).unwrap(),
            "America/Sao_Paulo".to_string(),
            10.0,
            None,
            Some(-350.0),
            None,
            ts,
            ts,
        );
        assert!(result.is_ok(), "grid injection may be negative (import)");
    }
}
