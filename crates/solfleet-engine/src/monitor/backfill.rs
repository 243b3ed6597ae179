/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Gap backfill over the recent snapshot window.
//!
//! The sweep looks at the last four local dates (D-3..D-0), asks the vendor
//! for one range covering the missing ones, and inserts rows for exactly
//! those dates. Existing snapshots are never overwritten by backfill data.

use chrono::NaiveDate;

use crate::adapters::{AdapterError, DailyEnergyPoint};

/// Number of trailing local dates the sweep covers, today included.
pub const BACKFILL_WINDOW_DAYS: i64 = 4;

/// The local dates D-3..D-0 for a given local today, oldest first.
pub fn window_dates(today: NaiveDate) -> Vec<NaiveDate> {
    (0..BACKFILL_WINDOW_DAYS)
        .rev()
        .map(|offset| today - chrono::Duration::days(offset))
        .collect()
}

/// Window dates that have no snapshot yet, oldest first.
pub fn missing_dates(window: &[NaiveDate], present: &[NaiveDate]) -> Vec<NaiveDate> {
    window
        .iter()
        .filter(|d| !present.contains(d))
        .copied()
        .collect()
}

/// Pairs each missing date with its energy from the vendor series.
///
/// Dates the vendor did not report are skipped (there is nothing to write);
/// a reported value violating the energy contract fails the sweep instead of
/// being truncated into the store.
pub fn points_for(
    missing: &[NaiveDate],
    series: &[DailyEnergyPoint],
) -> Result<Vec<(NaiveDate, f64)>, AdapterError> {
    let mut out = Vec::with_capacity(missing.len());
    for date in missing {
        if let Some(point) = series.iter().find(|p| p.date == *date) {
            if !point.energy_kwh.is_finite() || point.energy_kwh < 0.0 {
                return Err(AdapterError::InvalidData(format!(
                    "daily series energy out of range on {}: {}",
                    point.date, point.energy_kwh
                )));
            }
            out.push((*date, point.energy_kwh));
        }
    }
    Ok(out)
}
