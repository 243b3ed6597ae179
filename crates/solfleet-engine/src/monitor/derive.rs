/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Derived plant conditions: low generation and offline.

use chrono::{DateTime, Utc};

use crate::monitor::hours_since;

/// Minimum history required before the low-generation comparison is made.
const LOW_GEN_MIN_SAMPLES: usize = 3;

/// Hours without vendor contact before a plant counts as offline.
pub const OFFLINE_THRESHOLD_HOURS: f64 = 24.0;

/// Low-generation assessment for today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LowGenLevel {
    /// Production is in the normal band, or there is no basis to judge.
    None,
    /// Today is below 30% of the recent median.
    Yellow,
    /// Today is below 10% of the recent median.
    Red,
}

/// Compares today's production against the median of recent history.
///
/// `history` holds `today_energy_kwh` of up to seven days strictly before
/// today. With fewer than three samples the comparison is skipped and `None`
/// is returned; callers must not resolve an existing LOW_GEN alert in that
/// case (see [`can_judge_low_gen`]).
pub fn low_gen_level(history: &[f64], today_energy_kwh: f64) -> LowGenLevel {
    if history.len() < LOW_GEN_MIN_SAMPLES {
        return LowGenLevel::None;
    }

    let m = median(history);
    if today_energy_kwh < 0.10 * m {
        LowGenLevel::Red
    } else if today_energy_kwh < 0.30 * m {
        LowGenLevel::Yellow
    } else {
        LowGenLevel::None
    }
}

/// Whether there is enough history for the low-generation comparison to mean
/// anything. Distinguishes "normal production" from "cannot judge".
pub fn can_judge_low_gen(history: &[f64]) -> bool {
    history.len() >= LOW_GEN_MIN_SAMPLES
}

/// A plant is offline when the vendor has not heard from it for more than 24
/// hours.
pub fn is_offline(now: DateTime<Utc>, last_seen_at: DateTime<Utc>) -> bool {
    hours_since(now, last_seen_at) > OFFLINE_THRESHOLD_HOURS
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}
