/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! The monitoring loop: scheduler, per-brand queues, poll executor and the
//! derivation/reconciliation machinery behind it.

pub mod backfill;
pub mod derive;
pub mod executor;
pub mod queue;
pub mod reconcile;
pub mod scheduler;
pub mod status;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use solfleet_models::models::plants::Brand;

/// Wall-clock source, injectable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Parses an IANA zone name. Fixed offsets and empty strings do not parse.
pub fn parse_zone(name: &str) -> Result<Tz, String> {
    name.parse::<Tz>()
        .map_err(|_| format!("not an IANA timezone: {:?}", name))
}

/// The local calendar date of an instant in the given zone.
///
/// Snapshot identity is the plant's local day, not the UTC day: an evening
/// reading in Sao Paulo belongs to the local date even when UTC has already
/// rolled over.
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// Fractional hours elapsed between two instants.
pub fn hours_since(now: DateTime<Utc>, then: DateTime<Utc>) -> f64 {
    (now - then).num_seconds() as f64 / 3600.0
}

/// What a ticket asks the executor to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Full poll pipeline: summary, alarms, backfill, derivations, status.
    Poll,
    /// Backfill-only sweep for the given local date.
    Daily(NaiveDate),
}

/// A unit of work in a brand queue.
///
/// Ticket identity is deterministic so that duplicate submissions collapse:
/// resubmitting an id that is already pending or running is a silent no-op.
#[derive(Debug, Clone)]
pub struct JobTicket {
    pub id: String,
    pub plant_id: Uuid,
    pub brand: Brand,
    pub kind: JobKind,
    pub attempt: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl JobTicket {
    pub fn poll(plant_id: Uuid, brand: Brand, enqueued_at: DateTime<Utc>) -> Self {
        Self {
            id: format!("poll:plant:{}:latest", plant_id),
            plant_id,
            brand,
            kind: JobKind::Poll,
            attempt: 0,
            enqueued_at,
        }
    }

    pub fn daily(plant_id: Uuid, brand: Brand, date: NaiveDate, enqueued_at: DateTime<Utc>) -> Self {
        Self {
            id: format!("daily:plant:{}:{}", plant_id, date.format("%Y-%m-%d")),
            plant_id,
            brand,
            kind: JobKind::Daily(date),
            attempt: 0,
            enqueued_at,
        }
    }

    /// The same ticket, one attempt later.
    pub fn next_attempt(&self) -> Self {
        let mut next = self.clone();
        next.attempt += 1;
        next
    }
}
