/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Distributed mutual exclusion for per-plant polling.
//!
//! Locks carry a TTL and a caller token: `acquire` succeeds only when the key
//! is absent or its lease has expired, and `release` removes the key only when
//! the caller still owns it. The TTL (two scheduling intervals) guarantees
//! that a crashed executor's lock expires without operator action.

use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

use crate::store::StoreError;

/// Key for the exclusion lock serializing all pipeline work on one plant.
pub fn plant_lock_key(plant_id: Uuid) -> String {
    format!("lock:plant:{}", plant_id)
}

/// Mutual exclusion with TTL and caller-token semantics.
pub trait LockService: Send + Sync {
    /// Acquire-if-absent (or expired). Returns false when another holder has
    /// a live lease on the key.
    fn acquire(
        &self,
        key: &str,
        holder: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Release-if-owner. Returns false when the key was not held by `holder`
    /// (expired and taken over, or never acquired).
    fn release(&self, key: &str, holder: &str) -> Result<bool, StoreError>;
}
