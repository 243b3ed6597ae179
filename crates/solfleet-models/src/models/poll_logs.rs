/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Poll Log Module
//!
//! Append-only audit record of poll executions: exactly one row per job that
//! was started, whether it succeeded, failed, or was skipped because another
//! executor held the plant lock.
//!
//! ## Constraints
//!
//! - `job_type` must be one of: "POLL", "DAILY".
//! - `status` must be one of: "SUCCESS", "ERROR".
//! - `adapter_error_type`, when present, is one of the closed adapter error
//!   kinds plus "LOCK_SKIPPED" (which accompanies a SUCCESS row).
//! - `http_status` is optional vendor metadata; absence never means failure.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const JOB_TYPE_POLL: &str = "POLL";
pub const JOB_TYPE_DAILY: &str = "DAILY";

pub const POLL_STATUS_SUCCESS: &str = "SUCCESS";
pub const POLL_STATUS_ERROR: &str = "ERROR";

/// Represents a poll log entry in the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::poll_logs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PollLog {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub plant_id: Uuid,
    pub job_type: String,
    pub status: String,
    pub duration_ms: i64,
    pub adapter_error_type: Option<String>,
    pub http_status: Option<i32>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Represents a new poll log entry to be inserted into the database.
#[derive(Insertable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::poll_logs)]
pub struct NewPollLog {
    pub plant_id: Uuid,
    pub job_type: String,
    pub status: String,
    pub duration_ms: i64,
    pub adapter_error_type: Option<String>,
    pub http_status: Option<i32>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl NewPollLog {
    pub fn new(
        plant_id: Uuid,
        job_type: String,
        status: String,
        duration_ms: i64,
        adapter_error_type: Option<String>,
        http_status: Option<i32>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Result<Self, String> {
        if plant_id.is_nil() {
            return Err("Invalid plant ID".to_string());
        }

        let valid_job_types = [JOB_TYPE_POLL, JOB_TYPE_DAILY];
        if !valid_job_types.contains(&job_type.as_str()) {
            return Err(format!(
                "Invalid job type. Must be one of: {}",
                valid_job_types.join(", ")
            ));
        }

        let valid_statuses = [POLL_STATUS_SUCCESS, POLL_STATUS_ERROR];
        if !valid_statuses.contains(&status.as_str()) {
            return Err(format!(
                "Invalid status. Must be one of: {}",
                valid_statuses.join(", ")
            ));
        }

        if duration_ms < 0 {
            return Err("Duration cannot be negative".to_string());
        }

        Ok(NewPollLog {
            plant_id,
            job_type,
            status,
            duration_ms,
            adapter_error_type,
            http_status,
            started_at,
            finished_at,
        })
    }
}
