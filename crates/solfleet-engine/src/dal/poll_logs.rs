/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! This module provides a Data Access Layer (DAL) for the append-only PollLog audit table.

use diesel::prelude::*;

use crate::dal::DAL;
use crate::store::StoreError;
use solfleet_models::models::poll_logs::NewPollLog;
use solfleet_models::schema::poll_logs;

/// Represents the Data Access Layer for PollLog-related operations.
pub struct PollLogsDAL<'a> {
    /// Reference to the main DAL instance.
    pub dal: &'a DAL,
}

impl PollLogsDAL<'_> {
    /// Appends one audit row. Poll logs are never updated or deleted by the engine.
    pub fn create(&self, new_log: &NewPollLog) -> Result<(), StoreError> {
        let conn = &mut self.dal.conn()?;
        diesel::insert_into(poll_logs::table)
            .values(new_log)
            .execute(conn)?;
        Ok(())
    }
}
