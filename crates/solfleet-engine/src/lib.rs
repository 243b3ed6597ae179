/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Solfleet Engine
//!
//! Fleet-wide solar plant monitoring engine: a scheduler enumerates active
//! plants, per-brand work queues meter vendor traffic, and poll executors run
//! the normalization/persistence/alerting pipeline under a per-plant
//! exclusion lock. Every poll attempt is audited as a poll log row.

pub mod adapters;
pub mod cli;
pub mod dal;
pub mod db;
pub mod health;
pub mod lock;
pub mod metrics;
pub mod monitor;
pub mod store;
pub mod vault;
