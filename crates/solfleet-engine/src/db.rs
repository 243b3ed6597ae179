/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! This module provides functionality for creating and managing a PostgreSQL connection pool.
//!
//! It uses the diesel and r2d2 crates to manage database connections efficiently.

use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;

/// Represents a pool of PostgreSQL database connections.
#[derive(Clone)]
pub struct ConnectionPool {
    /// The actual connection pool.
    pub pool: Pool<ConnectionManager<PgConnection>>,
}

/// Creates a shared connection pool for PostgreSQL databases.
///
/// # Arguments
///
/// * `database_url` - The full database connection URL
/// * `max_size` - The maximum number of connections the pool should maintain
///
/// # Panics
///
/// This function will panic if the connection pool creation fails.
pub fn create_shared_connection_pool(database_url: &str, max_size: u32) -> ConnectionPool {
    let manager = ConnectionManager::<PgConnection>::new(database_url);

    let pool = Pool::builder()
        .max_size(max_size)
        .build(manager)
        .expect("Failed to create connection pool");

    ConnectionPool { pool }
}
