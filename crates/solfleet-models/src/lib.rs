/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Solfleet-Models
//!
//! Data model crate for the Solfleet monitoring engine. Declares the diesel
//! schema and the model structs for every entity the engine persists.

/// Declares the models module, which contains the data structures representing database tables.
pub mod models;

/// Declares the schema module, which contains the database schema definitions.
pub mod schema;
