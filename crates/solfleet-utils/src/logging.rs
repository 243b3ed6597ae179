/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Structured logging for the Solfleet engine.
//!
//! Thin wrapper over `tracing-subscriber`: [`init`] installs a formatting
//! subscriber filtered by the configured level (overridable via `RUST_LOG`),
//! and [`prelude`] re-exports the level macros so call sites can
//! `use solfleet_utils::logging::prelude::*;`.

use once_cell::sync::OnceCell;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: OnceCell<()> = OnceCell::new();

/// Commonly used log macros.
pub mod prelude {
    pub use tracing::{debug, error, info, trace, warn};
}

/// Initializes the global tracing subscriber.
///
/// Safe to call more than once; only the first call installs a subscriber.
/// `RUST_LOG` takes precedence over the configured `level` when set.
pub fn init(level: &str) -> Result<(), String> {
    let default_filter = match level.to_lowercase().as_str() {
        "off" | "error" | "warn" | "info" | "debug" | "trace" => level.to_lowercase(),
        _ => "info".to_string(),
    };

    INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter.clone()));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| format!("Failed to set subscriber: {}", e))
    })?;

    Ok(())
}
