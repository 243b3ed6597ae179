/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Vendor adapter abstraction for the brand set.
//!
//! This module defines the [`VendorAdapter`] trait, the unified interface for
//! fetching plant telemetry from any vendor cloud (Solis, Huawei, GoodWe,
//! Dele). Each implementation handles vendor-specific API shapes and
//! normalizes them before anything reaches the executor:
//!
//! - power in watts, energy in kilowatt-hours
//! - timestamps as UTC instants
//! - `timezone` as an IANA zone name
//! - alarm severity in the closed LOW/MEDIUM/HIGH/CRITICAL set
//!
//! The trait is designed for async usage and dynamic dispatch
//! (`Arc<dyn VendorAdapter>`) so the registry can swap implementations at
//! runtime; mock mode is exactly that swap.

pub mod mock;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use solfleet_models::models::alerts::AlertSeverity;
use solfleet_models::models::plants::Brand;

/// Closed taxonomy of adapter failures.
///
/// Every vendor-side problem is classified into one of these kinds before it
/// leaves the adapter layer; the queue's retry policy and the poll log's
/// `adapter_error_type` column are both driven by the kind alone.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AdapterError {
    /// Vendor rejected the credentials (401/403) or they failed to decrypt.
    #[error("vendor authentication failed")]
    AuthFailed,

    /// Vendor throttled us (429), optionally telling us when to come back.
    #[error("rate limited by vendor")]
    RateLimited { retry_after: Option<Duration> },

    /// Request timed out or the vendor returned a 5xx.
    #[error("vendor request timed out or failed transiently")]
    NetworkTimeout,

    /// The vendor payload violated the normalization contract.
    #[error("invalid vendor payload: {0}")]
    InvalidData(String),

    /// The vendor does not know the plant reference.
    #[error("plant not found on vendor side")]
    PlantNotFound,

    /// Anything unclassified.
    #[error("unclassified adapter failure: {0}")]
    Unknown(String),
}

impl AdapterError {
    /// Stable identifier written to the poll log.
    pub fn kind(&self) -> &'static str {
        match self {
            AdapterError::AuthFailed => "AUTH_FAILED",
            AdapterError::RateLimited { .. } => "RATE_LIMITED",
            AdapterError::NetworkTimeout => "NETWORK_TIMEOUT",
            AdapterError::InvalidData(_) => "INVALID_DATA",
            AdapterError::PlantNotFound => "PLANT_NOT_FOUND",
            AdapterError::Unknown(_) => "UNKNOWN",
        }
    }

    /// Whether the queue may re-run the ticket.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AdapterError::RateLimited { .. }
                | AdapterError::NetworkTimeout
                | AdapterError::Unknown(_)
        )
    }

    /// Vendor-mandated minimum delay before the next attempt, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AdapterError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Plaintext vendor credentials, parsed from a decrypted vault blob.
///
/// Both fields zeroize on drop; neither is ever logged.
#[derive(Deserialize)]
pub struct VendorCredentials {
    pub api_key: SecretString,
    pub api_secret: SecretString,
}

impl VendorCredentials {
    /// Parses the decrypted credential document.
    pub fn from_plaintext(plaintext: &SecretString) -> Result<Self, AdapterError> {
        use secrecy::ExposeSecret;
        serde_json::from_str(plaintext.expose_secret())
            .map_err(|_| AdapterError::AuthFailed)
    }
}

/// Static capabilities and traffic limits of one vendor integration.
#[derive(Debug, Clone)]
pub struct AdapterCapabilities {
    pub brand: Brand,
    /// Poll executors allowed in parallel for this brand.
    pub max_concurrent: usize,
    /// Job starts allowed per sliding 60-second window.
    pub max_per_minute: u32,
    /// Vendor-recommended minimum spacing between polls of one plant.
    pub min_interval_secs: u64,
    pub supports_daily_series: bool,
    pub supports_alarms: bool,
    pub supports_device_list: bool,
}

/// Plant telemetry after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSummary {
    pub current_power_w: Option<f64>,
    pub today_energy_kwh: f64,
    pub total_energy_kwh: Option<f64>,
    pub grid_injection_power_w: Option<f64>,
    pub last_seen_at: DateTime<Utc>,
    pub source_sampled_at: DateTime<Utc>,
    pub timezone: String,
}

/// One day of historical production.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyEnergyPoint {
    pub date: NaiveDate,
    pub energy_kwh: f64,
}

/// Vendor alarm after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAlarm {
    pub vendor_alarm_code: String,
    pub device_sn: Option<String>,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
    pub is_active: bool,
    pub severity: AlertSeverity,
}

/// Unified interface to one vendor cloud.
#[async_trait]
pub trait VendorAdapter: Send + Sync {
    /// Static capabilities and traffic limits for this brand.
    fn capabilities(&self) -> AdapterCapabilities;

    /// Cheap credential check; errors map to the standard taxonomy
    /// (`AuthFailed` for rejects, `NetworkTimeout` for transient failures).
    async fn test_connection(&self, credentials: &VendorCredentials) -> Result<(), AdapterError>;

    /// Current production summary for one plant.
    async fn plant_summary(
        &self,
        vendor_plant_id: &str,
        credentials: &VendorCredentials,
    ) -> Result<NormalizedSummary, AdapterError>;

    /// Daily production history for `[start, end]` inclusive.
    async fn daily_energy_series(
        &self,
        vendor_plant_id: &str,
        credentials: &VendorCredentials,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyEnergyPoint>, AdapterError>;

    /// Alarms that occurred at or after `since`.
    async fn alarms_since(
        &self,
        vendor_plant_id: &str,
        credentials: &VendorCredentials,
        since: DateTime<Utc>,
    ) -> Result<Vec<NormalizedAlarm>, AdapterError>;
}

/// Verifies the normalization contract on a summary.
///
/// Adapters are expected to deliver clean data; the executor re-checks before
/// anything is persisted so a misbehaving adapter fails the pipeline instead
/// of writing a partial or nonsensical row.
pub fn validate_summary(summary: &NormalizedSummary) -> Result<(), AdapterError> {
    if !summary.today_energy_kwh.is_finite() || summary.today_energy_kwh < 0.0 {
        return Err(AdapterError::InvalidData(format!(
            "todayEnergyKWh out of range: {}",
            summary.today_energy_kwh
        )));
    }
    if let Some(p) = summary.current_power_w {
        if !p.is_finite() || p < 0.0 {
            return Err(AdapterError::InvalidData(format!(
                "currentPowerW out of range: {}",
                p
            )));
        }
    }
    if let Some(p) = summary.grid_injection_power_w {
        if !p.is_finite() {
            return Err(AdapterError::InvalidData(format!(
                "gridInjectionPowerW not finite: {}",
                p
            )));
        }
    }
    if let Some(e) = summary.total_energy_kwh {
        if !e.is_finite() || e < 0.0 {
            return Err(AdapterError::InvalidData(format!(
                "totalEnergyKWh out of range: {}",
                e
            )));
        }
    }
    if summary.timezone.is_empty() || summary.timezone.parse::<chrono_tz::Tz>().is_err() {
        return Err(AdapterError::InvalidData(format!(
            "timezone is not an IANA zone: {:?}",
            summary.timezone
        )));
    }
    Ok(())
}

/// Maps each brand to its adapter implementation.
pub struct AdapterRegistry {
    adapters: HashMap<Brand, Arc<dyn VendorAdapter>>,
}

impl AdapterRegistry {
    pub fn new(adapters: HashMap<Brand, Arc<dyn VendorAdapter>>) -> Self {
        Self { adapters }
    }

    /// Builds a registry where every brand is served by a fixture-backed mock
    /// adapter. No adapter constructed here performs network I/O.
    pub fn mock_from_dir(dir: &std::path::Path) -> Result<Self, AdapterError> {
        let mut adapters: HashMap<Brand, Arc<dyn VendorAdapter>> = HashMap::new();
        for brand in Brand::ALL {
            let path = dir.join(format!("{}.json", brand.as_str().to_lowercase()));
            let adapter = mock::MockAdapter::from_file(brand, &path)?;
            adapters.insert(brand, Arc::new(adapter));
        }
        Ok(Self::new(adapters))
    }

    pub fn get(&self, brand: Brand) -> Option<Arc<dyn VendorAdapter>> {
        self.adapters.get(&brand).cloned()
    }
}
