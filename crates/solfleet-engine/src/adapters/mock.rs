/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Fixture-backed mock adapters.
//!
//! A mock adapter serves the same contract as a live one but sources all data
//! from a per-brand JSON fixture document with `plant_summary`,
//! `daily_series` and `alarms` sections. Mock adapters perform no network I/O
//! of any kind; the fixture is read once at registry construction and
//! validated against the normalization contract up front, so a malformed
//! fixture fails startup instead of poisoning the pipeline later.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::path::Path;

use solfleet_models::models::alerts::AlertSeverity;
use solfleet_models::models::plants::Brand;

use super::{
    validate_summary, AdapterCapabilities, AdapterError, DailyEnergyPoint, NormalizedAlarm,
    NormalizedSummary, VendorAdapter, VendorCredentials,
};

/// Per-brand fixture document, bit-exact to the mock-mode contract.
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureDocument {
    pub plant_summary: FixtureSummary,
    #[serde(default)]
    pub daily_series: Vec<FixtureDailyPoint>,
    #[serde(default)]
    pub alarms: Vec<FixtureAlarm>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureSummary {
    #[serde(default)]
    pub current_power_w: Option<f64>,
    #[serde(rename = "todayEnergyKWh")]
    pub today_energy_kwh: f64,
    #[serde(default, rename = "totalEnergyKWh")]
    pub total_energy_kwh: Option<f64>,
    #[serde(default)]
    pub grid_injection_power_w: Option<f64>,
    pub last_seen_at: DateTime<Utc>,
    pub source_sampled_at: DateTime<Utc>,
    pub timezone: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureDailyPoint {
    pub date: NaiveDate,
    #[serde(rename = "energyKWh")]
    pub energy_kwh: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureAlarm {
    pub vendor_alarm_code: String,
    #[serde(default)]
    pub device_sn: Option<String>,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
    pub is_active: bool,
    pub severity: AlertSeverity,
}

/// Traffic limits per brand, as the live integrations would advertise them.
fn capabilities_for(brand: Brand) -> AdapterCapabilities {
    match brand {
        Brand::Solis => AdapterCapabilities {
            brand,
            max_concurrent: 3,
            max_per_minute: 30,
            min_interval_secs: 60,
            supports_daily_series: true,
            supports_alarms: true,
            supports_device_list: true,
        },
        Brand::Huawei => AdapterCapabilities {
            brand,
            max_concurrent: 2,
            max_per_minute: 20,
            min_interval_secs: 60,
            supports_daily_series: true,
            supports_alarms: true,
            supports_device_list: true,
        },
        Brand::Goodwe => AdapterCapabilities {
            brand,
            max_concurrent: 4,
            max_per_minute: 40,
            min_interval_secs: 60,
            supports_daily_series: true,
            supports_alarms: true,
            supports_device_list: false,
        },
        Brand::Dele => AdapterCapabilities {
            brand,
            max_concurrent: 1,
            max_per_minute: 10,
            min_interval_secs: 120,
            supports_daily_series: true,
            supports_alarms: true,
            supports_device_list: false,
        },
    }
}

/// Mock implementation of [`VendorAdapter`] backed by a fixture document.
pub struct MockAdapter {
    brand: Brand,
    fixture: FixtureDocument,
}

impl MockAdapter {
    /// Loads and validates the brand fixture from disk.
    pub fn from_file(brand: Brand, path: &Path) -> Result<Self, AdapterError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AdapterError::InvalidData(format!(
                "cannot read {} fixture at {}: {}",
                brand,
                path.display(),
                e
            ))
        })?;
        let fixture: FixtureDocument = serde_json::from_str(&raw).map_err(|e| {
            AdapterError::InvalidData(format!("malformed {} fixture: {}", brand, e))
        })?;
        Self::from_document(brand, fixture)
    }

    /// Builds a mock adapter from an in-memory document (used by tests).
    pub fn from_document(brand: Brand, fixture: FixtureDocument) -> Result<Self, AdapterError> {
        let adapter = Self { brand, fixture };
        adapter.validate()?;
        Ok(adapter)
    }

    fn validate(&self) -> Result<(), AdapterError> {
        validate_summary(&self.summary())?;
        for point in &self.fixture.daily_series {
            if !point.energy_kwh.is_finite() || point.energy_kwh < 0.0 {
                return Err(AdapterError::InvalidData(format!(
                    "{} fixture daily_series has invalid energy {} on {}",
                    self.brand, point.energy_kwh, point.date
                )));
            }
        }
        Ok(())
    }

    fn summary(&self) -> NormalizedSummary {
        let s = &self.fixture.plant_summary;
        NormalizedSummary {
            current_power_w: s.current_power_w,
            today_energy_kwh: s.today_energy_kwh,
            total_energy_kwh: s.total_energy_kwh,
            grid_injection_power_w: s.grid_injection_power_w,
            last_seen_at: s.last_seen_at,
            source_sampled_at: s.source_sampled_at,
            timezone: s.timezone.clone(),
        }
    }
}

#[async_trait]
impl VendorAdapter for MockAdapter {
    fn capabilities(&self) -> AdapterCapabilities {
        capabilities_for(self.brand)
    }

    async fn test_connection(&self, credentials: &VendorCredentials) -> Result<(), AdapterError> {
        if credentials.api_key.expose_secret().is_empty() {
            return Err(AdapterError::AuthFailed);
        }
        Ok(())
    }

    async fn plant_summary(
        &self,
        _vendor_plant_id: &str,
        credentials: &VendorCredentials,
    ) -> Result<NormalizedSummary, AdapterError> {
        self.test_connection(credentials).await?;
        Ok(self.summary())
    }

    async fn daily_energy_series(
        &self,
        _vendor_plant_id: &str,
        credentials: &VendorCredentials,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyEnergyPoint>, AdapterError> {
        self.test_connection(credentials).await?;
        Ok(self
            .fixture
            .daily_series
            .iter()
            .filter(|p| p.date >= start && p.date <= end)
            .map(|p| DailyEnergyPoint {
                date: p.date,
                energy_kwh: p.energy_kwh,
            })
            .collect())
    }

    async fn alarms_since(
        &self,
        _vendor_plant_id: &str,
        credentials: &VendorCredentials,
        since: DateTime<Utc>,
    ) -> Result<Vec<NormalizedAlarm>, AdapterError> {
        self.test_connection(credentials).await?;
        Ok(self
            .fixture
            .alarms
            .iter()
            .filter(|a| a.occurred_at >= since)
            .map(|a| NormalizedAlarm {
                vendor_alarm_code: a.vendor_alarm_code.clone(),
                device_sn: a.device_sn.clone(),
                message: a.message.clone(),
                occurred_at: a.occurred_at,
                is_active: a.is_active,
                severity: a.severity,
            })
            .collect())
    }
}
