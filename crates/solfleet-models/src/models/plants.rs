/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Plant Module
//!
//! This module defines structures and methods for managing monitored solar
//! plants in the system.
//!
//! ## Data Model
//!
//! Plants represent one monitored installation bound to exactly one vendor
//! brand. They are stored in the `plants` table with the following structure:
//!
//! - `id`: UUID, primary key
//! - `created_at` / `updated_at`: TIMESTAMPTZ bookkeeping columns
//! - `deleted_at`: TIMESTAMPTZ, for soft deletion support
//! - `name`: VARCHAR(255), operator-facing plant name
//! - `brand`: VARCHAR(16), one of the supported vendor brands
//! - `timezone`: VARCHAR(64), IANA zone the plant's local day is computed in
//! - `integration_status`: VARCHAR(32), whether the poller may contact the vendor
//! - `status`: VARCHAR(8), derived health tag (GREEN/YELLOW/RED/GREY)
//! - `alerts_silenced_until`: TIMESTAMPTZ, optional operator-set mute window
//! - `owner_customer_id`: UUID, optional owning customer
//! - `vendor_plant_id`: VARCHAR(128), the plant's identifier on the vendor cloud
//! - `installed_capacity_w`: DOUBLE PRECISION, optional nameplate capacity
//!
//! ## Constraints
//!
//! - `brand` must be one of: "SOLIS", "HUAWEI", "GOODWE", "DELE".
//! - `timezone` must be a valid IANA zone name; fixed offsets are rejected.
//! - `status` must be one of: "GREEN", "YELLOW", "RED", "GREY".
//! - `integration_status` must be one of: "ACTIVE", "PAUSED_AUTH_ERROR",
//!   "DISABLED".

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported vendor brands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Brand {
    Solis,
    Huawei,
    Goodwe,
    Dele,
}

impl Brand {
    /// All brands the engine knows how to poll, in registry order.
    pub const ALL: [Brand; 4] = [Brand::Solis, Brand::Huawei, Brand::Goodwe, Brand::Dele];

    pub fn as_str(&self) -> &'static str {
        match self {
            Brand::Solis => "SOLIS",
            Brand::Huawei => "HUAWEI",
            Brand::Goodwe => "GOODWE",
            Brand::Dele => "DELE",
        }
    }

    pub fn parse(s: &str) -> Option<Brand> {
        match s {
            "SOLIS" => Some(Brand::Solis),
            "HUAWEI" => Some(Brand::Huawei),
            "GOODWE" => Some(Brand::Goodwe),
            "DELE" => Some(Brand::Dele),
            _ => None,
        }
    }
}

impl std::fmt::Display for Brand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the poller is allowed to contact the vendor for a plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrationStatus {
    Active,
    PausedAuthError,
    Disabled,
}

impl IntegrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationStatus::Active => "ACTIVE",
            IntegrationStatus::PausedAuthError => "PAUSED_AUTH_ERROR",
            IntegrationStatus::Disabled => "DISABLED",
        }
    }

    pub fn parse(s: &str) -> Option<IntegrationStatus> {
        match s {
            "ACTIVE" => Some(IntegrationStatus::Active),
            "PAUSED_AUTH_ERROR" => Some(IntegrationStatus::PausedAuthError),
            "DISABLED" => Some(IntegrationStatus::Disabled),
            _ => None,
        }
    }
}

/// Derived health tag for a plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlantStatus {
    Green,
    Yellow,
    Red,
    Grey,
}

impl PlantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlantStatus::Green => "GREEN",
            PlantStatus::Yellow => "YELLOW",
            PlantStatus::Red => "RED",
            PlantStatus::Grey => "GREY",
        }
    }

    pub fn parse(s: &str) -> Option<PlantStatus> {
        match s {
            "GREEN" => Some(PlantStatus::Green),
            "YELLOW" => Some(PlantStatus::Yellow),
            "RED" => Some(PlantStatus::Red),
            "GREY" => Some(PlantStatus::Grey),
            _ => None,
        }
    }
}

/// Represents a monitored plant in the database.
#[derive(Queryable, Selectable, Identifiable, AsChangeset, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::plants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Plant {
    /// Unique identifier for the plant.
    pub id: Uuid,
    /// Timestamp when the plant was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp when the plant was last updated.
    pub updated_at: DateTime<Utc>,
    /// Timestamp for soft deletion, if applicable.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Operator-facing name of the plant.
    pub name: String,
    /// Vendor brand the plant is bound to.
    pub brand: String,
    /// IANA timezone the plant's local day is computed in.
    pub timezone: String,
    /// Whether the poller may contact the vendor for this plant.
    pub integration_status: String,
    /// Derived health tag ("GREEN", "YELLOW", "RED", "GREY").
    pub status: String,
    /// Optional operator-set window during which alerts are muted.
    pub alerts_silenced_until: Option<DateTime<Utc>>,
    /// Optional owning customer.
    pub owner_customer_id: Option<Uuid>,
    /// The plant's identifier on the vendor cloud.
    pub vendor_plant_id: String,
    /// Optional nameplate capacity in watts.
    pub installed_capacity_w: Option<f64>,
}

impl Plant {
    /// Parsed vendor brand, or None if the stored value is unknown.
    pub fn brand_parsed(&self) -> Option<Brand> {
        Brand::parse(&self.brand)
    }

    /// Parsed integration status, or None if the stored value is unknown.
    pub fn integration(&self) -> Option<IntegrationStatus> {
        IntegrationStatus::parse(&self.integration_status)
    }

    pub fn is_active(&self) -> bool {
        self.integration() == Some(IntegrationStatus::Active) && self.deleted_at.is_none()
    }
}

/// Represents a new plant to be inserted into the database.
#[derive(Insertable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::plants)]
pub struct NewPlant {
    pub name: String,
    pub brand: String,
    pub timezone: String,
    pub integration_status: String,
    pub status: String,
    pub vendor_plant_id: String,
    pub owner_customer_id: Option<Uuid>,
    pub installed_capacity_w: Option<f64>,
}

impl NewPlant {
    /// Creates a new `NewPlant` instance.
    ///
    /// New plants start with `integration_status = ACTIVE` and `status = GREY`;
    /// the first successful poll moves the health tag off GREY.
    ///
    /// # Returns
    ///
    /// Returns `Ok(NewPlant)` if all parameters are valid, otherwise returns an
    /// `Err` with a description of the validation failure.
    pub fn new(
        name: String,
        brand: Brand,
        timezone: String,
        vendor_plant_id: String,
        owner_customer_id: Option<Uuid>,
        installed_capacity_w: Option<f64>,
    ) -> Result<Self, String> {
        if name.trim().is_empty() {
            return Err("Plant name cannot be empty".to_string());
        }

        if timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(format!("Invalid IANA timezone: {}", timezone));
        }

        if vendor_plant_id.trim().is_empty() {
            return Err("Vendor plant id cannot be empty".to_string());
        }

        if let Some(capacity) = installed_capacity_w {
            if !capacity.is_finite() || capacity < 0.0 {
                return Err("Installed capacity must be a finite non-negative number".to_string());
            }
        }

        Ok(NewPlant {
            name,
            brand: brand.as_str().to_string(),
            timezone,
            integration_status: IntegrationStatus::Active.as_str().to_string(),
            status: PlantStatus::Grey.as_str().to_string(),
            vendor_plant_id,
            owner_customer_id,
            installed_capacity_w,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_plant_success() {
        let result = NewPlant::new(
            "Fazenda Sol Nascente".to_string(),
            Brand::Solis,
            "America/Sao_Paulo".to_string(),
            "SOLIS-12345".to_string(),
            None,
            Some(75_000.0),
        );

        assert!(result.is_ok(), "NewPlant creation should succeed with valid inputs");
        let plant = result.unwrap();
        assert_eq!(plant.brand, "SOLIS");
        assert_eq!(plant.integration_status, "ACTIVE");
        assert_eq!(plant.status, "GREY", "new plants start GREY until first poll");
    }

    #[test]
    fn test_new_plant_rejects_fixed_offset_timezone() {
        let result = NewPlant::new(
            "Plant".to_string(),
            Brand::Huawei,
            "+02:00".to_string(),
            "H-1".to_string(),
            None,
            None,
        );
        assert!(result.is_err(), "fixed offsets are not IANA zones");
    }

    #[test]
    fn test_new_plant_rejects_empty_name() {
        let result = NewPlant::new(
            "   ".to_string(),
            Brand::Goodwe,
            "Europe/Lisbon".to_string(),
            "GW-9".to_string(),
            None,
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_new_plant_rejects_negative_capacity() {
        let result = NewPlant::new(
            "Plant".to_string(),
            Brand::Dele,
            "Europe/Lisbon".to_string(),
            "D-1".to_string(),
            None,
            Some(-1.0),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_brand_round_trip() {
        for brand in Brand::ALL {
            assert_eq!(Brand::parse(brand.as_str()), Some(brand));
        }
        assert_eq!(Brand::parse("SUNGROW"), None);
    }

    #[test]
    fn test_status_round_trip() {
        for s in ["GREEN", "YELLOW", "RED", "GREY"] {
            assert_eq!(PlantStatus::parse(s).unwrap().as_str(), s);
        }
        assert_eq!(PlantStatus::parse("BLUE"), None);
    }
}
