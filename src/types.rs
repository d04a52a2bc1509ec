// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Record types shared by the store boundary, the analyzer and the engine.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::{number, Krw};

/// Province part of a `"Province/District"` location: everything before the
/// first `/`, trimmed. A location without `/` is its own province.
pub fn province(location: &str) -> &str {
    location.split('/').next().unwrap_or(location).trim()
}

// ─── Cost Category ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CostCategory {
    Variable,
    Fixed,
    Policy,
    Risk,
}

impl CostCategory {
    pub const ALL: [CostCategory; 4] = [Self::Variable, Self::Fixed, Self::Policy, Self::Risk];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Variable => "Variable",
            Self::Fixed => "Fixed",
            Self::Policy => "Policy",
            Self::Risk => "Risk",
        }
    }

    /// Case-insensitive parse of the four category names.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for CostCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── CostVariable ───────────────────────────────────────────────────────────

/// Named business variable (fuel price, toll rate, margins, risk rates).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CostVariable {
    pub category: CostCategory,
    /// Unique key, e.g. `fuel_price`.
    pub item: String,
    #[serde(with = "number")]
    pub value: Decimal,
    pub unit: String,
    #[serde(default)]
    pub description: String,
}

impl CostVariable {
    pub fn new(category: CostCategory, item: &str, value: Decimal, unit: &str, description: &str) -> Self {
        Self {
            category,
            item: item.to_string(),
            value,
            unit: unit.to_string(),
            description: description.to_string(),
        }
    }
}

// ─── MarketObservation ──────────────────────────────────────────────────────

/// One historical freight price record. Never mutated after import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarketObservation {
    pub date: NaiveDate,
    pub origin: String,
    pub destination: String,
    pub vehicle_type: String,
    #[serde(default = "default_freight_type")]
    pub freight_type: String,
    pub unit_price: f64,
}

pub fn default_freight_type() -> String {
    "General".to_string()
}

impl MarketObservation {
    pub fn route_key(&self) -> RouteKey {
        RouteKey::new(&self.origin, &self.destination, &self.vehicle_type)
    }

    pub fn province_key(&self) -> RouteKey {
        self.route_key().province_level()
    }
}

// ─── RouteKey ───────────────────────────────────────────────────────────────

/// `(origin, destination, vehicleType)` -- the identity of a route standard
/// and of an analyzer group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteKey {
    pub origin: String,
    pub destination: String,
    pub vehicle_type: String,
}

impl RouteKey {
    pub fn new(origin: &str, destination: &str, vehicle_type: &str) -> Self {
        Self {
            origin: origin.to_string(),
            destination: destination.to_string(),
            vehicle_type: vehicle_type.to_string(),
        }
    }

    /// Same vehicle type, origin and destination collapsed to provinces.
    pub fn province_level(&self) -> Self {
        Self::new(province(&self.origin), province(&self.destination), &self.vehicle_type)
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {} ({})", self.origin, self.destination, self.vehicle_type)
    }
}

// ─── PricingRequest ─────────────────────────────────────────────────────────

/// `{origin, destination, vehicleType, freightType?, manualAdjustmentRate?}`
/// as sent by the pricing UI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PricingRequest {
    pub origin: String,
    pub destination: String,
    pub vehicle_type: String,
    #[serde(default)]
    pub freight_type: Option<String>,
    /// Signed fraction applied in Tier 3, e.g. `-0.05`.
    #[serde(default, with = "number")]
    pub manual_adjustment_rate: Decimal,
}

impl PricingRequest {
    pub fn new(origin: &str, destination: &str, vehicle_type: &str) -> Self {
        Self {
            origin: origin.to_string(),
            destination: destination.to_string(),
            vehicle_type: vehicle_type.to_string(),
            freight_type: None,
            manual_adjustment_rate: Decimal::ZERO,
        }
    }

    pub fn with_freight(mut self, freight_type: &str) -> Self {
        self.freight_type = Some(freight_type.to_string());
        self
    }

    pub fn with_manual_adjustment(mut self, rate: Decimal) -> Self {
        self.manual_adjustment_rate = rate;
        self
    }

    pub fn route_key(&self) -> RouteKey {
        RouteKey::new(&self.origin, &self.destination, &self.vehicle_type)
    }

    /// `"origin → destination"` label used in batch diagnostics.
    pub fn route_label(&self) -> String {
        format!("{} → {}", self.origin, self.destination)
    }
}

// ─── RouteStandard ──────────────────────────────────────────────────────────

/// Persisted outcome of one pricing run, unique per [`RouteKey`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteStandard {
    pub origin: String,
    pub destination: String,
    pub vehicle_type: String,
    pub base_price: Krw,
    pub market_adjusted_price: Krw,
    pub final_price: Krw,
    #[serde(with = "number")]
    pub confidence_score: Decimal,
}

impl RouteStandard {
    pub fn key(&self) -> RouteKey {
        RouteKey::new(&self.origin, &self.destination, &self.vehicle_type)
    }
}
