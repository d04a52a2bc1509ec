// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Cost master: the compiled-in default variables and the resolved sheet the
//! engine prices against.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ConfigError;
use crate::types::{CostCategory, CostVariable};

pub const FUEL_PRICE: &str = "fuel_price";
pub const TOLL_RATE: &str = "toll_rate";
pub const FIXED_COST: &str = "fixed_cost";
pub const DEFAULT_FUEL_EFFICIENCY: &str = "default_fuel_efficiency";
pub const DRIVER_PROFIT_RATE: &str = "driver_profit_rate";
pub const COMPANY_MARGIN_RATE: &str = "company_margin_rate";
pub const RISK_FRAGILE: &str = "risk_fragile";
pub const RISK_REFRIGERATED: &str = "risk_refrigerated";
pub const RISK_HAZARDOUS: &str = "risk_hazardous";

/// Seed rows for a fresh cost master. Values match [`CostSheet::default`].
pub fn default_cost_variables() -> Vec<CostVariable> {
    use CostCategory::*;
    vec![
        CostVariable::new(Variable, FUEL_PRICE, dec!(1650), "KRW/L", "Diesel price per liter"),
        CostVariable::new(Variable, TOLL_RATE, dec!(120), "KRW/km", "Expressway toll per km"),
        CostVariable::new(Variable, DEFAULT_FUEL_EFFICIENCY, dec!(4.0), "km/L", "Efficiency for unlisted vehicle types"),
        CostVariable::new(Fixed, FIXED_COST, dec!(150000), "KRW/trip", "Per-trip fixed cost"),
        CostVariable::new(Policy, DRIVER_PROFIT_RATE, dec!(0.15), "ratio", "Driver profit on operating cost"),
        CostVariable::new(Policy, COMPANY_MARGIN_RATE, dec!(0.10), "ratio", "Company margin on market price"),
        CostVariable::new(Risk, RISK_FRAGILE, dec!(0.10), "ratio", "Fragile cargo surcharge"),
        CostVariable::new(Risk, RISK_REFRIGERATED, dec!(0.15), "ratio", "Refrigerated cargo surcharge"),
        CostVariable::new(Risk, RISK_HAZARDOUS, dec!(0.20), "ratio", "Hazardous cargo surcharge"),
    ]
}

// ---------------------------------------------------------------------------
// CostSheet
// ---------------------------------------------------------------------------

/// Every cost variable the engine needs, resolved to a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSheet {
    /// KRW per liter.
    pub fuel_price: Decimal,
    /// KRW per km.
    pub toll_rate: Decimal,
    /// KRW per trip.
    pub fixed_cost: Decimal,
    /// km per liter for vehicle types missing from the efficiency table.
    pub default_fuel_efficiency: Decimal,
    pub driver_profit_rate: Decimal,
    pub company_margin_rate: Decimal,
    pub fragile_risk_rate: Decimal,
    pub refrigerated_risk_rate: Decimal,
    pub hazardous_risk_rate: Decimal,
}

impl Default for CostSheet {
    fn default() -> Self {
        Self {
            fuel_price: dec!(1650),
            toll_rate: dec!(120),
            fixed_cost: dec!(150000),
            default_fuel_efficiency: dec!(4.0),
            driver_profit_rate: dec!(0.15),
            company_margin_rate: dec!(0.10),
            fragile_risk_rate: dec!(0.10),
            refrigerated_risk_rate: dec!(0.15),
            hazardous_risk_rate: dec!(0.20),
        }
    }
}

impl CostSheet {
    /// Resolve store rows over the default table. Later rows win on
    /// duplicate items; unknown items are ignored.
    pub fn resolve(rows: &[CostVariable]) -> Result<Self, ConfigError> {
        let mut sheet = Self::default();
        let mut overridden = 0_usize;
        for var in rows {
            let slot = match var.item.trim() {
                FUEL_PRICE => &mut sheet.fuel_price,
                TOLL_RATE => &mut sheet.toll_rate,
                FIXED_COST => &mut sheet.fixed_cost,
                DEFAULT_FUEL_EFFICIENCY => &mut sheet.default_fuel_efficiency,
                DRIVER_PROFIT_RATE => &mut sheet.driver_profit_rate,
                COMPANY_MARGIN_RATE => &mut sheet.company_margin_rate,
                RISK_FRAGILE => &mut sheet.fragile_risk_rate,
                RISK_REFRIGERATED => &mut sheet.refrigerated_risk_rate,
                RISK_HAZARDOUS => &mut sheet.hazardous_risk_rate,
                _ => continue,
            };
            *slot = var.value;
            overridden += 1;
        }

        if sheet.default_fuel_efficiency <= Decimal::ZERO {
            return Err(ConfigError::InvalidCostVariable {
                item: DEFAULT_FUEL_EFFICIENCY.to_string(),
                reason: format!("must be positive, got {}", sheet.default_fuel_efficiency),
            });
        }

        debug!(overridden, fuel_price = %sheet.fuel_price, "cost sheet resolved");
        Ok(sheet)
    }
}
