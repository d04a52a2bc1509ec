// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Fundamental Pricing Hierarchy -- three tiers from cost basis to the
//! published standard price.
//!
//! ```text
//! Tier 1  operating cost + driver profit              (cost accounting)
//! Tier 2  tier1 ⊕ market median, weighted by trust     (market overlay)
//! Tier 3  + margin + freight risk + manual, ceil 1000  (strategy)
//! ```
//!
//! Every tier is a pure function of its inputs. A result is either fully
//! built or the whole computation returns an error.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analyzer::{find_median, MarketDataAnalyzer, MedianBasis, RouteMedianResult};
use crate::config::{ConfigError, PricingConfig};
use crate::cost::CostSheet;
use crate::distance::{DistanceSource, ResolvedDistance, RouteDistanceResolver};
use crate::money::{number, round_dp, Krw};
use crate::store::{CostVariableProvider, MarketDataSource, StoreError};
use crate::types::{province, PricingRequest, RouteKey, RouteStandard};

pub const SOURCE_COST_MASTER: &str = "CostMaster";
pub const SOURCE_MARKET_DATA: &str = "MarketData (IQR)";
pub const SOURCE_DISTANCE_LOOKUP: &str = "RouteDistance (lookup)";
pub const SOURCE_DISTANCE_ESTIMATE: &str = "RouteDistance (haversine estimate)";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from a single pricing run.
#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("{field} must not be empty")]
    MissingField { field: &'static str },

    #[error("{field} `{value}` has no province segment")]
    InvalidLocation { field: &'static str, value: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Freight risk
// ---------------------------------------------------------------------------

/// Cargo risk class, resolved from a free-text freight description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreightRisk {
    General,
    Fragile,
    Refrigerated,
    Hazardous,
}

const FRAGILE_KEYWORDS: [&str; 5] = ["fragile", "paper", "glass", "ceramic", "electronics"];
const REFRIGERATED_KEYWORDS: [&str; 4] = ["refrigerated", "frozen", "chilled", "cold"];
const HAZARDOUS_KEYWORDS: [&str; 4] = ["hazardous", "chemical", "flammable", "explosive"];

impl FreightRisk {
    /// Case-insensitive substring match; fragile, then refrigerated, then
    /// hazardous. Anything else, including no description, is general.
    pub fn classify(freight_type: Option<&str>) -> Self {
        let Some(text) = freight_type else {
            return Self::General;
        };
        let text = text.to_lowercase();
        let hit = |words: &[&str]| words.iter().any(|w| text.contains(w));
        if hit(&FRAGILE_KEYWORDS) {
            Self::Fragile
        } else if hit(&REFRIGERATED_KEYWORDS) {
            Self::Refrigerated
        } else if hit(&HAZARDOUS_KEYWORDS) {
            Self::Hazardous
        } else {
            Self::General
        }
    }

    pub fn rate(&self, costs: &CostSheet) -> Decimal {
        match self {
            Self::General => Decimal::ZERO,
            Self::Fragile => costs.fragile_risk_rate,
            Self::Refrigerated => costs.refrigerated_risk_rate,
            Self::Hazardous => costs.hazardous_risk_rate,
        }
    }
}

// ---------------------------------------------------------------------------
// Breakdown types
// ---------------------------------------------------------------------------

/// Tier 1 -- cost basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tier1Breakdown {
    pub distance_km: u32,
    pub distance_source: DistanceSource,
    /// km per liter actually used.
    #[serde(with = "number")]
    pub fuel_efficiency: Decimal,
    pub fuel_cost: Krw,
    pub toll_cost: Krw,
    pub fixed_cost: Krw,
    pub operating_cost: Krw,
    pub driver_profit: Krw,
    /// Operating cost plus driver profit: the Tier 1 base price.
    pub subtotal: Krw,
}

/// The market median Tier 2 blended against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketReference {
    pub origin: String,
    pub destination: String,
    pub median: Krw,
    pub sample_size: usize,
    pub filtered_size: usize,
    pub basis: MedianBasis,
}

/// Tier 2 -- market overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tier2Breakdown {
    pub base_price: Krw,
    pub has_market_data: bool,
    pub market: Option<MarketReference>,
    /// Market confidence used as the blend weight; 0 without data.
    #[serde(with = "number")]
    pub confidence_score: Decimal,
    pub adjusted_price: Krw,
    /// `adjusted_price / base_price`, 3 decimals.
    #[serde(with = "number")]
    pub adjustment_factor: Decimal,
}

/// Tier 3 -- strategic finalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tier3Breakdown {
    pub market_price: Krw,
    #[serde(with = "number")]
    pub company_margin_rate: Decimal,
    pub company_margin: Krw,
    pub freight_risk: FreightRisk,
    #[serde(with = "number")]
    pub freight_risk_rate: Decimal,
    pub freight_risk_surcharge: Krw,
    #[serde(with = "number")]
    pub manual_adjustment_rate: Decimal,
    pub manual_adjustment: Krw,
    pub subtotal: Krw,
    /// Subtotal rounded up to the next 1000.
    pub final_price: Krw,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingSummary {
    pub base_price: Krw,
    pub market_adjusted_price: Krw,
    pub final_price: Krw,
    /// Overall confidence, 2 decimals.
    #[serde(with = "number")]
    pub confidence_score: Decimal,
    pub data_sources: Vec<String>,
}

/// Full breakdown of one pricing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingResult {
    pub route: RouteKey,
    pub freight_type: Option<String>,
    pub tier1: Tier1Breakdown,
    pub tier2: Tier2Breakdown,
    pub tier3: Tier3Breakdown,
    pub summary: PricingSummary,
}

impl PricingResult {
    /// The record persisted for this route, keyed by `(origin, destination, vehicleType)`.
    pub fn to_route_standard(&self) -> RouteStandard {
        RouteStandard {
            origin: self.route.origin.clone(),
            destination: self.route.destination.clone(),
            vehicle_type: self.route.vehicle_type.clone(),
            base_price: self.summary.base_price,
            market_adjusted_price: self.summary.market_adjusted_price,
            final_price: self.summary.final_price,
            confidence_score: self.summary.confidence_score,
        }
    }
}

// ---------------------------------------------------------------------------
// PricingEngine
// ---------------------------------------------------------------------------

/// Holds validated tables; owns nothing mutable.
#[derive(Debug, Clone)]
pub struct PricingEngine {
    config: PricingConfig,
    resolver: RouteDistanceResolver,
    analyzer: MarketDataAnalyzer,
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::from_validated(PricingConfig::default())
    }
}

impl PricingEngine {
    /// Validate `config` and build the resolver and analyzer from it.
    pub fn new(config: PricingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    fn from_validated(config: PricingConfig) -> Self {
        let resolver = RouteDistanceResolver::new(&config.distances);
        let analyzer = MarketDataAnalyzer::new(config.analyzer.clone());
        Self { config, resolver, analyzer }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn resolver(&self) -> &RouteDistanceResolver {
        &self.resolver
    }

    pub fn analyzer(&self) -> &MarketDataAnalyzer {
        &self.analyzer
    }

    /// Tier 1: fuel + toll + fixed, plus the driver's profit on top.
    pub fn tier1(&self, distance: ResolvedDistance, vehicle_type: &str, costs: &CostSheet) -> Tier1Breakdown {
        let km = Decimal::from(distance.distance_km);
        let fuel_efficiency = self
            .config
            .vehicle_efficiency
            .get(vehicle_type)
            .unwrap_or(costs.default_fuel_efficiency);

        let fuel_cost = Krw::round(km / fuel_efficiency * costs.fuel_price);
        let toll_cost = Krw::round(km * costs.toll_rate);
        let fixed_cost = Krw(costs.fixed_cost);
        let operating_cost = fuel_cost + toll_cost + fixed_cost;
        let driver_profit = operating_cost.scaled(costs.driver_profit_rate);

        Tier1Breakdown {
            distance_km: distance.distance_km,
            distance_source: distance.source,
            fuel_efficiency,
            fuel_cost,
            toll_cost,
            fixed_cost,
            operating_cost,
            driver_profit,
            subtotal: operating_cost + driver_profit,
        }
    }

    /// Tier 2: blend toward the market median in proportion to its
    /// confidence. Without a median the base price passes through.
    pub fn tier2(&self, key: &RouteKey, base_price: Krw, medians: &[RouteMedianResult]) -> Tier2Breakdown {
        let Some(found) = find_median(medians, key) else {
            return Tier2Breakdown {
                base_price,
                has_market_data: false,
                market: None,
                confidence_score: Decimal::ZERO,
                adjusted_price: base_price,
                adjustment_factor: Decimal::ONE,
            };
        };

        let confidence = found.confidence_score;
        let adjusted_price =
            Krw::round(base_price.0 * (Decimal::ONE - confidence) + found.median.0 * confidence);
        let adjustment_factor = if base_price.is_zero() {
            Decimal::ONE
        } else {
            round_dp(adjusted_price.0 / base_price.0, 3)
        };

        Tier2Breakdown {
            base_price,
            has_market_data: true,
            market: Some(MarketReference {
                origin: found.origin.clone(),
                destination: found.destination.clone(),
                median: found.median,
                sample_size: found.sample_size,
                filtered_size: found.filtered_size,
                basis: found.basis,
            }),
            confidence_score: confidence,
            adjusted_price,
            adjustment_factor,
        }
    }

    /// Tier 3: margin, freight risk and manual adjustment, rounded up.
    pub fn tier3(
        &self,
        market_price: Krw,
        freight_type: Option<&str>,
        manual_adjustment_rate: Decimal,
        costs: &CostSheet,
    ) -> Tier3Breakdown {
        let company_margin = market_price.scaled(costs.company_margin_rate);
        let freight_risk = FreightRisk::classify(freight_type);
        let freight_risk_rate = freight_risk.rate(costs);
        let freight_risk_surcharge = market_price.scaled(freight_risk_rate);
        let manual_adjustment = market_price.scaled(manual_adjustment_rate);
        let subtotal = market_price + company_margin + freight_risk_surcharge + manual_adjustment;

        Tier3Breakdown {
            market_price,
            company_margin_rate: costs.company_margin_rate,
            company_margin,
            freight_risk,
            freight_risk_rate,
            freight_risk_surcharge,
            manual_adjustment_rate,
            manual_adjustment,
            subtotal,
            final_price: subtotal.ceil_to_thousand(),
        }
    }

    /// `round(distance·w_d + market·w_m, 2)`.
    pub fn overall_confidence(&self, source: DistanceSource, tier2: &Tier2Breakdown) -> Decimal {
        let w = &self.config.blend;
        let distance_confidence = if source.is_lookup() {
            w.lookup_confidence
        } else {
            w.estimate_confidence
        };
        let market_confidence = if tier2.has_market_data {
            tier2.confidence_score
        } else {
            w.no_market_confidence
        };
        round_dp(
            distance_confidence * w.distance_weight + market_confidence * w.market_weight,
            2,
        )
    }

    /// Price one request against already-fetched costs and analyzer output.
    pub fn price(
        &self,
        request: &PricingRequest,
        costs: &CostSheet,
        medians: &[RouteMedianResult],
    ) -> Result<PricingResult, PricingError> {
        validate_request(request)?;

        let key = request.route_key();
        let distance = self.resolver.resolve(&request.origin, &request.destination);
        let tier1 = self.tier1(distance, &request.vehicle_type, costs);
        let tier2 = self.tier2(&key, tier1.subtotal, medians);
        let tier3 = self.tier3(
            tier2.adjusted_price,
            request.freight_type.as_deref(),
            request.manual_adjustment_rate,
            costs,
        );
        let confidence_score = self.overall_confidence(distance.source, &tier2);

        let mut data_sources = vec![SOURCE_COST_MASTER.to_string()];
        if tier2.has_market_data {
            data_sources.push(SOURCE_MARKET_DATA.to_string());
        }
        data_sources.push(
            if distance.source.is_lookup() {
                SOURCE_DISTANCE_LOOKUP
            } else {
                SOURCE_DISTANCE_ESTIMATE
            }
            .to_string(),
        );

        debug!(
            route = %key,
            distance_km = distance.distance_km,
            base = %tier1.subtotal,
            market_adjusted = %tier2.adjusted_price,
            final_price = %tier3.final_price,
            confidence = %confidence_score,
            "route priced"
        );

        Ok(PricingResult {
            route: key,
            freight_type: request.freight_type.clone(),
            summary: PricingSummary {
                base_price: tier1.subtotal,
                market_adjusted_price: tier2.adjusted_price,
                final_price: tier3.final_price,
                confidence_score,
                data_sources,
            },
            tier1,
            tier2,
            tier3,
        })
    }

    /// End-to-end: fetch cost variables and the full observation set, run
    /// the analyzer, then price.
    pub fn calculate<C, M>(
        &self,
        request: &PricingRequest,
        cost_provider: &C,
        market_source: &M,
    ) -> Result<PricingResult, PricingError>
    where
        C: CostVariableProvider + ?Sized,
        M: MarketDataSource + ?Sized,
    {
        validate_request(request)?;
        let costs = CostSheet::resolve(&cost_provider.cost_variables()?)?;
        let medians = self.analyzer.analyze(&market_source.observations()?);
        self.price(request, &costs, &medians)
    }
}

fn validate_request(request: &PricingRequest) -> Result<(), PricingError> {
    let fields = [
        ("origin", &request.origin),
        ("destination", &request.destination),
        ("vehicleType", &request.vehicle_type),
    ];
    for (field, value) in fields {
        if value.trim().is_empty() {
            return Err(PricingError::MissingField { field });
        }
    }
    for &(field, value) in &fields[..2] {
        if province(value).is_empty() {
            return Err(PricingError::InvalidLocation { field, value: value.to_string() });
        }
    }
    Ok(())
}

// ===========================================================================
// Tests
// ===========================================================================
