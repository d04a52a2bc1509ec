// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Constant lookup tables and business weights, injected into the resolver,
//! analyzer and engine.
//!
//! Everything here is immutable once validated. Tests substitute fixtures by
//! building their own [`PricingConfig`] instead of touching shared state.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("fuel efficiency for `{vehicle_type}` must be positive, got {value}")]
    NonPositiveEfficiency { vehicle_type: String, value: Decimal },

    #[error("corridor entry has a blank province name ({a:?} ↔ {b:?})")]
    BlankCorridor { a: String, b: String },

    #[error("weight `{name}` must lie in [0, 1], got {value}")]
    WeightOutOfRange { name: &'static str, value: f64 },

    #[error("minimum sample size must be at least 1")]
    ZeroMinSampleSize,

    #[error("cost variable `{item}` is invalid: {reason}")]
    InvalidCostVariable { item: String, reason: String },

    #[error("config parse failed: {0}")]
    Parse(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// VehicleEfficiencyTable
// ---------------------------------------------------------------------------

/// Vehicle type → fuel efficiency in km per liter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleEfficiencyTable(pub BTreeMap<String, Decimal>);

impl Default for VehicleEfficiencyTable {
    fn default() -> Self {
        let rows = [
            ("1t", dec!(9.0)),
            ("1.4t", dec!(8.5)),
            ("2.5t", dec!(7.0)),
            ("3.5t", dec!(6.0)),
            ("5t", dec!(5.0)),
            ("8t", dec!(4.2)),
            ("11t", dec!(3.5)),
            ("14t", dec!(3.2)),
            ("18t", dec!(3.0)),
            ("25t", dec!(2.7)),
        ];
        Self(rows.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

impl VehicleEfficiencyTable {
    pub fn get(&self, vehicle_type: &str) -> Option<Decimal> {
        self.0.get(vehicle_type.trim()).copied()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (vehicle_type, value) in &self.0 {
            if *value <= Decimal::ZERO {
                return Err(ConfigError::NonPositiveEfficiency {
                    vehicle_type: vehicle_type.clone(),
                    value: *value,
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DistanceTable
// ---------------------------------------------------------------------------

/// Symmetric road distance between two provinces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Corridor {
    pub a: String,
    pub b: String,
    pub km: u32,
}

/// Province centroid in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub lat: f64,
    pub lon: f64,
}

/// Reference data for the distance resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceTable {
    pub corridors: Vec<Corridor>,
    pub centroids: BTreeMap<String, Centroid>,
}

impl Default for DistanceTable {
    fn default() -> Self {
        let corridors = [
            ("Seoul", "Busan", 325),
            ("Seoul", "Daegu", 237),
            ("Seoul", "Daejeon", 140),
            ("Seoul", "Gwangju", 268),
            ("Seoul", "Ulsan", 300),
            ("Seoul", "Incheon", 40),
            ("Seoul", "Gyeonggi", 35),
            ("Incheon", "Busan", 350),
            ("Gyeonggi", "Busan", 310),
            ("Gyeonggi", "Daegu", 220),
            ("Busan", "Daegu", 110),
            ("Busan", "Ulsan", 50),
            ("Busan", "Gwangju", 200),
            ("Daejeon", "Daegu", 150),
            ("Daejeon", "Gwangju", 170),
        ]
        .into_iter()
        .map(|(a, b, km)| Corridor { a: a.to_string(), b: b.to_string(), km })
        .collect();

        let centroids = [
            ("Seoul", 37.5665, 126.9780),
            ("Busan", 35.1796, 129.0756),
            ("Incheon", 37.4563, 126.7052),
            ("Daegu", 35.8714, 128.6014),
            ("Daejeon", 36.3504, 127.3845),
            ("Gwangju", 35.1595, 126.8526),
            ("Ulsan", 35.5384, 129.3114),
            ("Sejong", 36.4800, 127.2890),
            ("Gyeonggi", 37.2752, 127.0095),
            ("Gangwon", 37.8228, 128.1555),
            ("Chungbuk", 36.6357, 127.4917),
            ("Chungnam", 36.5184, 126.8000),
            ("Jeonbuk", 35.8242, 127.1480),
            ("Jeonnam", 34.8161, 126.4629),
            ("Gyeongbuk", 36.4919, 128.8889),
            ("Gyeongnam", 35.4606, 128.2132),
            ("Jeju", 33.4996, 126.5312),
        ]
        .into_iter()
        .map(|(name, lat, lon)| (name.to_string(), Centroid { lat, lon }))
        .collect();

        Self { corridors, centroids }
    }
}

impl DistanceTable {
    /// An empty table: every cross-province route falls through to the default.
    pub fn empty() -> Self {
        Self { corridors: Vec::new(), centroids: BTreeMap::new() }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for c in &self.corridors {
            if c.a.trim().is_empty() || c.b.trim().is_empty() {
                return Err(ConfigError::BlankCorridor { a: c.a.clone(), b: c.b.clone() });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AnalyzerConfig
// ---------------------------------------------------------------------------

/// Sample-size threshold, outlier band and confidence weights for the
/// market-data analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Route groups smaller than this fall back to province pools (default 5).
    pub min_sample_size: usize,
    /// Tukey fence multiplier applied to the IQR (default 1.5).
    pub iqr_multiplier: f64,
    /// Sample size at which the size factor saturates (default 30).
    pub full_confidence_sample: usize,
    /// Weight of the size factor (default 0.6).
    pub size_weight: f64,
    /// Weight of the consistency factor (default 0.4).
    pub consistency_weight: f64,
    /// Multiplier applied to fallback confidence (default 0.7).
    pub fallback_penalty: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_sample_size: 5,
            iqr_multiplier: 1.5,
            full_confidence_sample: 30,
            size_weight: 0.6,
            consistency_weight: 0.4,
            fallback_penalty: 0.7,
        }
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_sample_size == 0 || self.full_confidence_sample == 0 {
            return Err(ConfigError::ZeroMinSampleSize);
        }
        check_unit("size_weight", self.size_weight)?;
        check_unit("consistency_weight", self.consistency_weight)?;
        check_unit("fallback_penalty", self.fallback_penalty)?;
        if !self.iqr_multiplier.is_finite() || self.iqr_multiplier < 0.0 {
            return Err(ConfigError::WeightOutOfRange {
                name: "iqr_multiplier",
                value: self.iqr_multiplier,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// BlendWeights
// ---------------------------------------------------------------------------

/// Weights of the overall confidence blend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendWeights {
    /// Weight of the distance confidence (default 0.3).
    pub distance_weight: Decimal,
    /// Weight of the market confidence (default 0.7).
    pub market_weight: Decimal,
    /// Distance confidence for a table lookup (default 1.0).
    pub lookup_confidence: Decimal,
    /// Distance confidence for a geometric estimate (default 0.6).
    pub estimate_confidence: Decimal,
    /// Market confidence when Tier 2 found no data (default 0.3).
    pub no_market_confidence: Decimal,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            distance_weight: dec!(0.3),
            market_weight: dec!(0.7),
            lookup_confidence: dec!(1.0),
            estimate_confidence: dec!(0.6),
            no_market_confidence: dec!(0.3),
        }
    }
}

impl BlendWeights {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("distance_weight", self.distance_weight),
            ("market_weight", self.market_weight),
            ("lookup_confidence", self.lookup_confidence),
            ("estimate_confidence", self.estimate_confidence),
            ("no_market_confidence", self.no_market_confidence),
        ];
        for (name, value) in fields {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(ConfigError::WeightOutOfRange {
                    name,
                    value: crate::adapter::from_decimal(value),
                });
            }
        }
        Ok(())
    }
}

fn check_unit(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::WeightOutOfRange { name, value })
    }
}

// ---------------------------------------------------------------------------
// PricingConfig
// ---------------------------------------------------------------------------

/// All injected tables and weights for one engine instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default)]
    pub vehicle_efficiency: VehicleEfficiencyTable,
    #[serde(default)]
    pub distances: DistanceTable,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub blend: BlendWeights,
}

impl PricingConfig {
    /// Parse a JSON config; absent sections keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.vehicle_efficiency.validate()?;
        self.distances.validate()?;
        self.analyzer.validate()?;
        self.blend.validate()?;
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        PricingConfig::default()
            .validate()
            .expect("test: defaults must validate");
    }

    #[test]
    fn default_weights_preserved() {
        let a = AnalyzerConfig::default();
        assert_eq!(a.min_sample_size, 5);
        assert_eq!(a.iqr_multiplier, 1.5);
        assert_eq!(a.size_weight, 0.6);
        assert_eq!(a.consistency_weight, 0.4);
        assert_eq!(a.fallback_penalty, 0.7);

        let b = BlendWeights::default();
        assert_eq!(b.distance_weight, dec!(0.3));
        assert_eq!(b.market_weight, dec!(0.7));
        assert_eq!(b.estimate_confidence, dec!(0.6));
        assert_eq!(b.no_market_confidence, dec!(0.3));
    }

    #[test]
    fn eleven_ton_truck_runs_three_and_a_half_km_per_liter() {
        let table = VehicleEfficiencyTable::default();
        assert_eq!(table.get("11t"), Some(dec!(3.5)));
        assert_eq!(table.get("hovercraft"), None);
    }

    #[test]
    fn zero_efficiency_rejected_at_load() {
        let mut config = PricingConfig::default();
        config.vehicle_efficiency.0.insert("bike".to_string(), Decimal::ZERO);
        let err = config.validate();
        assert!(
            matches!(err, Err(ConfigError::NonPositiveEfficiency { ref vehicle_type, .. }) if vehicle_type == "bike"),
            "expected NonPositiveEfficiency, got {err:?}"
        );
    }

    #[test]
    fn blank_corridor_rejected() {
        let mut table = DistanceTable::empty();
        table.corridors.push(Corridor { a: " ".to_string(), b: "Busan".to_string(), km: 10 });
        assert!(matches!(table.validate(), Err(ConfigError::BlankCorridor { .. })));
    }

    #[test]
    fn out_of_range_weight_rejected() {
        let mut config = PricingConfig::default();
        config.blend.market_weight = dec!(1.2);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WeightOutOfRange { name: "market_weight", .. })
        ));

        let mut config = PricingConfig::default();
        config.analyzer.min_sample_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroMinSampleSize)));
    }

    #[test]
    fn json_overrides_only_named_sections() {
        let config = PricingConfig::from_json(r#"{"vehicle_efficiency": {"11t": "3.2"}}"#)
            .expect("test: partial config should parse");
        assert_eq!(config.vehicle_efficiency.get("11t"), Some(dec!(3.2)));
        assert_eq!(config.vehicle_efficiency.get("5t"), None);
        assert_eq!(config.analyzer, AnalyzerConfig::default());
        assert_eq!(config.distances, DistanceTable::default());
    }

    #[test]
    fn json_with_bad_efficiency_fails_validation() {
        let err = PricingConfig::from_json(r#"{"vehicle_efficiency": {"11t": -1}}"#);
        assert!(matches!(err, Err(ConfigError::NonPositiveEfficiency { .. })));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert!(matches!(PricingConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }
}
