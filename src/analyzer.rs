// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Market-data analyzer -- turns raw price observations into per-route
//! medians with a confidence score.
//!
//! Observations are grouped by exact route and, independently, by province
//! pair. Route groups with enough samples are IQR-filtered on their own;
//! sparse groups fall back to their province pool, filtered when that pool
//! is large enough and taken raw otherwise. Statistics run on `f64` and are
//! rounded into [`Krw`] / 2-dp scores at the output boundary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::adapter::{to_krw, to_score};
use crate::config::AnalyzerConfig;
use crate::money::{number, Krw};
use crate::types::{MarketObservation, RouteKey};

// ---------------------------------------------------------------------------
// Order statistics
// ---------------------------------------------------------------------------

/// Linear-interpolated quantile of an ascending slice. Empty input yields 0.
///
/// `position = q * (n - 1)`, interpolating between the floor and ceil order
/// statistics.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    v
}

/// Outcome of Tukey-fence filtering over one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct IqrSummary {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Values inside `[lower_bound, upper_bound]`, ascending.
    pub kept: Vec<f64>,
}

/// Keep values within `[Q1 - k·IQR, Q3 + k·IQR]` (inclusive).
pub fn iqr_filter(values: &[f64], multiplier: f64) -> IqrSummary {
    let sorted = sorted(values);
    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let lower_bound = q1 - multiplier * iqr;
    let upper_bound = q3 + multiplier * iqr;
    let kept = sorted
        .into_iter()
        .filter(|v| *v >= lower_bound && *v <= upper_bound)
        .collect();
    IqrSummary { q1, q3, iqr, lower_bound, upper_bound, kept }
}

/// `max(0, 1 - CV)` with CV = population std-dev / mean. Returns 1.0 for
/// fewer than two values or a non-positive mean.
pub fn consistency_factor(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 1.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return 1.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (1.0 - variance.sqrt() / mean).max(0.0)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Confidence in `[0, 1]`, rounded to 2 decimals.
///
/// `round(size·w_size + consistency·w_consistency, 2)`, then multiplied by
/// the fallback penalty and rounded again for fallback results.
pub fn confidence_score(
    sample_size: usize,
    filtered: &[f64],
    fallback: bool,
    config: &AnalyzerConfig,
) -> f64 {
    let size_factor = (sample_size as f64 / config.full_confidence_sample as f64).min(1.0);
    let blended = round2(
        size_factor * config.size_weight + consistency_factor(filtered) * config.consistency_weight,
    );
    let score = if fallback {
        round2(blended * config.fallback_penalty)
    } else {
        blended
    };
    score.clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Level a fallback result was aggregated at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackLevel {
    Province,
}

/// Which sample a median was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedianBasis {
    /// Exact route with enough samples, IQR-filtered.
    Route,
    /// Province pool with enough samples, IQR-filtered.
    ProvinceFiltered,
    /// Province pool still too small; raw values, no filtering.
    ProvinceRaw,
}

impl MedianBasis {
    pub fn is_fallback(&self) -> bool {
        !matches!(self, Self::Route)
    }

    pub fn fallback_level(&self) -> Option<FallbackLevel> {
        match self {
            Self::Route => None,
            Self::ProvinceFiltered | Self::ProvinceRaw => Some(FallbackLevel::Province),
        }
    }
}

/// Median and confidence for one route (or province pair) and vehicle type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMedianResult {
    pub origin: String,
    pub destination: String,
    pub vehicle_type: String,
    pub median: Krw,
    pub sample_size: usize,
    pub filtered_size: usize,
    pub q1: Krw,
    pub q3: Krw,
    pub iqr: Krw,
    pub lower_bound: Krw,
    pub upper_bound: Krw,
    /// In `[0, 1]`, 2 decimals.
    #[serde(with = "number")]
    pub confidence_score: Decimal,
    pub basis: MedianBasis,
    /// Mirrors `basis` for the UI.
    pub is_fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_level: Option<FallbackLevel>,
}

impl RouteMedianResult {
    pub fn key(&self) -> RouteKey {
        RouteKey::new(&self.origin, &self.destination, &self.vehicle_type)
    }
}

// ---------------------------------------------------------------------------
// MarketDataAnalyzer
// ---------------------------------------------------------------------------

/// Stateless analyzer -- holds only its thresholds and weights.
#[derive(Debug, Clone, Default)]
pub struct MarketDataAnalyzer {
    config: AnalyzerConfig,
}

impl MarketDataAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// One result per exact route group with enough samples, plus one per
    /// province pair that sparse groups fell back to. Sorted by descending
    /// confidence; ties keep route-key order.
    pub fn analyze(&self, observations: &[MarketObservation]) -> Vec<RouteMedianResult> {
        let mut exact: BTreeMap<RouteKey, Vec<f64>> = BTreeMap::new();
        let mut provinces: BTreeMap<RouteKey, Vec<f64>> = BTreeMap::new();
        for obs in observations.iter().filter(|o| o.unit_price.is_finite()) {
            exact.entry(obs.route_key()).or_default().push(obs.unit_price);
            provinces.entry(obs.province_key()).or_default().push(obs.unit_price);
        }

        let min = self.config.min_sample_size;
        let mut results = Vec::with_capacity(exact.len());
        let mut handled_provinces = BTreeSet::new();

        for (key, prices) in &exact {
            if prices.len() >= min {
                results.push(self.filtered_result(key, prices, MedianBasis::Route));
                continue;
            }

            // A district-less route such as `Seoul → Busan` shares its key with
            // the province pair. One result per key: the dense route wins.
            let province_key = key.province_level();
            if exact.get(&province_key).is_some_and(|route| route.len() >= min) {
                debug!(route = %key, "sparse route resolves to the exact province-level route");
                continue;
            }
            if !handled_provinces.insert(province_key.clone()) {
                continue;
            }
            let pool = match provinces.get(&province_key) {
                Some(pool) if pool.len() >= prices.len() => pool.as_slice(),
                _ => prices.as_slice(),
            };

            let result = if pool.len() < min {
                self.raw_result(&province_key, pool)
            } else {
                self.filtered_result(&province_key, pool, MedianBasis::ProvinceFiltered)
            };
            debug!(
                route = %key,
                route_samples = prices.len(),
                pool_samples = pool.len(),
                basis = ?result.basis,
                "sparse route fell back to province pool"
            );
            results.push(result);
        }

        results.sort_by(|a, b| b.confidence_score.cmp(&a.confidence_score));
        debug!(
            observations = observations.len(),
            routes = exact.len(),
            results = results.len(),
            "market data analyzed"
        );
        results
    }

    fn filtered_result(&self, key: &RouteKey, prices: &[f64], basis: MedianBasis) -> RouteMedianResult {
        let summary = iqr_filter(prices, self.config.iqr_multiplier);
        let median = quantile(&summary.kept, 0.5);
        let confidence = confidence_score(prices.len(), &summary.kept, basis.is_fallback(), &self.config);
        RouteMedianResult {
            origin: key.origin.clone(),
            destination: key.destination.clone(),
            vehicle_type: key.vehicle_type.clone(),
            median: to_krw(median),
            sample_size: prices.len(),
            filtered_size: summary.kept.len(),
            q1: to_krw(summary.q1),
            q3: to_krw(summary.q3),
            iqr: to_krw(summary.iqr),
            lower_bound: to_krw(summary.lower_bound),
            upper_bound: to_krw(summary.upper_bound),
            confidence_score: to_score(confidence),
            basis,
            is_fallback: basis.is_fallback(),
            fallback_level: basis.fallback_level(),
        }
    }

    fn raw_result(&self, key: &RouteKey, prices: &[f64]) -> RouteMedianResult {
        let values = sorted(prices);
        let confidence = confidence_score(values.len(), &values, true, &self.config);
        RouteMedianResult {
            origin: key.origin.clone(),
            destination: key.destination.clone(),
            vehicle_type: key.vehicle_type.clone(),
            median: to_krw(quantile(&values, 0.5)),
            sample_size: values.len(),
            filtered_size: values.len(),
            q1: Krw::zero(),
            q3: Krw::zero(),
            iqr: Krw::zero(),
            lower_bound: Krw::zero(),
            upper_bound: Krw::zero(),
            confidence_score: to_score(confidence),
            basis: MedianBasis::ProvinceRaw,
            is_fallback: true,
            fallback_level: Some(FallbackLevel::Province),
        }
    }
}

/// Find the median for a route: exact key first, then its province pair.
pub fn find_median<'a>(results: &'a [RouteMedianResult], key: &RouteKey) -> Option<&'a RouteMedianResult> {
    lookup(results, key).or_else(|| lookup(results, &key.province_level()))
}

fn lookup<'a>(results: &'a [RouteMedianResult], key: &RouteKey) -> Option<&'a RouteMedianResult> {
    results.iter().find(|r| {
        r.origin == key.origin && r.destination == key.destination && r.vehicle_type == key.vehicle_type
    })
}

// ===========================================================================
// Tests
// ===========================================================================
