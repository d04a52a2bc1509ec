// Standardization run report
// Written to pricing-results/standardize-{timestamp}.json

use fph_engine::batch::BatchSummary;
use fph_engine::import::ImportSummary;
use fph_engine::money::number;
use fph_engine::{BatchReport, Krw, MedianBasis, PricingResult};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::{Path, PathBuf};

// ─── Per-route line ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteLine {
    pub route: String,
    pub vehicle_type: String,
    pub distance_km: u32,
    pub base_price: Krw,
    pub market_adjusted_price: Krw,
    pub final_price: Krw,
    #[serde(with = "number")]
    pub confidence_score: Decimal,
    pub market_basis: Option<MedianBasis>,
    pub market_samples: usize,
    pub data_sources: Vec<String>,
}

impl From<&PricingResult> for RouteLine {
    fn from(r: &PricingResult) -> Self {
        Self {
            route: format!("{} → {}", r.route.origin, r.route.destination),
            vehicle_type: r.route.vehicle_type.clone(),
            distance_km: r.tier1.distance_km,
            base_price: r.summary.base_price,
            market_adjusted_price: r.summary.market_adjusted_price,
            final_price: r.summary.final_price,
            confidence_score: r.summary.confidence_score,
            market_basis: r.tier2.market.as_ref().map(|m| m.basis),
            market_samples: r.tier2.market.as_ref().map_or(0, |m| m.sample_size),
            data_sources: r.summary.data_sources.clone(),
        }
    }
}

// ─── Imports ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSection {
    pub cost_rows: Option<ImportSummary>,
    pub market_rows: Option<ImportSummary>,
    pub synthetic_observations: usize,
}

// ─── Top-level report ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub timestamp: String,
    pub version: &'static str,
    pub seed: u64,
    pub config_source: String,
    pub observations: usize,
    pub route_medians: usize,
    pub imports: ImportSection,
    pub summary: BatchSummary,
    pub routes: Vec<RouteLine>,
    pub batch: BatchReport,
}

impl RunReport {
    /// Write as pretty JSON under `dir`, creating it if needed.
    pub fn write(&self, dir: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("standardize-{}.json", self.timestamp));
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

pub fn print_routes(routes: &[RouteLine]) {
    println!(
        "  {:<40} {:>5} {:>6} {:>12} {:>12} {:>12} {:>6}",
        "Route", "Veh", "km", "Base", "Market", "Final", "Conf"
    );
    println!("  {}", "-".repeat(101));
    for line in routes {
        println!(
            "  {:<40} {:>5} {:>6} {:>12} {:>12} {:>12} {:>6}",
            line.route,
            line.vehicle_type,
            line.distance_km,
            line.base_price.0,
            line.market_adjusted_price.0,
            line.final_price.0,
            line.confidence_score,
        );
    }
    println!("  {}", "-".repeat(101));
}
