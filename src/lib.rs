// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Freight Price Standardization Engine (Fundamental Pricing Hierarchy)

pub mod money;
pub mod adapter;
pub mod types;
pub mod config;
pub mod cost;
pub mod distance;
pub mod analyzer;
pub mod engine;
pub mod batch;
pub mod store;
pub mod import;

pub use analyzer::{MarketDataAnalyzer, MedianBasis, RouteMedianResult};
pub use batch::{BatchReport, BatchRunner, BatchSummary};
pub use config::{ConfigError, PricingConfig};
pub use cost::CostSheet;
pub use distance::{DistanceSource, ResolvedDistance, RouteDistanceResolver};
pub use engine::{PricingEngine, PricingError, PricingResult};
pub use import::{import_cost_rows, import_market_rows, ImportReport, RawRow, RowError};
pub use money::Krw;
pub use store::{CostVariableProvider, InMemoryStore, MarketDataSource, RouteStandardStore, StoreError};
pub use types::*;

use serde::Serialize;
use tracing::warn;
use wasm_bindgen::prelude::*;

// ─── WASM Interface ──────────────────────────────────────────────────────────

/// Browser-side pricing session: an in-memory store plus a configured
/// engine. Every call speaks the JSON contract of the pricing UI.
#[wasm_bindgen]
pub struct PricingSession {
    runner: BatchRunner,
    store: InMemoryStore,
}

#[derive(Serialize)]
struct BatchResponse<'a> {
    summary: BatchSummary,
    #[serde(flatten)]
    report: &'a BatchReport,
}

#[wasm_bindgen]
impl PricingSession {
    /// Default tables, seeded cost master, no observations.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        #[cfg(target_arch = "wasm32")]
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));

        Self {
            runner: BatchRunner::default(),
            store: InMemoryStore::seeded(),
        }
    }

    /// Session over a JSON [`PricingConfig`]; rejected if it fails validation.
    pub fn with_config(config_json: &str) -> Result<PricingSession, JsError> {
        let engine = PricingEngine::new(PricingConfig::from_json(config_json)?)?;
        let mut session = Self::new();
        session.runner = BatchRunner::new(engine);
        Ok(session)
    }

    pub fn load_snapshot(&mut self, json: &str) -> Result<(), JsError> {
        self.store = InMemoryStore::from_json(json)?;
        Ok(())
    }

    pub fn snapshot(&self) -> Result<String, JsError> {
        Ok(self.store.to_json()?)
    }

    /// Import cost-master rows, upserting each valid row. Returns the import summary.
    pub fn load_cost_rows(&mut self, rows: JsValue) -> Result<JsValue, JsError> {
        let rows: Vec<RawRow> = serde_wasm_bindgen::from_value(rows)?;
        let report = import_cost_rows(&rows);
        for var in report.records.iter().cloned() {
            self.store.upsert_cost_variable(var);
        }
        Ok(serde_wasm_bindgen::to_value(&report.summary())?)
    }

    /// Import market rows, appending each valid row. Returns the import summary.
    pub fn load_market_rows(&mut self, rows: JsValue) -> Result<JsValue, JsError> {
        let rows: Vec<RawRow> = serde_wasm_bindgen::from_value(rows)?;
        let report = import_market_rows(&rows);
        let summary = report.summary();
        self.store.add_observations(report.records);
        Ok(serde_wasm_bindgen::to_value(&summary)?)
    }

    pub fn observation_count(&self) -> usize {
        self.store.observation_count()
    }

    /// Per-route medians over every stored observation.
    pub fn analyze(&self) -> Result<JsValue, JsError> {
        let results = self.runner.engine().analyzer().analyze(&self.store.observations()?);
        Ok(serde_wasm_bindgen::to_value(&results)?)
    }

    /// Price one request and store it as a route standard. A failed
    /// upsert is logged; the result is returned either way.
    pub fn calculate(&mut self, request: JsValue) -> Result<JsValue, JsError> {
        let request: PricingRequest = serde_wasm_bindgen::from_value(request)?;
        let result = self.runner.engine().calculate(&request, &self.store, &self.store)?;
        if let Err(e) = self.store.upsert_route_standard(result.to_route_standard()) {
            warn!(route = %result.route, error = %e, "route standard not persisted");
        }
        Ok(serde_wasm_bindgen::to_value(&result)?)
    }

    /// Price and persist a list of requests; failures are reported per index.
    pub fn run_batch(&mut self, requests: JsValue) -> Result<JsValue, JsError> {
        let requests: Vec<PricingRequest> = serde_wasm_bindgen::from_value(requests)?;
        let report = self.runner.run_and_persist(&requests, &mut self.store);
        let response = BatchResponse { summary: report.summary(), report: &report };
        Ok(serde_wasm_bindgen::to_value(&response)?)
    }

    pub fn route_standards(&self) -> JsValue {
        match self.store.route_standards() {
            Ok(standards) => serde_wasm_bindgen::to_value(&standards).unwrap_or(JsValue::NULL),
            Err(_) => JsValue::NULL,
        }
    }
}

impl Default for PricingSession {
    fn default() -> Self {
        Self::new()
    }
}
