// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Batch pricing with per-request failure isolation.
//!
//! Cost variables and observations are fetched once per call and the
//! analyzer runs once; every request then prices against that snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::analyzer::RouteMedianResult;
use crate::cost::CostSheet;
use crate::engine::{PricingEngine, PricingError, PricingResult};
use crate::store::{CostVariableProvider, MarketDataSource, RouteStandardStore};
use crate::types::PricingRequest;

/// Diagnostic lines carried by a report summary.
pub const MAX_DIAGNOSTICS: usize = 20;

/// One failed request, identified by its position in the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchError {
    pub index: usize,
    /// `"origin → destination"`.
    pub route: String,
    pub message: String,
}

impl BatchError {
    fn new(index: usize, request: &PricingRequest, message: String) -> Self {
        Self { index, route: request.route_label(), message }
    }

    fn line(&self) -> String {
        format!("#{} {}: {}", self.index, self.route, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub results: Vec<PricingResult>,
    pub errors: Vec<BatchError>,
    /// Requests that priced but could not be stored. Their results stay in
    /// `results`.
    #[serde(default)]
    pub persist_errors: Vec<BatchError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub persist_failed: usize,
    /// First [`MAX_DIAGNOSTICS`] error lines, pricing failures first.
    pub messages: Vec<String>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.results.len() + self.errors.len()
    }

    pub fn summary(&self) -> BatchSummary {
        let messages = self
            .errors
            .iter()
            .chain(&self.persist_errors)
            .take(MAX_DIAGNOSTICS)
            .map(BatchError::line)
            .collect();
        BatchSummary {
            total: self.total(),
            succeeded: self.results.len(),
            failed: self.errors.len(),
            persist_failed: self.persist_errors.len(),
            messages,
        }
    }
}

/// Inputs shared by every request of one batch.
struct BatchInputs {
    costs: CostSheet,
    medians: Vec<RouteMedianResult>,
}

#[derive(Debug, Clone, Default)]
pub struct BatchRunner {
    engine: PricingEngine,
}

impl BatchRunner {
    pub fn new(engine: PricingEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &PricingEngine {
        &self.engine
    }

    fn fetch<C, M>(&self, costs: &C, market: &M) -> Result<BatchInputs, PricingError>
    where
        C: CostVariableProvider + ?Sized,
        M: MarketDataSource + ?Sized,
    {
        let costs = CostSheet::resolve(&costs.cost_variables()?)?;
        let medians = self.engine.analyzer().analyze(&market.observations()?);
        Ok(BatchInputs { costs, medians })
    }

    /// Price every request. Failures are recorded by index and never stop
    /// the batch; if the shared inputs cannot be fetched, every request
    /// carries that failure.
    pub fn run<C, M>(&self, requests: &[PricingRequest], costs: &C, market: &M) -> BatchReport
    where
        C: CostVariableProvider + ?Sized,
        M: MarketDataSource + ?Sized,
    {
        let mut report = BatchReport::default();

        match self.fetch(costs, market) {
            Ok(inputs) => {
                for (index, request) in requests.iter().enumerate() {
                    match self.engine.price(request, &inputs.costs, &inputs.medians) {
                        Ok(result) => report.results.push(result),
                        Err(e) => {
                            warn!(index, route = %request.route_label(), error = %e, "request failed");
                            report.errors.push(BatchError::new(index, request, e.to_string()));
                        }
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, requests = requests.len(), "batch inputs unavailable");
                let message = e.to_string();
                report.errors = requests
                    .iter()
                    .enumerate()
                    .map(|(index, request)| BatchError::new(index, request, message.clone()))
                    .collect();
            }
        }

        info!(
            total = report.total(),
            succeeded = report.results.len(),
            failed = report.errors.len(),
            "batch priced"
        );
        report
    }

    /// [`run`](Self::run), then upsert each success as a route standard.
    /// A failed upsert is reported and the result is kept.
    pub fn run_and_persist<S>(&self, requests: &[PricingRequest], store: &mut S) -> BatchReport
    where
        S: CostVariableProvider + MarketDataSource + RouteStandardStore + ?Sized,
    {
        let mut report = self.run(requests, &*store, &*store);

        // Results are in request order; recover each one's input index.
        let failed: BTreeSet<usize> = report.errors.iter().map(|e| e.index).collect();
        let succeeded = (0..requests.len()).filter(|i| !failed.contains(i));

        for (index, result) in succeeded.zip(&report.results) {
            if let Err(e) = store.upsert_route_standard(result.to_route_standard()) {
                warn!(index, route = %result.route, error = %e, "route standard not persisted");
                report
                    .persist_errors
                    .push(BatchError::new(index, &requests[index], e.to_string()));
            }
        }

        info!(
            persisted = report.results.len() - report.persist_errors.len(),
            persist_failed = report.persist_errors.len(),
            "batch persisted"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, StoreError};
    use crate::types::{CostVariable, MarketObservation, RouteKey, RouteStandard};
    use chrono::NaiveDate;

    fn requests() -> Vec<PricingRequest> {
        vec![
            PricingRequest::new("Seoul/Gangnam", "Busan/Haeundae", "11t"),
            PricingRequest::new("", "Busan/Haeundae", "11t"),
            PricingRequest::new("Daegu/Suseong", "Seoul/Mapo", "5t").with_freight("Frozen food"),
        ]
    }

    struct DownStore;

    impl CostVariableProvider for DownStore {
        fn cost_variables(&self) -> Result<Vec<CostVariable>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    impl MarketDataSource for DownStore {
        fn observations(&self) -> Result<Vec<MarketObservation>, StoreError> {
            Ok(Vec::new())
        }
    }

    /// Reads succeed, writes fail.
    struct ReadOnlyStore(InMemoryStore);

    impl CostVariableProvider for ReadOnlyStore {
        fn cost_variables(&self) -> Result<Vec<CostVariable>, StoreError> {
            self.0.cost_variables()
        }
    }

    impl MarketDataSource for ReadOnlyStore {
        fn observations(&self) -> Result<Vec<MarketObservation>, StoreError> {
            self.0.observations()
        }
    }

    impl RouteStandardStore for ReadOnlyStore {
        fn upsert_route_standard(&mut self, _standard: RouteStandard) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("read-only replica".to_string()))
        }

        fn route_standard(&self, key: &RouteKey) -> Result<RouteStandard, StoreError> {
            self.0.route_standard(key)
        }

        fn route_standards(&self) -> Result<Vec<RouteStandard>, StoreError> {
            self.0.route_standards()
        }
    }

    #[test]
    fn bad_request_does_not_abort_batch() {
        let store = InMemoryStore::seeded();
        let report = BatchRunner::default().run(&requests(), &store, &store);
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].index, 1);
        assert_eq!(report.errors[0].route, " → Busan/Haeundae");
        assert!(report.errors[0].message.contains("origin"));
    }

    #[test]
    fn results_keep_request_order() {
        let store = InMemoryStore::seeded();
        let report = BatchRunner::default().run(&requests(), &store, &store);
        assert_eq!(report.results[0].route.origin, "Seoul/Gangnam");
        assert_eq!(report.results[1].route.origin, "Daegu/Suseong");
    }

    #[test]
    fn unavailable_store_fails_every_request() {
        let report = BatchRunner::default().run(&requests(), &DownStore, &DownStore);
        assert!(report.results.is_empty());
        let indices: Vec<usize> = report.errors.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(report.errors[2].message.contains("connection refused"));
    }

    #[test]
    fn persist_writes_every_success() {
        let mut store = InMemoryStore::seeded();
        let report = BatchRunner::default().run_and_persist(&requests(), &mut store);
        assert!(report.persist_errors.is_empty());
        assert_eq!(store.route_standard_count(), 2);
        let key = RouteKey::new("Daegu/Suseong", "Seoul/Mapo", "5t");
        let stored = store.route_standard(&key).expect("test: persisted");
        assert_eq!(stored, report.results[1].to_route_standard());
    }

    #[test]
    fn persist_failure_keeps_results() {
        let mut store = ReadOnlyStore(InMemoryStore::seeded());
        let report = BatchRunner::default().run_and_persist(&requests(), &mut store);
        assert_eq!(report.results.len(), 2);
        let indices: Vec<usize> = report.persist_errors.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn persist_failures_keep_input_indices_between_bad_requests() {
        let requests = vec![
            PricingRequest::new("Seoul/Gangnam", "Busan/Haeundae", "11t"),
            PricingRequest::new("Seoul/Gangnam", "", "11t"),
            PricingRequest::new("Daegu/Suseong", "Seoul/Mapo", "5t"),
            PricingRequest::new("Daegu/Suseong", "Seoul/Mapo", " "),
            PricingRequest::new("/Jung", "Seoul/Mapo", "5t"),
            PricingRequest::new("Incheon/Namdong", "Gwangju/Buk", "1t"),
        ];
        let mut store = ReadOnlyStore(InMemoryStore::seeded());
        let report = BatchRunner::default().run_and_persist(&requests, &mut store);

        let failed: Vec<usize> = report.errors.iter().map(|e| e.index).collect();
        assert_eq!(failed, vec![1, 3, 4]);
        let unpersisted: Vec<usize> = report.persist_errors.iter().map(|e| e.index).collect();
        assert_eq!(unpersisted, vec![0, 2, 5]);
        assert_eq!(report.persist_errors[2].route, "Incheon/Namdong → Gwangju/Buk");
    }

    #[test]
    fn summary_json_uses_ui_field_names() {
        let mut store = ReadOnlyStore(InMemoryStore::seeded());
        let report = BatchRunner::default().run_and_persist(&requests(), &mut store);
        let json = serde_json::to_value(report.summary()).expect("test: serializable");
        assert_eq!(json["total"], 3);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["persistFailed"], 2);
        let json = serde_json::to_value(&report).expect("test: serializable");
        assert_eq!(json["persistErrors"][0]["index"], 0);
        assert_eq!(json["results"][0]["summary"]["finalPrice"], 433000);
    }

    #[test]
    fn summary_caps_messages() {
        let store = InMemoryStore::seeded();
        let bad: Vec<PricingRequest> = (0..30).map(|_| PricingRequest::new("Seoul/A", "", "1t")).collect();
        let summary = BatchRunner::default().run(&bad, &store, &store).summary();
        assert_eq!(summary.total, 30);
        assert_eq!(summary.failed, 30);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.messages.len(), MAX_DIAGNOSTICS);
        assert!(summary.messages[0].starts_with("#0 Seoul/A → :"));
    }

    #[test]
    fn batch_matches_single_calculation() {
        let mut store = InMemoryStore::seeded();
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).expect("test: valid date");
        store.add_observations((0..8).map(|i| MarketObservation {
            date,
            origin: "Seoul/Gangnam".to_string(),
            destination: "Busan/Haeundae".to_string(),
            vehicle_type: "11t".to_string(),
            freight_type: "General".to_string(),
            unit_price: 420000.0 + 1000.0 * i as f64,
        }));
        let runner = BatchRunner::default();
        let report = runner.run(&requests(), &store, &store);
        let single = runner
            .engine()
            .calculate(&requests()[0], &store, &store)
            .expect("test: single run");
        assert_eq!(report.results[0], single);
        assert!(single.tier2.has_market_data);
    }
}
