// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Store boundary: the engine reads cost variables and observations through
//! these traits and hands finished route standards back for upsert.
//!
//! [`InMemoryStore`] implements all three and round-trips through a JSON
//! snapshot so the binary can keep state between runs.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cost::default_cost_variables;
use crate::types::{CostVariable, MarketObservation, RouteKey, RouteStandard};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("no route standard for {0}")]
    NotFound(RouteKey),

    #[error("store snapshot (de)serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Boundary traits
// ---------------------------------------------------------------------------

/// Source of named business variables. Missing items fall back to the
/// compiled-in defaults when the sheet is resolved, not here.
pub trait CostVariableProvider {
    fn cost_variables(&self) -> Result<Vec<CostVariable>, StoreError>;
}

/// The full current set of historical price records.
pub trait MarketDataSource {
    fn observations(&self) -> Result<Vec<MarketObservation>, StoreError>;
}

/// Persisted route standards, unique per `(origin, destination, vehicleType)`.
pub trait RouteStandardStore {
    /// Insert or replace. Last write wins.
    fn upsert_route_standard(&mut self, standard: RouteStandard) -> Result<(), StoreError>;

    fn route_standard(&self, key: &RouteKey) -> Result<RouteStandard, StoreError>;

    fn route_standards(&self) -> Result<Vec<RouteStandard>, StoreError>;
}

// ---------------------------------------------------------------------------
// InMemoryStore
// ---------------------------------------------------------------------------

/// Serialized form of an [`InMemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    #[serde(default)]
    pub cost_variables: Vec<CostVariable>,
    #[serde(default)]
    pub observations: Vec<MarketObservation>,
    #[serde(default)]
    pub route_standards: Vec<RouteStandard>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    cost_variables: BTreeMap<String, CostVariable>,
    observations: Vec<MarketObservation>,
    route_standards: BTreeMap<RouteKey, RouteStandard>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store holding the default cost table.
    pub fn seeded() -> Self {
        let mut store = Self::new();
        for var in default_cost_variables() {
            store.upsert_cost_variable(var);
        }
        store
    }

    /// Keyed by trimmed `item`; replaces any existing row.
    pub fn upsert_cost_variable(&mut self, mut var: CostVariable) {
        var.item = var.item.trim().to_string();
        self.cost_variables.insert(var.item.clone(), var);
    }

    pub fn add_observations<I>(&mut self, observations: I)
    where
        I: IntoIterator<Item = MarketObservation>,
    {
        self.observations.extend(observations);
    }

    pub fn observation_count(&self) -> usize {
        self.observations.len()
    }

    pub fn route_standard_count(&self) -> usize {
        self.route_standards.len()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            cost_variables: self.cost_variables.values().cloned().collect(),
            observations: self.observations.clone(),
            route_standards: self.route_standards.values().cloned().collect(),
        }
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut store = Self::new();
        for var in snapshot.cost_variables {
            store.upsert_cost_variable(var);
        }
        store.observations = snapshot.observations;
        for standard in snapshot.route_standards {
            store.route_standards.insert(standard.key(), standard);
        }
        store
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(Self::from_snapshot(serde_json::from_str(json)?))
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let store = Self::from_json(&std::fs::read_to_string(path)?)?;
        debug!(
            path = %path.display(),
            cost_variables = store.cost_variables.len(),
            observations = store.observations.len(),
            route_standards = store.route_standards.len(),
            "store snapshot loaded"
        );
        Ok(store)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

impl CostVariableProvider for InMemoryStore {
    fn cost_variables(&self) -> Result<Vec<CostVariable>, StoreError> {
        Ok(self.cost_variables.values().cloned().collect())
    }
}

impl MarketDataSource for InMemoryStore {
    fn observations(&self) -> Result<Vec<MarketObservation>, StoreError> {
        Ok(self.observations.clone())
    }
}

impl RouteStandardStore for InMemoryStore {
    fn upsert_route_standard(&mut self, standard: RouteStandard) -> Result<(), StoreError> {
        self.route_standards.insert(standard.key(), standard);
        Ok(())
    }

    fn route_standard(&self, key: &RouteKey) -> Result<RouteStandard, StoreError> {
        self.route_standards
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    fn route_standards(&self) -> Result<Vec<RouteStandard>, StoreError> {
        Ok(self.route_standards.values().cloned().collect())
    }
}
