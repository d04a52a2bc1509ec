// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Route distance resolution.
//!
//! Resolution order, first match wins:
//! 1. same province -> fixed intra-province distance
//! 2. corridor table (unordered province pair)
//! 3. haversine between province centroids times a road factor
//! 4. absolute default

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::{Centroid, DistanceTable};
use crate::types::province;

/// Flat distance for any route inside one province.
pub const INTRA_PROVINCE_KM: u32 = 30;
/// Distance when neither province is known.
pub const DEFAULT_KM: u32 = 200;
/// Great-circle to road distance multiplier.
pub const ROAD_FACTOR: f64 = 1.3;
pub const EARTH_RADIUS_KM: f64 = 6371.0;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Provenance of a resolved distance; feeds the overall confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceSource {
    Lookup,
    Haversine,
}

impl DistanceSource {
    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::Lookup)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedDistance {
    pub distance_km: u32,
    pub source: DistanceSource,
}

// ---------------------------------------------------------------------------
// RouteDistanceResolver
// ---------------------------------------------------------------------------

/// Immutable index over a [`DistanceTable`].
#[derive(Debug, Clone)]
pub struct RouteDistanceResolver {
    corridors: HashMap<(String, String), u32>,
    centroids: HashMap<String, Centroid>,
}

impl Default for RouteDistanceResolver {
    fn default() -> Self {
        Self::new(&DistanceTable::default())
    }
}

impl RouteDistanceResolver {
    pub fn new(table: &DistanceTable) -> Self {
        let corridors = table
            .corridors
            .iter()
            .map(|c| (pair_key(c.a.trim(), c.b.trim()), c.km))
            .collect();
        let centroids = table
            .centroids
            .iter()
            .map(|(name, c)| (name.trim().to_string(), *c))
            .collect();
        Self { corridors, centroids }
    }

    /// Total over any two locations; never fails.
    pub fn resolve(&self, origin: &str, destination: &str) -> ResolvedDistance {
        let from = province(origin);
        let to = province(destination);

        if from == to {
            return ResolvedDistance { distance_km: INTRA_PROVINCE_KM, source: DistanceSource::Lookup };
        }

        if let Some(&km) = self.corridors.get(&pair_key(from, to)) {
            return ResolvedDistance { distance_km: km, source: DistanceSource::Lookup };
        }

        let distance_km = match (self.centroids.get(from), self.centroids.get(to)) {
            (Some(a), Some(b)) => (haversine_km(a, b) * ROAD_FACTOR).round() as u32,
            _ => DEFAULT_KM,
        };
        ResolvedDistance { distance_km, source: DistanceSource::Haversine }
    }
}

/// Order-independent corridor key.
fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Great-circle distance in km.
pub fn haversine_km(a: &Centroid, b: &Centroid) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Corridor;
    use std::collections::BTreeMap;

    fn resolver() -> RouteDistanceResolver {
        RouteDistanceResolver::default()
    }

    #[test]
    fn same_province_is_flat_thirty() {
        let d = resolver().resolve("Seoul/Gangnam", "Seoul/Mapo");
        assert_eq!(d, ResolvedDistance { distance_km: 30, source: DistanceSource::Lookup });
        // Even for a province missing from every table
        let d = resolver().resolve("Atlantis/North", "Atlantis/South");
        assert_eq!(d.distance_km, 30);
        assert!(d.source.is_lookup());
    }

    #[test]
    fn corridor_lookup_is_symmetric() {
        let r = resolver();
        let there = r.resolve("Seoul/X", "Busan/Y");
        let back = r.resolve("Busan/Y", "Seoul/X");
        assert_eq!(there.distance_km, 325);
        assert_eq!(there, back);
        assert_eq!(there.source, DistanceSource::Lookup);
    }

    #[test]
    fn haversine_fallback_applies_road_factor() {
        let mut centroids = BTreeMap::new();
        centroids.insert("A".to_string(), Centroid { lat: 0.0, lon: 0.0 });
        centroids.insert("B".to_string(), Centroid { lat: 0.0, lon: 1.0 });
        let r = RouteDistanceResolver::new(&DistanceTable { corridors: Vec::new(), centroids });

        // One degree of longitude on the equator ≈ 111.19 km; × 1.3 ≈ 144.55
        let d = r.resolve("A/x", "B/y");
        assert_eq!(d.source, DistanceSource::Haversine);
        assert_eq!(d.distance_km, 145);
        assert_eq!(r.resolve("B/y", "A/x").distance_km, 145);
    }

    #[test]
    fn centroid_estimate_for_unlisted_pair() {
        // Jeju has no corridor entries
        let d = resolver().resolve("Jeju/Seogwipo", "Seoul/Jongno");
        assert_eq!(d.source, DistanceSource::Haversine);
        assert!(d.distance_km > 500 && d.distance_km < 700, "got {}", d.distance_km);
    }

    #[test]
    fn unknown_provinces_default_to_two_hundred() {
        let d = resolver().resolve("Atlantis/North", "Seoul/Gangnam");
        assert_eq!(d, ResolvedDistance { distance_km: 200, source: DistanceSource::Haversine });
    }

    #[test]
    fn corridor_beats_centroids() {
        let mut table = DistanceTable::default();
        table.corridors.push(Corridor { a: "Jeju".to_string(), b: "Busan".to_string(), km: 999 });
        let r = RouteDistanceResolver::new(&table);
        assert_eq!(r.resolve("Busan/a", "Jeju/b").distance_km, 999);
    }

    #[test]
    fn haversine_of_identical_points_is_zero() {
        let c = Centroid { lat: 37.5, lon: 127.0 };
        assert_eq!(haversine_km(&c, &c), 0.0);
    }
}
