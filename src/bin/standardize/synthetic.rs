// Seeded synthetic market data for offline runs.
// Same seed, same observations: ChaCha8Rng is portable across platforms.

use chrono::{Duration, NaiveDate};
use fph_engine::{MarketObservation, PricingRequest, RouteDistanceResolver};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;

const LOCATIONS: [&str; 10] = [
    "Seoul/Gangnam",
    "Seoul/Mapo",
    "Busan/Haeundae",
    "Busan/Saha",
    "Daegu/Suseong",
    "Incheon/Namdong",
    "Gyeonggi/Suwon",
    "Daejeon/Yuseong",
    "Gwangju/Buk",
    "Ulsan/Nam",
];

/// Dense corridors that get most of the traffic.
const CORE_ROUTES: [(&str, &str, &str); 4] = [
    ("Seoul/Gangnam", "Busan/Haeundae", "11t"),
    ("Gyeonggi/Suwon", "Daegu/Suseong", "5t"),
    ("Incheon/Namdong", "Busan/Saha", "25t"),
    ("Seoul/Mapo", "Daejeon/Yuseong", "1t"),
];

const VEHICLES: [(&str, f64); 4] = [("1t", 900.0), ("5t", 1500.0), ("11t", 2000.0), ("25t", 2800.0)];

const BASE_FARE: f64 = 80_000.0;
const CORE_SHARE: f64 = 0.7;
const OUTLIER_RATE: f64 = 0.03;
const HISTORY_DAYS: i64 = 180;

fn per_km(vehicle: &str) -> f64 {
    VEHICLES
        .iter()
        .find(|(v, _)| *v == vehicle)
        .map(|(_, rate)| *rate)
        .unwrap_or(1500.0)
}

pub struct SyntheticMarket {
    rng: ChaCha8Rng,
    resolver: RouteDistanceResolver,
    start: NaiveDate,
}

impl SyntheticMarket {
    pub fn new(seed: u64, resolver: RouteDistanceResolver) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            resolver,
            start: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap_or(NaiveDate::MIN),
        }
    }

    fn pick_route(&mut self) -> (String, String, String) {
        if self.rng.gen_bool(CORE_SHARE) {
            let (o, d, v) = CORE_ROUTES[self.rng.gen_range(0..CORE_ROUTES.len())];
            return (o.to_string(), d.to_string(), v.to_string());
        }
        let o = self.rng.gen_range(0..LOCATIONS.len());
        let mut d = self.rng.gen_range(0..LOCATIONS.len());
        if d == o {
            d = (d + 1) % LOCATIONS.len();
        }
        let (v, _) = VEHICLES[self.rng.gen_range(0..VEHICLES.len())];
        (LOCATIONS[o].to_string(), LOCATIONS[d].to_string(), v.to_string())
    }

    pub fn observation(&mut self) -> MarketObservation {
        let (origin, destination, vehicle_type) = self.pick_route();
        let km = self.resolver.resolve(&origin, &destination).distance_km as f64;

        let mut price = (BASE_FARE + km * per_km(&vehicle_type)) * self.rng.gen_range(0.9..1.1);
        if self.rng.gen_bool(OUTLIER_RATE) {
            price *= self.rng.gen_range(2.0..3.0);
        }

        MarketObservation {
            date: self.start + Duration::days(self.rng.gen_range(0..HISTORY_DAYS)),
            origin,
            destination,
            vehicle_type,
            freight_type: "General".to_string(),
            unit_price: (price / 1000.0).round() * 1000.0,
        }
    }

    pub fn observations(&mut self, n: usize) -> Vec<MarketObservation> {
        (0..n).map(|_| self.observation()).collect()
    }
}

/// One request per distinct observed route, in key order.
pub fn requests_for(observations: &[MarketObservation]) -> Vec<PricingRequest> {
    observations
        .iter()
        .map(|o| (o.origin.as_str(), o.destination.as_str(), o.vehicle_type.as_str()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|(o, d, v)| PricingRequest::new(o, d, v))
        .collect()
}
