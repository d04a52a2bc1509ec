#![cfg(target_arch = "wasm32")]

use fph_engine::{Krw, PricingRequest, PricingResult, PricingSession, RouteStandard};
use rust_decimal_macros::dec;
use serde::Serialize;
use serde_json::{json, Value};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

fn js<T: Serialize>(value: &T) -> JsValue {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .expect("serializable")
}

fn seoul_busan() -> JsValue {
    js(&PricingRequest::new("Seoul/Gangnam", "Busan/Haeundae", "11t").with_freight("General"))
}

#[wasm_bindgen_test]
fn session_prices_and_persists() {
    let mut session = PricingSession::new();
    let result: PricingResult =
        serde_wasm_bindgen::from_value(session.calculate(seoul_busan()).expect("priced")).expect("decodes");
    assert_eq!(result.tier1.subtotal, Krw(dec!(393546)));
    assert_eq!(result.summary.final_price, Krw(dec!(433000)));

    let standards: Vec<RouteStandard> =
        serde_wasm_bindgen::from_value(session.route_standards()).expect("decodes");
    assert_eq!(standards.len(), 1);
    assert_eq!(standards[0].final_price, Krw(dec!(433000)));
}

#[wasm_bindgen_test]
fn ui_shaped_request_is_accepted() {
    let mut session = PricingSession::new();
    let request = json!({
        "origin": "Seoul/Gangnam",
        "destination": "Busan/Haeundae",
        "vehicleType": "11t",
        "freightType": "General",
        "manualAdjustmentRate": 0
    });
    let result: Value =
        serde_wasm_bindgen::from_value(session.calculate(js(&request)).expect("priced")).expect("decodes");
    assert_eq!(result["route"]["vehicleType"], "11t");
    assert_eq!(result["tier2"]["hasMarketData"], false);
    assert_eq!(result["summary"]["finalPrice"].as_f64(), Some(433000.0));
    assert_eq!(result["summary"]["confidenceScore"].as_f64(), Some(0.51));
    assert_eq!(result["summary"]["dataSources"][0], "CostMaster");

    let batch = json!([{"origin": "Daegu/Suseong", "destination": "Seoul/Mapo", "vehicleType": "5t"}]);
    let response: Value =
        serde_wasm_bindgen::from_value(session.run_batch(js(&batch)).expect("ran")).expect("decodes");
    assert_eq!(response["summary"]["succeeded"].as_f64(), Some(1.0));
    assert_eq!(response["summary"]["persistFailed"].as_f64(), Some(0.0));
}

#[wasm_bindgen_test]
fn analyze_reports_fallback_flags() {
    let mut session = PricingSession::new();
    let rows = json!([
        {"date": "2026-01-02", "origin": "Seoul/Gangnam", "destination": "Busan/Haeundae", "vehicle": "11t", "price": 450000},
        {"date": "2026-01-03", "origin": "Seoul/Mapo", "destination": "Busan/Saha", "vehicle": "11t", "price": 470000}
    ]);
    session.load_market_rows(js(&rows)).expect("imported");
    let results: Value = serde_wasm_bindgen::from_value(session.analyze().expect("analyzed")).expect("decodes");
    assert_eq!(results[0]["origin"], "Seoul");
    assert_eq!(results[0]["isFallback"], true);
    assert_eq!(results[0]["fallbackLevel"], "province");
    assert_eq!(results[0]["sampleSize"].as_f64(), Some(2.0));
}

#[wasm_bindgen_test]
fn market_rows_import_with_summary() {
    let mut session = PricingSession::new();
    let rows = json!([
        {"date": "2026-01-02", "origin": "Seoul/Gangnam", "destination": "Busan/Haeundae", "vehicle": "11t", "price": 450000},
        {"date": "2026-01-03", "origin": "Seoul/Gangnam", "destination": "Busan/Haeundae", "vehicle": "11t", "price": "n/a"}
    ]);
    let summary: Value =
        serde_wasm_bindgen::from_value(session.load_market_rows(js(&rows)).expect("imported")).expect("decodes");
    assert_eq!(summary["imported"], 1);
    assert_eq!(summary["rejected"], 1);
    assert_eq!(session.observation_count(), 1);
}

#[wasm_bindgen_test]
fn batch_reports_failures_per_index() {
    let mut session = PricingSession::new();
    let requests = vec![
        PricingRequest::new("Seoul/Gangnam", "Busan/Haeundae", "11t"),
        PricingRequest::new("Seoul/Gangnam", "Busan/Haeundae", ""),
    ];
    let response: Value =
        serde_wasm_bindgen::from_value(session.run_batch(js(&requests)).expect("ran")).expect("decodes");
    assert_eq!(response["summary"]["succeeded"], 1);
    assert_eq!(response["summary"]["failed"], 1);
    assert_eq!(response["errors"][0]["index"], 1);
}

#[wasm_bindgen_test]
fn invalid_config_is_rejected() {
    assert!(PricingSession::with_config("{ not json").is_err());
    assert!(PricingSession::with_config(r#"{"analyzer": {"min_sample_size": 0}}"#).is_err());
    assert!(PricingSession::with_config("{}").is_ok());
}
