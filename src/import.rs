// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Loosely-typed row import.
//!
//! Rows arrive as JSON objects (a parsed CSV line or a spreadsheet record).
//! Header keys are matched after lowercasing and dropping every
//! non-alphanumeric character, so `Unit Price`, `unit_price` and `unitPrice`
//! all hit the same column. Bad rows become [`RowError`]s; good rows import.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::batch::MAX_DIAGNOSTICS;
use crate::types::{default_freight_type, CostCategory, CostVariable, MarketObservation};

pub type RawRow = serde_json::Map<String, Value>;

const DATE: &[&str] = &["date"];
const ORIGIN: &[&str] = &["origin", "departure"];
const DESTINATION: &[&str] = &["destination", "arrival"];
const VEHICLE_TYPE: &[&str] = &["vehicletype", "vehicle", "tontype"];
const FREIGHT_TYPE: &[&str] = &["freighttype", "freight", "cargotype"];
const UNIT_PRICE: &[&str] = &["unitprice", "price", "amount", "fare"];

const CATEGORY: &[&str] = &["category", "type"];
const ITEM: &[&str] = &["item", "name", "key"];
const VALUE: &[&str] = &["value", "amount"];
const UNIT: &[&str] = &["unit"];
const DESCRIPTION: &[&str] = &["description", "desc", "note"];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y%m%d"];

/// A rejected row. `row` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("row {row}: {message}")]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport<T> {
    pub records: Vec<T>,
    pub errors: Vec<RowError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub imported: usize,
    pub rejected: usize,
    pub messages: Vec<String>,
}

impl<T> ImportReport<T> {
    pub fn summary(&self) -> ImportSummary {
        ImportSummary {
            imported: self.records.len(),
            rejected: self.errors.len(),
            messages: self.errors.iter().take(MAX_DIAGNOSTICS).map(ToString::to_string).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Cell access
// ---------------------------------------------------------------------------

fn normalize_header(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// A row with normalized header keys. The first key to normalize to a
/// given name wins.
struct Cells<'a>(HashMap<String, &'a Value>);

impl<'a> Cells<'a> {
    fn new(row: &'a RawRow) -> Self {
        let mut cells = HashMap::with_capacity(row.len());
        for (key, value) in row {
            cells.entry(normalize_header(key)).or_insert(value);
        }
        Self(cells)
    }

    fn get(&self, aliases: &[&str]) -> Option<&'a Value> {
        aliases.iter().find_map(|a| self.0.get(*a).copied())
    }

    /// Trimmed text; numbers are rendered, empty and null are `None`.
    fn text(&self, aliases: &[&str]) -> Option<String> {
        let text = match self.get(aliases)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    }

    fn number_text(&self, aliases: &[&str]) -> Option<String> {
        let text = self.text(aliases)?;
        Some(text.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect())
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY.MM.DD`, `YYYYMMDD`, or an ISO
/// date-time whose date part is one of those.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.split(['T', ' ']).next().unwrap_or(raw);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

// ---------------------------------------------------------------------------
// Market rows
// ---------------------------------------------------------------------------

fn market_row(cells: &Cells<'_>) -> Result<MarketObservation, String> {
    let date_text = cells.text(DATE).ok_or("date is missing")?;
    let date = parse_date(&date_text).ok_or_else(|| format!("unparseable date `{date_text}`"))?;
    let origin = cells.text(ORIGIN).ok_or("origin is empty")?;
    let destination = cells.text(DESTINATION).ok_or("destination is empty")?;
    let vehicle_type = cells.text(VEHICLE_TYPE).ok_or("vehicle type is empty")?;
    let freight_type = cells.text(FREIGHT_TYPE).unwrap_or_else(default_freight_type);

    let price_text = cells.number_text(UNIT_PRICE).ok_or("unit price is missing")?;
    let unit_price = price_text
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .ok_or_else(|| format!("unit price `{price_text}` is not numeric"))?;
    if unit_price <= 0.0 {
        return Err(format!("unit price must be positive, got {unit_price}"));
    }

    Ok(MarketObservation { date, origin, destination, vehicle_type, freight_type, unit_price })
}

pub fn import_market_rows(rows: &[RawRow]) -> ImportReport<MarketObservation> {
    let report = import_with(rows, market_row);
    info!(imported = report.records.len(), rejected = report.errors.len(), "market rows imported");
    report
}

// ---------------------------------------------------------------------------
// Cost rows
// ---------------------------------------------------------------------------

fn cost_row(cells: &Cells<'_>) -> Result<CostVariable, String> {
    let category_text = cells.text(CATEGORY).unwrap_or_default();
    let category = CostCategory::parse(&category_text).ok_or_else(|| {
        format!("category `{category_text}` is not one of Variable, Fixed, Policy, Risk")
    })?;
    let item = cells.text(ITEM).ok_or("item is empty")?;
    let value_text = cells.number_text(VALUE).ok_or("value is missing")?;
    let value = parse_decimal(&value_text).ok_or_else(|| format!("value `{value_text}` is not numeric"))?;
    let unit = cells.text(UNIT).ok_or("unit is empty")?;
    let description = cells.text(DESCRIPTION).unwrap_or_default();

    Ok(CostVariable { category, item, value, unit, description })
}

pub fn import_cost_rows(rows: &[RawRow]) -> ImportReport<CostVariable> {
    let report = import_with(rows, cost_row);
    info!(imported = report.records.len(), rejected = report.errors.len(), "cost rows imported");
    report
}

fn import_with<T, F>(rows: &[RawRow], parse: F) -> ImportReport<T>
where
    F: Fn(&Cells<'_>) -> Result<T, String>,
{
    let mut report = ImportReport { records: Vec::new(), errors: Vec::new() };
    for (i, row) in rows.iter().enumerate() {
        match parse(&Cells::new(row)) {
            Ok(record) => report.records.push(record),
            Err(message) => report.errors.push(RowError { row: i + 1, message }),
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn rows(value: Value) -> Vec<RawRow> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|v| match v {
                    Value::Object(map) => map,
                    other => panic!("test: expected object, got {other}"),
                })
                .collect(),
            other => panic!("test: expected array, got {other}"),
        }
    }

    #[test]
    fn header_aliases_normalize() {
        assert_eq!(normalize_header("Unit Price"), "unitprice");
        assert_eq!(normalize_header("vehicle_type"), "vehicletype");
        assert_eq!(normalize_header("Ton-Type"), "tontype");
    }

    #[test]
    fn date_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 3, 7);
        for raw in ["2026-03-07", "2026/03/07", "2026.03.07", "20260307", "2026-03-07T09:30:00Z", "2026-03-07 09:30"] {
            assert_eq!(parse_date(raw), expected, "{raw}");
        }
        assert_eq!(parse_date("07/03/2026"), None);
        assert_eq!(parse_date("2026-02-30"), None);
    }

    #[test]
    fn market_rows_with_aliases_import() {
        let report = import_market_rows(&rows(json!([
            {"Date": "2026-01-05", "Departure": "Seoul/Gangnam", "Arrival": "Busan/Haeundae",
             "Ton Type": "11t", "Cargo Type": "Frozen", "Fare": "412,000"},
            {"date": 20260106, "origin": "Seoul/Gangnam", "destination": "Busan/Haeundae",
             "vehicle": "11t", "unit_price": 415000}
        ])));
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].unit_price, 412000.0);
        assert_eq!(report.records[0].freight_type, "Frozen");
        assert_eq!(report.records[1].freight_type, "General");
        assert_eq!(report.records[1].date, NaiveDate::from_ymd_opt(2026, 1, 6).expect("test: date"));
    }

    #[test]
    fn invalid_market_rows_are_reported_by_row() {
        let report = import_market_rows(&rows(json!([
            {"date": "yesterday", "origin": "Seoul/A", "destination": "Busan/B", "vehicle": "5t", "price": 1},
            {"date": "2026-01-05", "origin": "", "destination": "Busan/B", "vehicle": "5t", "price": 1},
            {"date": "2026-01-05", "origin": "Seoul/A", "destination": "Busan/B", "vehicle": " ", "price": 1},
            {"date": "2026-01-05", "origin": "Seoul/A", "destination": "Busan/B", "vehicle": "5t", "price": "abc"},
            {"date": "2026-01-05", "origin": "Seoul/A", "destination": "Busan/B", "vehicle": "5t", "price": 0},
            {"date": "2026-01-05", "origin": "Seoul/A", "destination": "Busan/B", "vehicle": "5t", "price": -10},
            {"date": "2026-01-05", "origin": "Seoul/A", "destination": "Busan/B", "vehicle": "5t", "price": 300000}
        ])));
        assert_eq!(report.records.len(), 1);
        let rejected: Vec<usize> = report.errors.iter().map(|e| e.row).collect();
        assert_eq!(rejected, vec![1, 2, 3, 4, 5, 6]);
        assert!(report.errors[0].message.contains("date"));
        assert!(report.errors[3].message.contains("not numeric"));
        assert_eq!(report.errors[1].to_string(), "row 2: origin is empty");
    }

    #[test]
    fn cost_rows_import_and_validate() {
        let report = import_cost_rows(&rows(json!([
            {"Category": "variable", "Item": "fuel_price", "Value": "1,700", "Unit": "KRW/L", "Note": "Q1 diesel"},
            {"type": "Policy", "key": "company_margin_rate", "amount": 0.12, "unit": "ratio"},
            {"category": "Overhead", "item": "rent", "value": 1, "unit": "KRW"},
            {"category": "Fixed", "item": "", "value": 1, "unit": "KRW"},
            {"category": "Fixed", "item": "fixed_cost", "value": "lots", "unit": "KRW"},
            {"category": "Fixed", "item": "fixed_cost", "value": 160000}
        ])));
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].category, CostCategory::Variable);
        assert_eq!(report.records[0].value, dec!(1700));
        assert_eq!(report.records[0].description, "Q1 diesel");
        assert_eq!(report.records[1].value, dec!(0.12));
        assert_eq!(report.records[1].description, "");
        let rejected: Vec<usize> = report.errors.iter().map(|e| e.row).collect();
        assert_eq!(rejected, vec![3, 4, 5, 6]);
        assert!(report.errors[0].message.contains("Overhead"));
    }

    #[test]
    fn summary_counts_and_caps() {
        let bad: Vec<RawRow> = (0..25).map(|_| RawRow::new()).collect();
        let summary = import_market_rows(&bad).summary();
        assert_eq!(summary.imported, 0);
        assert_eq!(summary.rejected, 25);
        assert_eq!(summary.messages.len(), MAX_DIAGNOSTICS);
        assert_eq!(summary.messages[0], "row 1: date is missing");
    }
}
