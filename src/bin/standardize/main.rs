// Route Standardization Runner
// Imports cost/market rows, prices a batch of routes, persists route
// standards and writes a JSON report.
//
// Usage:
//   cargo run --release --bin standardize -- --synthetic 2000 --seed 42
//   cargo run --release --bin standardize -- --store store.json --market-rows market.json
//   cargo run --release --bin standardize -- --requests requests.json --config pricing.json
//
// Logging: RUST_LOG=fph_engine=debug for per-route analyzer and tier output.

mod report;
mod synthetic;

use fph_engine::{
    import_cost_rows, import_market_rows, BatchRunner, ConfigError, InMemoryStore, MarketDataSource,
    PricingConfig, PricingEngine, PricingRequest, RawRow, StoreError,
};
use report::*;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use synthetic::{requests_for, SyntheticMarket};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// ─── Errors ─────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0} expects a value")]
    MissingValue(String),

    #[error("invalid value `{value}` for {flag}")]
    InvalidValue { flag: String, value: String },

    #[error("unknown argument `{0}`")]
    UnknownArgument(String),

    #[error("{path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("{path}: {source}")]
    Json { path: PathBuf, source: serde_json::Error },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ─── CLI Parsing ────────────────────────────────────────────────────────────

struct CliArgs {
    store: Option<PathBuf>,
    market_rows: Option<PathBuf>,
    cost_rows: Option<PathBuf>,
    requests: Option<PathBuf>,
    config: Option<PathBuf>,
    synthetic: usize,
    seed: u64,
    out: PathBuf,
}

fn parse_args() -> Result<CliArgs, CliError> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut cli = CliArgs {
        store: None,
        market_rows: None,
        cost_rows: None,
        requests: None,
        config: None,
        synthetic: 0,
        seed: 0,
        out: PathBuf::from("pricing-results"),
    };

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        let mut value = || -> Result<String, CliError> {
            i += 1;
            args.get(i).cloned().ok_or_else(|| CliError::MissingValue(flag.to_string()))
        };
        match flag {
            "--store" => cli.store = Some(PathBuf::from(value()?)),
            "--market-rows" => cli.market_rows = Some(PathBuf::from(value()?)),
            "--cost-rows" => cli.cost_rows = Some(PathBuf::from(value()?)),
            "--requests" => cli.requests = Some(PathBuf::from(value()?)),
            "--config" => cli.config = Some(PathBuf::from(value()?)),
            "--out" => cli.out = PathBuf::from(value()?),
            "--synthetic" => cli.synthetic = parse_number(flag, value()?)?,
            "--seed" => cli.seed = parse_number(flag, value()?)?,
            _ => return Err(CliError::UnknownArgument(flag.to_string())),
        }
        i += 1;
    }

    Ok(cli)
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: String) -> Result<T, CliError> {
    value
        .parse()
        .map_err(|_| CliError::InvalidValue { flag: flag.to_string(), value })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| CliError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_str(&text).map_err(|source| CliError::Json { path: path.to_path_buf(), source })
}

// ─── Run ────────────────────────────────────────────────────────────────────

fn run(cli: CliArgs) -> Result<usize, CliError> {
    let (config, config_source) = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|source| CliError::Io { path: path.clone(), source })?;
            (PricingConfig::from_json(&text)?, path.display().to_string())
        }
        None => (PricingConfig::default(), "defaults".to_string()),
    };
    let engine = PricingEngine::new(config)?;

    let mut store = match &cli.store {
        Some(path) if path.exists() => InMemoryStore::load(path)?,
        _ => InMemoryStore::seeded(),
    };

    let mut imports = ImportSection::default();

    if let Some(path) = &cli.cost_rows {
        let report = import_cost_rows(&read_json::<Vec<RawRow>>(path)?);
        for var in report.records.iter().cloned() {
            store.upsert_cost_variable(var);
        }
        imports.cost_rows = Some(report.summary());
    }

    if let Some(path) = &cli.market_rows {
        let report = import_market_rows(&read_json::<Vec<RawRow>>(path)?);
        imports.market_rows = Some(report.summary());
        store.add_observations(report.records);
    }

    if cli.synthetic > 0 {
        let observations = SyntheticMarket::new(cli.seed, engine.resolver().clone()).observations(cli.synthetic);
        info!(count = observations.len(), seed = cli.seed, "synthetic observations generated");
        imports.synthetic_observations = observations.len();
        store.add_observations(observations);
    }

    let observations = store.observations()?;
    let requests: Vec<PricingRequest> = match &cli.requests {
        Some(path) => read_json(path)?,
        None => requests_for(&observations),
    };
    let route_medians = engine.analyzer().analyze(&observations).len();

    println!("\n  Route Standardization Runner v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "  Config: {} | Observations: {} | Route medians: {} | Requests: {}\n",
        config_source,
        observations.len(),
        route_medians,
        requests.len()
    );

    let runner = BatchRunner::new(engine);
    let batch = runner.run_and_persist(&requests, &mut store);
    let summary = batch.summary();
    let routes: Vec<RouteLine> = batch.results.iter().map(RouteLine::from).collect();

    print_routes(&routes);
    println!(
        "  Total: {}  Priced: {}  Failed: {}  Not persisted: {}\n",
        summary.total, summary.succeeded, summary.failed, summary.persist_failed
    );
    for message in &summary.messages {
        println!("    {message}");
    }

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
        .to_string();
    let failed = summary.failed;

    let report = RunReport {
        timestamp,
        version: env!("CARGO_PKG_VERSION"),
        seed: cli.seed,
        config_source,
        observations: observations.len(),
        route_medians,
        imports,
        summary,
        routes,
        batch,
    };

    let path = report
        .write(&cli.out)
        .map_err(|source| CliError::Io { path: cli.out.clone(), source })?;
    println!("  Results saved to: {}", path.display());

    let store_path = cli.store.clone().unwrap_or_else(|| cli.out.join("store.json"));
    store.save(&store_path)?;
    println!("  Store snapshot: {}\n", store_path.display());

    Ok(failed)
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let outcome = parse_args().and_then(run);
    match outcome {
        Ok(0) => {}
        Ok(failed) => {
            error!(failed, "some requests could not be priced");
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "standardization run failed");
            std::process::exit(2);
        }
    }
}
