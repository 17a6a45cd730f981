use anyhow::{Context, Result};
use clap::Parser;
use midas::api::{BinanceKlineClient, MarketDataProvider, SyntheticProvider};
use midas::backtest::{MarketScenario, RunReport};
use midas::config::{load_config, GatewayMode, MidasConfig};
use midas::discovery::{LargestGainSelector, MarketSnapshot};
use midas::engine::{RunInput, SimulationEngine, SimulationReport};
use midas::execution::{BinanceGateway, Credentials, ExchangeGateway, PaperGateway};
use midas::models::Bar;
use midas::strategy::{annotate, project_schedule, ScheduledBuy, SignalConfig};
use midas::{ConfigError, GatewayError, MidasError};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "midas", about = "Signal-driven trade-state simulation over historical closes")]
struct Args {
    /// Config file (TOML); MIDAS__* environment variables override it
    #[arg(long, default_value = "config/midas.toml")]
    config: PathBuf,

    /// Instruments to trade; defaults to every configured instrument
    #[arg(long = "instrument")]
    instruments: Vec<String>,

    /// Use a seeded synthetic scenario instead of exchange data
    #[arg(long, value_parser = parse_scenario)]
    synthetic: Option<MarketScenario>,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Submit real orders through the exchange gateway
    #[arg(long)]
    live: bool,

    /// Write reports, ledgers and schedules as JSON
    #[arg(long)]
    output: Option<PathBuf>,
}

fn parse_scenario(s: &str) -> std::result::Result<MarketScenario, String> {
    MarketScenario::ALL
        .into_iter()
        .find(|scenario| scenario.as_str() == s)
        .ok_or_else(|| {
            let names: Vec<&str> = MarketScenario::ALL.iter().map(|s| s.as_str()).collect();
            format!("unknown scenario {} (expected one of {})", s, names.join(", "))
        })
}

/// One primary instrument with its swing baseline, resolved before any run starts
#[derive(Debug, Clone, PartialEq)]
struct PlannedRun {
    symbol: String,
    expected_swing: Decimal,
}

/// Fail on the first instrument without a swing baseline
fn resolve_runs(config: &MidasConfig, primaries: &[String]) -> Result<Vec<PlannedRun>, ConfigError> {
    primaries
        .iter()
        .map(|symbol| {
            Ok(PlannedRun {
                symbol: symbol.clone(),
                expected_swing: config.expected_swing(symbol)?,
            })
        })
        .collect()
}

/// Order sink for every run; live credentials are read once up front
#[derive(Debug, Clone)]
enum GatewayPlan {
    Paper,
    Live { base_url: String, credentials: Credentials },
}

impl GatewayPlan {
    fn resolve(mode: GatewayMode, base_url: &str) -> Result<Self, GatewayError> {
        match mode {
            GatewayMode::Paper => Ok(Self::Paper),
            GatewayMode::Live => Ok(Self::Live {
                base_url: base_url.to_string(),
                credentials: Credentials::from_env()?,
            }),
        }
    }

    /// Builds the blocking HTTP client, so call it off the async runtime
    fn build(&self) -> Result<Box<dyn ExchangeGateway>, GatewayError> {
        match self {
            Self::Paper => Ok(Box::new(PaperGateway::new())),
            Self::Live { base_url, credentials } => {
                Ok(Box::new(BinanceGateway::new(base_url.as_str(), credentials.clone())?))
            }
        }
    }
}

#[derive(Serialize)]
struct InstrumentOutput<'a> {
    report: RunReport,
    schedule: &'a [ScheduledBuy],
    ledger: &'a midas::Ledger,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let args = Args::parse();
    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let primaries = if args.instruments.is_empty() {
        config.symbols()
    } else {
        args.instruments.clone()
    };

    // Every config error surfaces here, before data is fetched or an order is sent
    let planned = resolve_runs(&config, &primaries)?;
    let regimes = Arc::new(config.regime_table()?);
    let mode = if args.live { GatewayMode::Live } else { config.gateway.mode };
    let gateway = GatewayPlan::resolve(mode, &config.gateway.base_url)?;
    if mode == GatewayMode::Live {
        tracing::warn!("LIVE mode: orders will be sent to {}", config.gateway.base_url);
    }

    tracing::info!("🚀 Midas starting: {} instrument(s)", planned.len());

    // Tracked instruments double as reallocation targets
    let mut tracked = config.symbols();
    for symbol in &primaries {
        if !tracked.contains(symbol) {
            tracked.push(symbol.clone());
        }
    }

    let raw = match args.synthetic {
        Some(scenario) => {
            tracing::info!("Using synthetic {} data (seed {})", scenario.as_str(), args.seed);
            fetch_all(&SyntheticProvider::new(scenario, args.seed), &tracked, &config).await
        }
        None => {
            let client = BinanceKlineClient::from_config(&config.market_data)?;
            fetch_all(&client, &tracked, &config).await
        }
    };

    let signal_config = SignalConfig::from_engine(&config.engine);
    let mut snapshot = MarketSnapshot::new();
    let mut schedules = BTreeMap::new();
    for (symbol, mut bars) in raw {
        let thresholds = annotate(&mut bars, &signal_config);
        schedules.insert(
            symbol.clone(),
            project_schedule(&bars, &thresholds, config.engine.cycle_hours),
        );
        snapshot.insert(symbol, bars);
    }
    tracing::info!("Tracking {} instrument(s) for reallocation", snapshot.len());
    let snapshot = Arc::new(snapshot);

    let engine = SimulationEngine::new(Arc::new(config.engine.clone()), regimes);

    let mut handles = Vec::with_capacity(planned.len());
    for run in planned {
        let engine = engine.clone();
        let snapshot = Arc::clone(&snapshot);
        let gateway = gateway.clone();

        handles.push(tokio::task::spawn_blocking(move || {
            run_instrument(&engine, &run, &snapshot, &gateway)
        }));
    }

    let mut reports = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await.context("simulation task panicked")? {
            Ok(report) => reports.push(report),
            Err(e @ MidasError::Config(_)) => return Err(e.into()),
            Err(e) => tracing::error!("Run failed: {}", e),
        }
    }

    let empty = Vec::new();
    let mut outputs = Vec::with_capacity(reports.len());
    for simulation in &reports {
        let report = RunReport::from_simulation(simulation);
        report.print_report();

        let schedule = schedules.get(&simulation.instrument).unwrap_or(&empty);
        print_schedule(&simulation.instrument, schedule);

        outputs.push(InstrumentOutput {
            report,
            schedule,
            ledger: &simulation.ledger,
        });
    }

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&outputs).context("Failed to serialize output")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Wrote {} run(s) to {}", outputs.len(), path.display());
    }

    Ok(())
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("midas=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn fetch_all<P: MarketDataProvider>(
    provider: &P,
    symbols: &[String],
    config: &MidasConfig,
) -> BTreeMap<String, Vec<Bar>> {
    let mut out = BTreeMap::new();
    for symbol in symbols {
        let bars = provider
            .fetch_series(symbol, config.market_data.period_days, &config.market_data.interval)
            .await;
        if bars.is_empty() {
            tracing::warn!("No data for {}", symbol);
        } else {
            tracing::info!("Fetched {} bars for {}", bars.len(), symbol);
        }
        out.insert(symbol.clone(), bars);
    }
    out
}

/// One instrument's run on a blocking thread
fn run_instrument(
    engine: &SimulationEngine,
    run: &PlannedRun,
    snapshot: &MarketSnapshot,
    gateway: &GatewayPlan,
) -> std::result::Result<SimulationReport, MidasError> {
    let gateway = gateway.build()?;
    let bars = snapshot.series(&run.symbol).unwrap_or(&[]);

    let report = engine.run(
        RunInput {
            instrument: &run.symbol,
            bars,
            expected_swing: run.expected_swing,
            snapshot: Some(snapshot),
        },
        &LargestGainSelector::default(),
        gateway.as_ref(),
    )?;

    Ok(report)
}

fn print_schedule(symbol: &str, schedule: &[ScheduledBuy]) {
    if schedule.is_empty() {
        println!("🗓️  {}: no buy threshold dips often enough to schedule\n", symbol);
        return;
    }

    println!("🗓️  {} BUY SCHEDULE", symbol);
    for entry in schedule {
        println!(
            "  {}  threshold {:.4}%  est. price ${:.8}",
            entry.at.format("%Y-%m-%d %H:%M"),
            entry.threshold * Decimal::ONE_HUNDRED,
            entry.estimated_price
        );
    }
    println!();
}
