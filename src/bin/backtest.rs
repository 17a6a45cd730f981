use anyhow::{Context, Result};
use clap::Parser;
use midas::backtest::{BacktestRunner, MarketScenario, RunReport};
use midas::config::load_config;
use midas::engine::SimulationEngine;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "backtest", about = "Run every synthetic scenario through the engine")]
struct Args {
    #[arg(long, default_value = "config/midas.toml")]
    config: PathBuf,

    /// Configured instrument whose swing baseline classifies volatility
    #[arg(long, default_value = "SHIB-USD")]
    instrument: String,

    #[arg(long, default_value_t = 500)]
    bars: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("midas=info")
        .init();

    let args = Args::parse();
    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    println!("\n╔═══════════════════════════════════════════════════════╗");
    println!("║            MIDAS BACKTESTING SUITE                    ║");
    println!("╚═══════════════════════════════════════════════════════╝");

    let engine = SimulationEngine::new(Arc::new(config.engine.clone()), Arc::new(config.regime_table()?));
    let runner = BacktestRunner::new(engine, config.expected_swing(&args.instrument)?);

    let scenarios = [
        (MarketScenario::Uptrend, "📈 Uptrend (+2% daily)"),
        (MarketScenario::Downtrend, "📉 Downtrend (-2% daily)"),
        (MarketScenario::Sideways, "↔️  Sideways (mean-reverting)"),
        (MarketScenario::Volatile, "⚡ Volatile (±5% swings)"),
        (MarketScenario::Crash, "💥 Crash (45% drop)"),
    ];

    let mut results = Vec::new();
    for (scenario, name) in scenarios {
        println!("\n{}", name);
        match runner.run_and_report(scenario, args.bars, args.seed) {
            Ok(report) => results.push((name, report)),
            Err(e) => eprintln!("❌ Backtest failed for {}: {}", name, e),
        }
    }

    print_summary_comparison(&results);
    Ok(())
}

fn print_summary_comparison(results: &[(&str, RunReport)]) {
    println!("\n╔═══════════════════════════════════════════════════════╗");
    println!("║              SCENARIO COMPARISON                      ║");
    println!("╚═══════════════════════════════════════════════════════╝\n");

    println!(
        "{:<30} {:>12} {:>9} {:>6} {:>6} {:>8} {:>7}",
        "Scenario", "Capital", "Return%", "Buys", "Stops", "Safety", "Minted"
    );
    println!("{}", "─".repeat(84));

    for (name, report) in results {
        println!(
            "{:<30} {:>12.2} {:>9.2} {:>6} {:>6} {:>8.2} {:>7}",
            name,
            report.final_capital,
            report.capital_return_pct,
            report.buys,
            report.stop_sells,
            report.safety_fund,
            report.minted
        );
    }

    println!();
}
