use crate::backtest::metrics::RunReport;
use crate::backtest::synthetic::{MarketScenario, SyntheticDataGenerator};
use crate::discovery::{LargestGainSelector, MarketSnapshot};
use crate::engine::{RunInput, SimulationEngine, SimulationReport};
use crate::error::ConfigError;
use crate::execution::PaperGateway;
use crate::models::Bar;
use crate::strategy::{annotate, SignalConfig};
use rust_decimal::Decimal;

/// Alternate instruments tracked for reallocation in synthetic runs
const ALT_INSTRUMENTS: [(&str, MarketScenario); 2] = [
    ("DOGE-USD", MarketScenario::Uptrend),
    ("PEPE-USD", MarketScenario::Volatile),
];

/// Runs seeded synthetic scenarios through the engine against a paper gateway
pub struct BacktestRunner {
    engine: SimulationEngine,
    signals: SignalConfig,
    expected_swing: Decimal,
    interval_minutes: i64,
}

impl BacktestRunner {
    pub fn new(engine: SimulationEngine, expected_swing: Decimal) -> Self {
        let signals = SignalConfig::from_engine(engine.config());
        Self {
            engine,
            signals,
            expected_swing,
            interval_minutes: 60,
        }
    }

    /// Primary series for a scenario, annotated with signals and volatility
    pub fn primary_series(&self, scenario: MarketScenario, num_bars: usize, seed: u64) -> Vec<Bar> {
        let mut bars = SyntheticDataGenerator::new(seed).generate(scenario, num_bars, self.interval_minutes);
        annotate(&mut bars, &self.signals);
        bars
    }

    /// Tracked alternates; series are slightly shorter than the primary to exercise clamping
    pub fn snapshot(&self, num_bars: usize, seed: u64) -> MarketSnapshot {
        ALT_INSTRUMENTS
            .iter()
            .enumerate()
            .map(|(i, (ticker, scenario))| {
                let bars = SyntheticDataGenerator::new(seed.wrapping_add(i as u64 + 1)).generate(
                    *scenario,
                    num_bars.saturating_sub(10),
                    self.interval_minutes,
                );
                (ticker.to_string(), bars)
            })
            .collect()
    }

    pub fn run(
        &self,
        scenario: MarketScenario,
        num_bars: usize,
        seed: u64,
    ) -> Result<SimulationReport, ConfigError> {
        let bars = self.primary_series(scenario, num_bars, seed);
        let snapshot = self.snapshot(num_bars, seed);

        tracing::info!(
            "Starting backtest: {} scenario, {} bars, seed {}",
            scenario.as_str(),
            bars.len(),
            seed
        );

        self.engine.run(
            RunInput {
                instrument: "SHIB-USD",
                bars: &bars,
                expected_swing: self.expected_swing,
                snapshot: Some(&snapshot),
            },
            &LargestGainSelector::default(),
            &PaperGateway::new(),
        )
    }

    /// Run and print the report
    pub fn run_and_report(
        &self,
        scenario: MarketScenario,
        num_bars: usize,
        seed: u64,
    ) -> Result<RunReport, ConfigError> {
        let simulation = self.run(scenario, num_bars, seed)?;
        let report = RunReport::from_simulation(&simulation);
        report.print_report();
        Ok(report)
    }
}
