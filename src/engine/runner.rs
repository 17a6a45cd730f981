use super::ledger::{Ledger, LedgerRow, ReallocSignal};
use super::primary::{DecisionBar, ExecutionBar, ExitKind, PrimaryExit, PrimaryMachine, Sizing};
use super::profit::{ProfitPolicy, ProfitSource, Treasury};
use super::reallocation::{price_change, EntryContext, ReallocationMachine};
use crate::config::EngineConfig;
use crate::discovery::{MarketSnapshot, TopRiserSelector};
use crate::error::ConfigError;
use crate::execution::{dispatch_orders, ExchangeGateway, OrderRequest};
use crate::models::{Bar, OrderSide};
use crate::regime::{RegimeKey, RegimeTable, VolatilityBucket};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

/// One instrument's input to a run
#[derive(Debug, Clone, Copy)]
pub struct RunInput<'a> {
    pub instrument: &'a str,
    pub bars: &'a [Bar],
    /// Expected per-bar swing used to classify the volatility regime
    pub expected_swing: Decimal,
    /// Tracked instruments for reallocation; None disables the sub-engine
    pub snapshot: Option<&'a MarketSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TradeStats {
    pub buys: usize,
    pub sells: usize,
    pub stop_sells: usize,
    pub realloc_buys: usize,
    pub realloc_sells: usize,
}

/// Everything a run produces
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub instrument: String,
    pub regime: RegimeKey,
    pub fund: Decimal,
    pub ledger: Ledger,
    pub treasury: Treasury,
    pub stats: TradeStats,
    pub orders_submitted: usize,
    /// Orders the gateway did not confirm; the ledger books them regardless
    pub orders_unconfirmed: usize,
}

impl SimulationReport {
    pub fn final_capital(&self) -> Decimal {
        self.ledger.final_capital().unwrap_or(self.fund)
    }
}

/// Run parameters resolved from config and the regime table
#[derive(Debug, Clone, Copy)]
struct RunParameters {
    regime: RegimeKey,
    sizing: Sizing,
    realloc_size: Decimal,
    policy: ProfitPolicy,
}

/// Drives one single-pass simulation per instrument
///
/// The engine itself is immutable; every run builds its own [`RunState`], so runs for
/// different instruments can execute in parallel against the same engine.
#[derive(Debug, Clone)]
pub struct SimulationEngine {
    config: Arc<EngineConfig>,
    regimes: Arc<RegimeTable>,
}

impl SimulationEngine {
    pub fn new(config: Arc<EngineConfig>, regimes: Arc<RegimeTable>) -> Self {
        Self { config, regimes }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn resolve(&self, input: &RunInput<'_>) -> Result<RunParameters, ConfigError> {
        let volatility = VolatilityBucket::classify(input.bars, input.expected_swing);
        let regime = RegimeKey::new(self.config.market_type, self.config.timeframe, volatility);
        let params = self.regimes.params(regime)?;

        let base_trade_size = params.base_trade_size();

        Ok(RunParameters {
            regime,
            sizing: Sizing {
                base_trade_size,
                double_down_multiplier: self.config.double_down_multiplier,
            },
            realloc_size: base_trade_size * self.config.reallocation_fraction,
            policy: ProfitPolicy::new(params.cascade_ratio, self.config.safety_ratio),
        })
    }

    /// Simulate one instrument, dispatching each bar's orders after the bar is committed
    ///
    /// Empty or malformed series produce an empty ledger. Gateway failures are logged
    /// and counted but never change the ledger.
    pub fn run<S, G>(
        &self,
        input: RunInput<'_>,
        selector: &S,
        gateway: &G,
    ) -> Result<SimulationReport, ConfigError>
    where
        S: TopRiserSelector + ?Sized,
        G: ExchangeGateway + ?Sized,
    {
        let params = self.resolve(&input)?;

        let mut report = SimulationReport {
            instrument: input.instrument.to_string(),
            regime: params.regime,
            fund: self.config.fund,
            ledger: Ledger::default(),
            treasury: Treasury::new(),
            stats: TradeStats::default(),
            orders_submitted: 0,
            orders_unconfirmed: 0,
        };

        if input.bars.is_empty() {
            tracing::warn!("{}: empty bar series, nothing to simulate", input.instrument);
            return Ok(report);
        }
        if let Some(bad) = input.bars.iter().position(|b| b.close <= Decimal::ZERO) {
            tracing::warn!(
                "{}: non-positive close at bar {}, skipping malformed series",
                input.instrument,
                bad
            );
            return Ok(report);
        }

        tracing::info!(
            "Starting run: {} {} bars, regime {}, base trade size {:.2}",
            input.instrument,
            input.bars.len(),
            params.regime,
            params.sizing.base_trade_size
        );

        let mut state = RunState::new(&self.config, params, input);

        for i in 1..input.bars.len() {
            let orders = state.step(i, selector);

            let outcome = dispatch_orders(gateway, &orders);
            report.orders_submitted += outcome.submitted;
            report.orders_unconfirmed += outcome.unconfirmed;
        }

        report.ledger = state.ledger;
        report.treasury = state.treasury;
        report.stats = state.stats;

        tracing::info!(
            "Run complete: {} final capital {:.2}, booked profit {:.2}, safety fund {:.2}, minted {}",
            report.instrument,
            report.final_capital(),
            report.ledger.total_profit(),
            report.treasury.safety_fund,
            report.treasury.minted
        );

        Ok(report)
    }
}

/// Mutable state owned by exactly one run
struct RunState<'a> {
    config: &'a EngineConfig,
    params: RunParameters,
    input: RunInput<'a>,
    primary: PrimaryMachine,
    realloc: ReallocationMachine,
    treasury: Treasury,
    ledger: Ledger,
    stats: TradeStats,
}

impl<'a> RunState<'a> {
    fn new(config: &'a EngineConfig, params: RunParameters, input: RunInput<'a>) -> Self {
        let mut ledger = Ledger::with_capacity(input.bars.len());
        ledger.push(LedgerRow::opening(input.bars[0].timestamp, config.fund));

        Self {
            config,
            params,
            input,
            primary: PrimaryMachine::new(config.stop_rules(), params.sizing),
            realloc: ReallocationMachine::new(
                params.realloc_size,
                config.reallocation_gain_threshold,
            ),
            treasury: Treasury::new(),
            ledger,
            stats: TradeStats::default(),
        }
    }

    /// Evaluate bar `i`, commit its row and return the orders it produced
    fn step<S>(&mut self, i: usize, selector: &S) -> Vec<OrderRequest>
    where
        S: TopRiserSelector + ?Sized,
    {
        let bars = self.input.bars;
        let previous = &bars[i - 1];
        let current = &bars[i];

        let mut orders = Vec::new();
        let mut row = match self.ledger.last() {
            Some(last) => LedgerRow::carry(last, current.timestamp),
            None => LedgerRow::opening(current.timestamp, self.config.fund),
        };

        let decision = DecisionBar {
            signal: previous.signal,
        };
        let execution = ExecutionBar {
            close: current.close,
            previous_close: previous.close,
            signal: current.signal,
        };

        // 1. Scheduled sell, lagged one bar behind its signal
        if let Some(exit) = self.primary.scheduled_exit(&decision, &execution) {
            self.settle_primary(&mut row, &exit, &mut orders);
        }

        // 2. Reallocation exit, or entry while nothing is held
        if let Some(snapshot) = self.input.snapshot {
            if self.realloc.is_holding() {
                self.check_realloc_exit(&mut row, snapshot, i, &mut orders);
            } else {
                let change = if i > 1 {
                    price_change(previous.close, current.close)
                } else {
                    Decimal::ZERO
                };
                let context = EntryContext {
                    primary_instrument: self.input.instrument,
                    primary_holding: self.primary.is_holding(),
                    price_change: change,
                    index: i,
                };
                if let Some(entry) = self.realloc.try_enter(&context, snapshot, selector) {
                    row.realloc_signal = ReallocSignal::Enter;
                    row.capital -= entry.size;
                    self.stats.realloc_buys += 1;

                    tracing::info!(
                        instrument = %entry.instrument,
                        primary = %self.input.instrument,
                        timeframe = self.config.timeframe.as_str(),
                        "Realloc BUY: ${:.2} ({:.4} units @ ${:.8})",
                        entry.size,
                        entry.units,
                        entry.price
                    );

                    orders.push(OrderRequest::new(
                        entry.instrument,
                        OrderSide::Buy,
                        entry.units,
                        entry.price,
                    ));
                }
            }
        }

        // 3. Primary buy, otherwise 4. stop check on an existing position
        if let Some(entry) = self.primary.try_enter(&execution, row.capital) {
            row.capital -= entry.trade_size;
            self.stats.buys += 1;

            tracing::info!(
                instrument = %self.input.instrument,
                timeframe = self.config.timeframe.as_str(),
                spectrum = %self.config.spectrum,
                "BUY: {:.2} units @ ${:.8}",
                entry.units,
                entry.price
            );

            orders.push(OrderRequest::new(
                self.input.instrument,
                OrderSide::Buy,
                entry.units,
                entry.price,
            ));
        } else if self.primary.is_holding() {
            if let Some(exit) = self.primary.check_stop(&decision, &execution) {
                self.settle_primary(&mut row, &exit, &mut orders);
            }
        }

        if let Some(position) = self.primary.position() {
            row.units = position.units;
            row.position = position.cost_basis;
        }
        if let Some(position) = self.realloc.position() {
            row.realloc_units = position.units;
            row.realloc_position = position.cost_basis;
        }

        self.ledger.push(row);
        orders
    }

    fn settle_primary(&mut self, row: &mut LedgerRow, exit: &PrimaryExit, orders: &mut Vec<OrderRequest>) {
        let split = self
            .params
            .policy
            .split(ProfitSource::Primary, exit.profit, exit.sale_value);

        row.profit += split.booked;
        row.capital += split.capital_credit;
        self.treasury.absorb(&split);

        let label = match exit.kind {
            ExitKind::Signal => {
                self.stats.sells += 1;
                "SELL"
            }
            ExitKind::Stop => {
                self.stats.stop_sells += 1;
                row.position = -exit.sale_value;
                "STOP SELL"
            }
        };

        tracing::info!(
            instrument = %self.input.instrument,
            timeframe = self.config.timeframe.as_str(),
            spectrum = %self.config.spectrum,
            sell_strategy = %self.config.sell_strategy,
            "{}: Profit ${:.2}, Safety Fund ${:.2}, Minted {}",
            label,
            split.booked,
            split.safety_contribution,
            self.treasury.minted
        );

        orders.push(OrderRequest::new(
            self.input.instrument,
            OrderSide::Sell,
            exit.units,
            exit.price,
        ));
    }

    fn check_realloc_exit(
        &mut self,
        row: &mut LedgerRow,
        snapshot: &MarketSnapshot,
        i: usize,
        orders: &mut Vec<OrderRequest>,
    ) {
        let Some(exit) = self.realloc.check_exit(snapshot, i) else {
            return;
        };

        let split = self
            .params
            .policy
            .split(ProfitSource::Reallocation, exit.profit, exit.sale_value);

        row.realloc_signal = ReallocSignal::Exit;
        row.profit += split.booked;
        row.capital += split.capital_credit;
        self.treasury.absorb(&split);
        self.stats.realloc_sells += 1;

        tracing::info!(
            instrument = %exit.instrument,
            primary = %self.input.instrument,
            timeframe = self.config.timeframe.as_str(),
            "Realloc SELL: Profit ${:.2}, Safety Fund ${:.2}, Minted {}",
            split.booked,
            split.safety_contribution,
            self.treasury.minted
        );

        orders.push(OrderRequest::new(
            exit.instrument,
            OrderSide::Sell,
            exit.units,
            exit.price,
        ));
    }
}
