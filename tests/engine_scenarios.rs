use chrono::{Duration, TimeZone, Utc};
use midas::config::{EngineConfig, MidasConfig};
use midas::discovery::{LargestGainSelector, MarketSnapshot, TopRiserSelector};
use midas::engine::{ReallocSignal, RunInput, SimulationEngine, SimulationReport};
use midas::execution::{ExchangeGateway, OrderConfirmation, OrderRequest, PaperGateway};
use midas::models::{Bar, OrderSide, Signal};
use midas::regime::{RegimeEntry, RegimeKey, RegimeTable};
use midas::{ConfigError, GatewayError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn entries(outer: Decimal, cascade: Decimal) -> Vec<RegimeEntry> {
    RegimeKey::all()
        .map(|key| RegimeEntry {
            market_type: key.market_type,
            timeframe: key.timeframe,
            volatility: key.volatility,
            outer_trade_size: outer,
            cascade_ratio: cascade,
        })
        .collect()
}

fn engine(config: EngineConfig, outer: Decimal, cascade: Decimal) -> SimulationEngine {
    let table = RegimeTable::from_entries(&entries(outer, cascade)).unwrap();
    SimulationEngine::new(Arc::new(config), Arc::new(table))
}

fn bars(closes: &[Decimal], signals: &[i32]) -> Vec<Bar> {
    assert_eq!(closes.len(), signals.len());
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .zip(signals)
        .enumerate()
        .map(|(i, (close, signal))| Bar::new(start + Duration::hours(i as i64), *close).with_signal(*signal))
        .collect()
}

fn flat(n: usize) -> Vec<Decimal> {
    vec![dec!(1.0); n]
}

fn run(
    engine: &SimulationEngine,
    series: &[Bar],
    snapshot: Option<&MarketSnapshot>,
    gateway: &dyn ExchangeGateway,
) -> SimulationReport {
    engine
        .run(
            RunInput {
                instrument: "SHIB-USD",
                bars: series,
                expected_swing: dec!(0.02),
                snapshot,
            },
            &LargestGainSelector::default(),
            gateway,
        )
        .unwrap()
}

struct FailingGateway;

impl ExchangeGateway for FailingGateway {
    fn submit_order(&self, _order: &OrderRequest) -> Result<OrderConfirmation, GatewayError> {
        Err(GatewayError::Api {
            code: -1003,
            message: "Too many requests".to_string(),
        })
    }
}

/// Always picks the same instrument
struct Always(&'static str);

impl TopRiserSelector for Always {
    fn select(&self, _snapshot: &MarketSnapshot) -> Option<String> {
        Some(self.0.to_string())
    }
}

#[test]
fn test_buy_sell_scenario_returns_to_fund() {
    let engine = engine(EngineConfig::default(), dec!(9000), dec!(0.5));
    let series = bars(&flat(5), &[0, 1, 0, -1, 0]);
    let paper = PaperGateway::new();

    let report = run(&engine, &series, None, &paper);
    let rows = report.ledger.rows();

    assert_eq!(rows[1].capital, dec!(7000));
    assert_eq!(rows[1].units, dec!(3000));
    assert_eq!(rows[4].capital, dec!(10000));
    assert_eq!(rows[4].profit, dec!(0));

    let fills = paper.fills();
    assert_eq!(fills.len(), 2);
    assert_eq!(fills[0].side, OrderSide::Buy);
    assert_eq!(fills[1].side, OrderSide::Sell);
    assert_eq!(fills[1].quantity, dec!(3000));
}

#[test]
fn test_round_trip_with_zero_stops() {
    let config = EngineConfig {
        stop_loss: dec!(0),
        trailing_stop: dec!(0),
        ..EngineConfig::default()
    };
    // base trade size 800, below the mint denomination
    let engine = engine(config, dec!(2400), dec!(0.5));
    let series = bars(&flat(5), &[0, 1, 0, -1, 0]);

    let report = run(&engine, &series, None, &PaperGateway::new());

    assert_eq!(report.final_capital(), dec!(10000));
    assert_eq!(report.treasury.minted, 0);
    assert_eq!(report.treasury.safety_fund, dec!(0));
}

#[test]
fn test_stop_loss_scenario() {
    let config = EngineConfig {
        stop_loss: dec!(0.05),
        trailing_stop: dec!(0.03),
        ..EngineConfig::default()
    };
    let engine = engine(config, dec!(9000), dec!(0.6));
    let series = bars(&[dec!(1.0), dec!(1.0), dec!(0.94)], &[0, 1, 0]);

    let report = run(&engine, &series, None, &PaperGateway::new());
    let row = &report.ledger.rows()[2];

    let sale_value = dec!(2820);
    let booked = dec!(-180) * dec!(0.6);
    assert_eq!(report.stats.stop_sells, 1);
    assert!(row.profit < Decimal::ZERO);
    assert_eq!(row.profit, booked);
    assert_eq!(row.capital, dec!(7000) + sale_value - booked);
}

#[test]
fn test_scheduled_sell_wins_over_stop_on_same_bar() {
    let config = EngineConfig {
        stop_loss: dec!(0.05),
        trailing_stop: dec!(0.01),
        ..EngineConfig::default()
    };
    let engine = engine(config, dec!(9000), dec!(0.5));
    // bar 3 breaches the stop and also executes the -1 raised on bar 2
    let series = bars(&[dec!(1.0), dec!(1.0), dec!(1.0), dec!(0.9)], &[0, 1, -1, 0]);

    let report = run(&engine, &series, None, &PaperGateway::new());
    let row = &report.ledger.rows()[3];

    assert_eq!(report.stats.sells, 1);
    assert_eq!(report.stats.stop_sells, 0);
    assert_eq!(row.position, dec!(0));
    assert_eq!(row.units, dec!(0));
    assert_eq!(row.profit, dec!(-150));
    assert_eq!(row.capital, dec!(9850));
}

#[test]
fn test_flat_without_signal_keeps_capital() {
    let engine = engine(EngineConfig::default(), dec!(9000), dec!(0.5));
    let series = bars(
        &[dec!(1.0), dec!(1.1), dec!(0.9), dec!(1.3), dec!(1.2)],
        &[0, 0, -1, 0, -1],
    );

    let report = run(&engine, &series, None, &PaperGateway::new());

    for row in report.ledger.rows() {
        assert_eq!(row.capital, dec!(10000));
        assert_eq!(row.units, dec!(0));
    }
    assert_eq!(report.stats.sells, 0);
    assert_eq!(report.orders_submitted, 0);
}

#[test]
fn test_treasury_never_decreases() {
    let engine = engine(EngineConfig::default(), dec!(9000), dec!(0.5));
    let closes = [
        dec!(1.0), dec!(0.98), dec!(1.05), dec!(1.10), dec!(0.97),
        dec!(0.90), dec!(0.92), dec!(1.01), dec!(1.20), dec!(1.18),
    ];
    let signals = [0, 1, 0, -1, 1, 0, 6, 0, -1, 0];

    let mut last_safety = Decimal::ZERO;
    let mut last_minted = 0;
    for n in 2..=closes.len() {
        let report = run(&engine, &bars(&closes[..n], &signals[..n]), None, &PaperGateway::new());
        assert!(report.treasury.safety_fund >= last_safety);
        assert!(report.treasury.minted >= last_minted);
        last_safety = report.treasury.safety_fund;
        last_minted = report.treasury.minted;
    }
}

fn drop_series() -> Vec<Bar> {
    // bar 2 drops 2% while flat; bar 4 drops again while the reallocation is open
    bars(
        &[dec!(1.0), dec!(1.0), dec!(0.98), dec!(0.98), dec!(0.95), dec!(0.95)],
        &[0, 0, 0, 0, 0, 0],
    )
}

fn alt_snapshot(doge: &[Decimal]) -> MarketSnapshot {
    let mut snapshot = MarketSnapshot::new();
    snapshot.insert(
        "DOGE-USD",
        doge.iter().map(|c| Bar::new(Utc::now(), *c)).collect(),
    );
    snapshot
}

#[test]
fn test_reallocation_enter_and_exit() {
    let engine = engine(EngineConfig::default(), dec!(3000), dec!(0.5));
    // realloc size = 0.25 * 1000 = 250
    let snapshot = alt_snapshot(&[dec!(0.10), dec!(0.10), dec!(0.10), dec!(0.104), dec!(0.106), dec!(0.2)]);

    let report = engine
        .run(
            RunInput {
                instrument: "SHIB-USD",
                bars: &drop_series(),
                expected_swing: dec!(0.02),
                snapshot: Some(&snapshot),
            },
            &Always("DOGE-USD"),
            &PaperGateway::new(),
        )
        .unwrap();
    let rows = report.ledger.rows();

    assert_eq!(rows[2].realloc_signal, ReallocSignal::Enter);
    assert_eq!(rows[2].capital, dec!(9750));
    assert_eq!(rows[2].realloc_units, dec!(2500));
    assert_eq!(rows[3].realloc_units, dec!(2500));

    // 0.106 >= 0.105 at bar 4; the second drop never stacks a new entry
    assert_eq!(rows[4].realloc_signal, ReallocSignal::Exit);
    assert_eq!(rows[4].profit, dec!(15));
    assert_eq!(rows[4].capital, dec!(10015));
    assert_eq!(rows[4].realloc_units, dec!(0));
    assert_eq!(report.stats.realloc_buys, 1);
    assert_eq!(report.stats.realloc_sells, 1);
    // safety 1.5, nothing minted on 265 of proceeds
    assert_eq!(report.treasury.safety_fund, dec!(1.5));
    assert_eq!(report.treasury.minted, 0);
}

#[test]
fn test_no_reallocation_while_primary_holding() {
    let engine = engine(EngineConfig::default(), dec!(9000), dec!(0.5));
    let config_stops_wide = EngineConfig {
        stop_loss: dec!(0.5),
        trailing_stop: dec!(0.5),
        ..EngineConfig::default()
    };
    let wide = SimulationEngine::new(
        Arc::new(config_stops_wide),
        Arc::new(RegimeTable::from_entries(&entries(dec!(9000), dec!(0.5))).unwrap()),
    );
    let snapshot = alt_snapshot(&[dec!(0.1); 6]);
    let series = bars(
        &[dec!(1.0), dec!(1.0), dec!(0.97), dec!(0.94), dec!(0.91), dec!(0.88)],
        &[0, 1, 0, 0, 0, 0],
    );

    for engine in [&engine, &wide] {
        let report = engine
            .run(
                RunInput {
                    instrument: "SHIB-USD",
                    bars: &series,
                    expected_swing: dec!(0.02),
                    snapshot: Some(&snapshot),
                },
                &Always("DOGE-USD"),
                &PaperGateway::new(),
            )
            .unwrap();

        for row in report.ledger.rows() {
            if row.realloc_signal == ReallocSignal::Enter {
                assert_eq!(row.units, dec!(0), "entered while holding the primary");
            }
        }
    }
}

#[test]
fn test_short_reallocation_series_clamps() {
    let engine = engine(EngineConfig::default(), dec!(3000), dec!(0.5));
    // only two bars of DOGE; entry at bar 2 uses the last close
    let snapshot = alt_snapshot(&[dec!(0.10), dec!(0.125)]);

    let report = engine
        .run(
            RunInput {
                instrument: "SHIB-USD",
                bars: &drop_series(),
                expected_swing: dec!(0.02),
                snapshot: Some(&snapshot),
            },
            &Always("DOGE-USD"),
            &PaperGateway::new(),
        )
        .unwrap();
    let rows = report.ledger.rows();

    assert_eq!(rows[2].realloc_signal, ReallocSignal::Enter);
    assert_eq!(rows[2].realloc_units, dec!(2000));
    // price never moves past the clamp, so the position stays open
    assert_eq!(rows.last().unwrap().realloc_units, dec!(2000));
}

#[test]
fn test_failing_gateway_leaves_ledger_unchanged() {
    let engine = engine(EngineConfig::default(), dec!(3000), dec!(0.5));
    let snapshot = alt_snapshot(&[dec!(0.10), dec!(0.10), dec!(0.10), dec!(0.104), dec!(0.106), dec!(0.2)]);
    let series = {
        let mut s = drop_series();
        s[5].signal = Signal::BUY;
        s
    };

    let run_with = |gateway: &dyn ExchangeGateway| {
        engine
            .run(
                RunInput {
                    instrument: "SHIB-USD",
                    bars: &series,
                    expected_swing: dec!(0.02),
                    snapshot: Some(&snapshot),
                },
                &Always("DOGE-USD"),
                gateway,
            )
            .unwrap()
    };

    let paper = run_with(&PaperGateway::new());
    let failing = run_with(&FailingGateway);

    assert_eq!(paper.ledger.rows(), failing.ledger.rows());
    assert_eq!(paper.treasury, failing.treasury);
    assert_eq!(paper.orders_unconfirmed, 0);
    assert_eq!(failing.orders_unconfirmed, failing.orders_submitted);
    assert_eq!(failing.orders_submitted, 3);
}

#[test]
fn test_empty_series_is_empty_run() {
    let engine = engine(EngineConfig::default(), dec!(9000), dec!(0.5));
    let report = run(&engine, &[], None, &PaperGateway::new());

    assert!(report.ledger.is_empty());
    assert_eq!(report.treasury.minted, 0);
    assert_eq!(report.orders_submitted, 0);
}

#[test]
fn test_missing_swing_baseline_is_config_error() {
    let config = MidasConfig {
        engine: EngineConfig::default(),
        regimes: entries(dec!(9000), dec!(0.5)),
        instruments: Vec::new(),
        market_data: Default::default(),
        gateway: Default::default(),
    };

    match config.expected_swing("SHIB-USD") {
        Err(ConfigError::MissingSwingBaseline(symbol)) => assert_eq!(symbol, "SHIB-USD"),
        other => panic!("expected missing baseline, got {:?}", other),
    }
}

#[test]
fn test_incomplete_regime_table_is_config_error() {
    let mut partial = entries(dec!(9000), dec!(0.5));
    partial.pop();
    assert!(RegimeTable::from_entries(&partial).is_err());
}
