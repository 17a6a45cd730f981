use crate::models::Signal;
use crate::risk::StopRules;
use rust_decimal::Decimal;

/// Bar whose signal schedules a sell (bar i-1)
#[derive(Debug, Clone, Copy)]
pub struct DecisionBar {
    pub signal: Signal,
}

/// Bar at whose close trades execute (bar i)
#[derive(Debug, Clone, Copy)]
pub struct ExecutionBar {
    pub close: Decimal,
    pub previous_close: Decimal,
    pub signal: Signal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenPosition {
    pub entry_price: Decimal,
    pub units: Decimal,
    /// Capital committed at entry
    pub cost_basis: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrimaryState {
    Flat,
    Holding(OpenPosition),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// Scheduled by a sell signal on the decision bar
    Signal,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimaryExit {
    pub kind: ExitKind,
    pub units: Decimal,
    pub price: Decimal,
    pub sale_value: Decimal,
    pub profit: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimaryEntry {
    pub units: Decimal,
    pub price: Decimal,
    pub trade_size: Decimal,
}

#[derive(Debug, Clone, Copy)]
pub struct Sizing {
    pub base_trade_size: Decimal,
    pub double_down_multiplier: Decimal,
}

impl Sizing {
    pub fn trade_size(&self, signal: Signal) -> Decimal {
        if signal.is_double_down_buy() {
            self.base_trade_size * self.double_down_multiplier
        } else {
            self.base_trade_size
        }
    }
}

/// FLAT/HOLDING lifecycle of the traded instrument
///
/// Per bar the caller runs, in order: [`scheduled_exit`](Self::scheduled_exit),
/// [`try_enter`](Self::try_enter), and [`check_stop`](Self::check_stop) only when
/// no entry happened. A scheduled sell therefore always wins over a stop on the same bar.
#[derive(Debug, Clone)]
pub struct PrimaryMachine {
    state: PrimaryState,
    stops: StopRules,
    sizing: Sizing,
}

impl PrimaryMachine {
    pub fn new(stops: StopRules, sizing: Sizing) -> Self {
        Self {
            state: PrimaryState::Flat,
            stops,
            sizing,
        }
    }

    pub fn is_holding(&self) -> bool {
        matches!(self.state, PrimaryState::Holding(_))
    }

    pub fn position(&self) -> Option<&OpenPosition> {
        match &self.state {
            PrimaryState::Holding(position) => Some(position),
            PrimaryState::Flat => None,
        }
    }

    /// Sell at this bar's close when the previous bar signalled exactly -1
    pub fn scheduled_exit(
        &mut self,
        decision: &DecisionBar,
        execution: &ExecutionBar,
    ) -> Option<PrimaryExit> {
        if !decision.signal.is_sell() {
            return None;
        }
        self.realize(ExitKind::Signal, decision, execution)
    }

    /// Enter on a buy signal when flat and the capital covers the trade size
    pub fn try_enter(&mut self, execution: &ExecutionBar, capital: Decimal) -> Option<PrimaryEntry> {
        if self.is_holding() || !execution.signal.is_buy() {
            return None;
        }

        let trade_size = self.sizing.trade_size(execution.signal);
        if capital < trade_size {
            tracing::debug!(
                "Skipping buy: capital {:.2} below trade size {:.2}",
                capital,
                trade_size
            );
            return None;
        }

        let units = trade_size / execution.close;
        self.state = PrimaryState::Holding(OpenPosition {
            entry_price: execution.close,
            units,
            cost_basis: trade_size,
        });

        Some(PrimaryEntry {
            units,
            price: execution.close,
            trade_size,
        })
    }

    /// Force an exit once the close breaches the stop or trailing level
    pub fn check_stop(
        &mut self,
        decision: &DecisionBar,
        execution: &ExecutionBar,
    ) -> Option<PrimaryExit> {
        let position = self.position()?;
        if !self
            .stops
            .is_triggered(position.entry_price, execution.previous_close, execution.close)
        {
            return None;
        }
        self.realize(ExitKind::Stop, decision, execution)
    }

    fn realize(
        &mut self,
        kind: ExitKind,
        decision: &DecisionBar,
        execution: &ExecutionBar,
    ) -> Option<PrimaryExit> {
        let position = *self.position()?;

        let sale_value = position.units * execution.close;
        let mut profit = sale_value - position.cost_basis;
        if decision.signal.is_double_down() {
            profit *= self.sizing.double_down_multiplier;
        }

        self.state = PrimaryState::Flat;

        Some(PrimaryExit {
            kind,
            units: position.units,
            price: execution.close,
            sale_value,
            profit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn machine(stop_loss: Decimal, trailing_stop: Decimal) -> PrimaryMachine {
        PrimaryMachine::new(
            StopRules::new(stop_loss, trailing_stop),
            Sizing {
                base_trade_size: dec!(3000),
                double_down_multiplier: dec!(2),
            },
        )
    }

    fn exec(close: Decimal, previous_close: Decimal, signal: i32) -> ExecutionBar {
        ExecutionBar {
            close,
            previous_close,
            signal: Signal::from(signal),
        }
    }

    fn decision(signal: i32) -> DecisionBar {
        DecisionBar {
            signal: Signal::from(signal),
        }
    }

    #[test]
    fn test_buy_when_flat_with_capital() {
        let mut m = machine(dec!(0.05), dec!(0.05));
        let entry = m.try_enter(&exec(dec!(1.5), dec!(1.5), 1), dec!(10000)).unwrap();

        assert_eq!(entry.trade_size, dec!(3000));
        assert_eq!(entry.units, dec!(2000));
        assert_eq!(m.position().unwrap().entry_price, dec!(1.5));
    }

    #[test]
    fn test_double_down_buy_scales_size() {
        let mut m = machine(dec!(0.05), dec!(0.05));
        let entry = m.try_enter(&exec(dec!(1), dec!(1), 6), dec!(10000)).unwrap();
        assert_eq!(entry.trade_size, dec!(6000));
    }

    #[test]
    fn test_no_buy_without_capital_or_when_holding() {
        let mut m = machine(dec!(0.05), dec!(0.05));
        assert!(m.try_enter(&exec(dec!(1), dec!(1), 1), dec!(2999)).is_none());
        assert!(!m.is_holding());

        m.try_enter(&exec(dec!(1), dec!(1), 1), dec!(10000)).unwrap();
        assert!(m.try_enter(&exec(dec!(1), dec!(1), 1), dec!(10000)).is_none());
    }

    #[test]
    fn test_no_sell_while_flat() {
        let mut m = machine(dec!(0.05), dec!(0.05));
        assert!(m.scheduled_exit(&decision(-1), &exec(dec!(1), dec!(1), 0)).is_none());
        assert!(m.check_stop(&decision(0), &exec(dec!(0.1), dec!(1), 0)).is_none());
    }

    #[test]
    fn test_scheduled_exit_uses_decision_bar() {
        let mut m = machine(dec!(0.05), dec!(0.05));
        m.try_enter(&exec(dec!(1), dec!(1), 1), dec!(10000)).unwrap();

        // sell signal on the execution bar itself is ignored
        assert!(m.scheduled_exit(&decision(0), &exec(dec!(1.1), dec!(1), -1)).is_none());

        let exit = m.scheduled_exit(&decision(-1), &exec(dec!(1.1), dec!(1), 0)).unwrap();
        assert_eq!(exit.kind, ExitKind::Signal);
        assert_eq!(exit.sale_value, dec!(3300));
        assert_eq!(exit.profit, dec!(300));
        assert!(!m.is_holding());
    }

    #[test]
    fn test_stop_loss_exit() {
        let mut m = machine(dec!(0.05), dec!(0.01));
        m.try_enter(&exec(dec!(1), dec!(1), 1), dec!(10000)).unwrap();

        let exit = m.check_stop(&decision(0), &exec(dec!(0.94), dec!(1), 0)).unwrap();
        assert_eq!(exit.kind, ExitKind::Stop);
        assert_eq!(exit.sale_value, dec!(2820));
        assert_eq!(exit.profit, dec!(-180));
    }

    #[test]
    fn test_stop_holds_above_levels() {
        let mut m = machine(dec!(0.05), dec!(0.05));
        m.try_enter(&exec(dec!(1), dec!(1), 1), dec!(10000)).unwrap();

        assert!(m.check_stop(&decision(0), &exec(dec!(0.96), dec!(1), 0)).is_none());
        assert!(m.is_holding());
    }

    #[test]
    fn test_double_down_magnitude_scales_stop_profit() {
        let mut m = machine(dec!(0.05), dec!(0.01));
        m.try_enter(&exec(dec!(1), dec!(1), 1), dec!(10000)).unwrap();

        let exit = m.check_stop(&decision(6), &exec(dec!(0.9), dec!(1), 0)).unwrap();
        // (2700 - 3000) * 2
        assert_eq!(exit.profit, dec!(-600));
    }

    #[test]
    fn test_trailing_stop_follows_previous_close() {
        let mut m = machine(dec!(0.50), dec!(0.05));
        m.try_enter(&exec(dec!(1), dec!(1), 1), dec!(10000)).unwrap();

        // stop = 0.5, trailing = 2.0 * 0.95 = 1.9 -> min is 0.5, no exit at 1.8
        assert!(m.check_stop(&decision(0), &exec(dec!(1.8), dec!(2.0), 0)).is_none());
        assert!(m.check_stop(&decision(0), &exec(dec!(0.5), dec!(1.8), 0)).is_some());
    }
}
