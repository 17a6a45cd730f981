use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

/// Reallocation event marker for a ledger row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReallocSignal {
    #[default]
    None,
    Enter,
    Exit,
}

impl ReallocSignal {
    /// -1 / 0 / 1 as recorded in exported ledgers
    pub fn as_i8(&self) -> i8 {
        match self {
            ReallocSignal::None => 0,
            ReallocSignal::Enter => 1,
            ReallocSignal::Exit => -1,
        }
    }
}

impl Serialize for ReallocSignal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.as_i8())
    }
}

/// One bar's bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerRow {
    pub timestamp: DateTime<Utc>,
    /// Committed capital; negative on a stop exit
    pub position: Decimal,
    pub units: Decimal,
    pub capital: Decimal,
    pub profit: Decimal,
    pub realloc_signal: ReallocSignal,
    pub realloc_units: Decimal,
    pub realloc_position: Decimal,
}

impl LedgerRow {
    /// Opening row: all cash, nothing committed
    pub fn opening(timestamp: DateTime<Utc>, fund: Decimal) -> Self {
        Self {
            timestamp,
            position: Decimal::ZERO,
            units: Decimal::ZERO,
            capital: fund,
            profit: Decimal::ZERO,
            realloc_signal: ReallocSignal::None,
            realloc_units: Decimal::ZERO,
            realloc_position: Decimal::ZERO,
        }
    }

    /// Start a new row from the previous one: capital carries, events reset
    ///
    /// Holdings are filled in by the state machines, not carried here.
    pub fn carry(previous: &LedgerRow, timestamp: DateTime<Utc>) -> Self {
        Self::opening(timestamp, previous.capital)
    }
}

/// Append-only per-bar ledger; rows are immutable once pushed
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Ledger {
    rows: Vec<LedgerRow>,
}

impl Ledger {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, row: LedgerRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[LedgerRow] {
        &self.rows
    }

    pub fn last(&self) -> Option<&LedgerRow> {
        self.rows.last()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Ending uncommitted cash, if any bar was processed
    pub fn final_capital(&self) -> Option<Decimal> {
        self.rows.last().map(|r| r.capital)
    }

    /// Sum of every bar's booked profit
    pub fn total_profit(&self) -> Decimal {
        self.rows.iter().map(|r| r.profit).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_carry_keeps_capital_only() {
        let now = Utc::now();
        let mut row = LedgerRow::opening(now, dec!(10000));
        row.capital = dec!(7000);
        row.units = dec!(3000);
        row.profit = dec!(12);
        row.realloc_signal = ReallocSignal::Enter;

        let next = LedgerRow::carry(&row, now);
        assert_eq!(next.capital, dec!(7000));
        assert_eq!(next.units, dec!(0));
        assert_eq!(next.profit, dec!(0));
        assert_eq!(next.realloc_signal, ReallocSignal::None);
    }

    #[test]
    fn test_ledger_totals() {
        let now = Utc::now();
        let mut ledger = Ledger::with_capacity(3);
        assert_eq!(ledger.final_capital(), None);

        ledger.push(LedgerRow::opening(now, dec!(100)));
        let mut row = LedgerRow::carry(ledger.last().unwrap(), now);
        row.profit = dec!(5);
        row.capital = dec!(105);
        ledger.push(row);

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.total_profit(), dec!(5));
        assert_eq!(ledger.final_capital(), Some(dec!(105)));
    }

    #[test]
    fn test_realloc_signal_codes() {
        assert_eq!(ReallocSignal::Enter.as_i8(), 1);
        assert_eq!(ReallocSignal::Exit.as_i8(), -1);
        assert_eq!(ReallocSignal::None.as_i8(), 0);
    }
}
