use crate::discovery::{MarketSnapshot, TopRiserSelector};
use rust_decimal::Decimal;

/// Bar-over-bar change in the primary close that triggers a reallocation (-1%)
pub const DROP_TRIGGER: Decimal = Decimal::from_parts(1, 0, 0, true, 2);

#[derive(Debug, Clone, PartialEq)]
pub struct ReallocationPosition {
    pub instrument: String,
    pub entry_price: Decimal,
    pub units: Decimal,
    pub cost_basis: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReallocationState {
    Idle,
    Holding(ReallocationPosition),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReallocationEntry {
    pub instrument: String,
    pub units: Decimal,
    pub price: Decimal,
    pub size: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReallocationExit {
    pub instrument: String,
    pub units: Decimal,
    pub price: Decimal,
    pub sale_value: Decimal,
    pub profit: Decimal,
}

/// What the primary side looks like on the bar an entry is considered
#[derive(Debug, Clone, Copy)]
pub struct EntryContext<'a> {
    pub primary_instrument: &'a str,
    pub primary_holding: bool,
    /// Primary close change versus the previous bar, as a fraction
    pub price_change: Decimal,
    pub index: usize,
}

/// Secondary buy/hold/sell lifecycle in an alternate instrument
#[derive(Debug, Clone)]
pub struct ReallocationMachine {
    state: ReallocationState,
    size: Decimal,
    gain_threshold: Decimal,
}

impl ReallocationMachine {
    /// # Arguments
    /// * `size` - Capital committed per reallocation (fraction of the base trade size)
    /// * `gain_threshold` - Gain over entry at which the position is sold
    pub fn new(size: Decimal, gain_threshold: Decimal) -> Self {
        Self {
            state: ReallocationState::Idle,
            size,
            gain_threshold,
        }
    }

    pub fn is_holding(&self) -> bool {
        matches!(self.state, ReallocationState::Holding(_))
    }

    pub fn position(&self) -> Option<&ReallocationPosition> {
        match &self.state {
            ReallocationState::Holding(position) => Some(position),
            ReallocationState::Idle => None,
        }
    }

    /// Sell once the held instrument reaches `entry * (1 + gain_threshold)`
    pub fn check_exit(&mut self, snapshot: &MarketSnapshot, index: usize) -> Option<ReallocationExit> {
        let position = self.position()?;
        let price = snapshot.close_at(&position.instrument, index)?;

        if price < position.entry_price * (Decimal::ONE + self.gain_threshold) {
            return None;
        }

        let sale_value = position.units * price;
        let exit = ReallocationExit {
            instrument: position.instrument.clone(),
            units: position.units,
            price,
            sale_value,
            profit: sale_value - position.cost_basis,
        };

        self.state = ReallocationState::Idle;
        Some(exit)
    }

    /// Open a position in the top riser after a drop in the primary instrument
    ///
    /// Never enters while the primary is holding or a reallocation is already open.
    pub fn try_enter<S>(
        &mut self,
        context: &EntryContext<'_>,
        snapshot: &MarketSnapshot,
        selector: &S,
    ) -> Option<ReallocationEntry>
    where
        S: TopRiserSelector + ?Sized,
    {
        if context.primary_holding || self.is_holding() {
            return None;
        }
        if context.price_change >= DROP_TRIGGER {
            return None;
        }

        let instrument = selector.select(snapshot)?;
        if instrument == context.primary_instrument {
            return None;
        }

        let Some(price) = snapshot.close_at(&instrument, context.index) else {
            tracing::warn!("Top riser {} has no price history, skipping reallocation", instrument);
            return None;
        };
        if price <= Decimal::ZERO {
            return None;
        }

        let units = self.size / price;
        self.state = ReallocationState::Holding(ReallocationPosition {
            instrument: instrument.clone(),
            entry_price: price,
            units,
            cost_basis: self.size,
        });

        Some(ReallocationEntry {
            instrument,
            units,
            price,
            size: self.size,
        })
    }
}

/// Fractional change from `previous` to `current`; zero when `previous` is not positive
pub fn price_change(previous: Decimal, current: Decimal) -> Decimal {
    if previous <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (current - previous) / previous
}
