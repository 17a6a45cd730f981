use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

/// Sale proceeds per minted token
pub const MINT_DENOMINATION: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// Where a realized profit came from; only primary profits are cascaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfitSource {
    Primary,
    Reallocation,
}

/// How one realized profit event is split across destinations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfitSplit {
    /// Booked as the bar's profit
    pub booked: Decimal,
    /// Credited back to uncommitted capital
    pub capital_credit: Decimal,
    pub safety_contribution: Decimal,
    pub minted: u64,
}

/// Profit distribution for one run's regime
#[derive(Debug, Clone, Copy)]
pub struct ProfitPolicy {
    pub cascade_ratio: Decimal,
    pub safety_ratio: Decimal,
}

impl ProfitPolicy {
    pub fn new(cascade_ratio: Decimal, safety_ratio: Decimal) -> Self {
        Self {
            cascade_ratio,
            safety_ratio,
        }
    }

    /// Split a realized profit
    ///
    /// Primary exits book `profit * cascade_ratio` and credit `sale_value - booked`, which
    /// leaves `profit - booked` outside capital, safety fund and mint counter.
    /// Reallocation exits book the full profit and credit the full sale value.
    pub fn split(&self, source: ProfitSource, profit: Decimal, sale_value: Decimal) -> ProfitSplit {
        let booked = match source {
            ProfitSource::Primary => profit * self.cascade_ratio,
            ProfitSource::Reallocation => profit,
        };

        let capital_credit = match source {
            ProfitSource::Primary => sale_value - booked,
            ProfitSource::Reallocation => sale_value,
        };

        // Losses never debit the fund
        let safety_contribution = profit.max(Decimal::ZERO) * self.safety_ratio;

        ProfitSplit {
            booked,
            capital_credit,
            safety_contribution,
            minted: minted_tokens(sale_value),
        }
    }
}

/// `floor(sale_value / 1000)`; zero for non-positive proceeds
pub fn minted_tokens(sale_value: Decimal) -> u64 {
    if sale_value <= Decimal::ZERO {
        return 0;
    }
    (sale_value / MINT_DENOMINATION).floor().to_u64().unwrap_or(u64::MAX)
}

/// Run-wide accumulators fed by every realized profit
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Treasury {
    pub safety_fund: Decimal,
    pub minted: u64,
}

impl Treasury {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absorb(&mut self, split: &ProfitSplit) {
        self.safety_fund += split.safety_contribution;
        self.minted = self.minted.saturating_add(split.minted);
    }
}
