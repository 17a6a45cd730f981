use super::MarketSnapshot;
use rust_decimal::Decimal;

/// Picks the instrument to reallocate into
pub trait TopRiserSelector {
    /// Returns None when no instrument qualifies
    fn select(&self, snapshot: &MarketSnapshot) -> Option<String>;
}

/// Chooses the instrument with the largest percentage gain over a lookback window
///
/// Only positive gains qualify. Ties go to the first ticker in alphabetical order.
#[derive(Debug, Clone)]
pub struct LargestGainSelector {
    lookback: usize,
}

impl LargestGainSelector {
    /// # Arguments
    /// * `lookback` - Number of bars between the reference close and the latest close
    pub fn new(lookback: usize) -> Self {
        Self {
            lookback: lookback.max(1),
        }
    }
}

impl Default for LargestGainSelector {
    fn default() -> Self {
        Self::new(24)
    }
}

impl TopRiserSelector for LargestGainSelector {
    fn select(&self, snapshot: &MarketSnapshot) -> Option<String> {
        let mut best: Option<(&str, Decimal)> = None;

        for (instrument, bars) in snapshot.iter() {
            let Some(last) = bars.last() else {
                continue;
            };
            let start = bars.len().saturating_sub(self.lookback + 1);
            let reference = bars[start].close;
            if reference <= Decimal::ZERO {
                continue;
            }

            let gain = (last.close - reference) / reference;
            if gain <= Decimal::ZERO {
                continue;
            }

            match best {
                Some((_, best_gain)) if gain <= best_gain => {}
                _ => best = Some((instrument, gain)),
            }
        }

        if let Some((instrument, gain)) = best {
            tracing::debug!("Top riser: {} ({:.2}%)", instrument, gain * Decimal::ONE_HUNDRED);
        }

        best.map(|(instrument, _)| instrument.to_string())
    }
}
