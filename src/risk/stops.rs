use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fixed stop-loss and trailing-stop fractions for the primary position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopRules {
    pub stop_loss: Decimal,
    pub trailing_stop: Decimal,
}

impl StopRules {
    pub fn new(stop_loss: Decimal, trailing_stop: Decimal) -> Self {
        Self {
            stop_loss,
            trailing_stop,
        }
    }

    /// Hard stop below the entry price
    pub fn stop_price(&self, entry_price: Decimal) -> Decimal {
        entry_price * (Decimal::ONE - self.stop_loss)
    }

    /// Trailing stop measured from the previous bar's close
    pub fn trailing_price(&self, previous_close: Decimal) -> Decimal {
        previous_close * (Decimal::ONE - self.trailing_stop)
    }

    /// Exit fires once the close reaches the tighter of the two levels
    ///
    /// The tighter level is the lower one: `close <= min(stop, trailing)`.
    pub fn is_triggered(&self, entry_price: Decimal, previous_close: Decimal, close: Decimal) -> bool {
        let stop = self.stop_price(entry_price);
        let trailing = self.trailing_price(previous_close);
        close <= stop.min(trailing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_lower_level_governs() {
        // stop = 0.95, trailing = 0.99 -> exit at 0.95
        let rules = StopRules::new(dec!(0.05), dec!(0.01));
        assert!(rules.is_triggered(dec!(1.0), dec!(1.0), dec!(0.94)));

        // stop = 0.95, trailing = 0.90 -> 0.94 is still above the lower level
        let rules = StopRules::new(dec!(0.05), dec!(0.10));
        assert!(!rules.is_triggered(dec!(1.0), dec!(1.0), dec!(0.94)));
    }

    #[test]
    fn test_levels() {
        let rules = StopRules::new(dec!(0.08), dec!(0.05));
        assert_eq!(rules.stop_price(dec!(100)), dec!(92.00));
        assert_eq!(rules.trailing_price(dec!(110)), dec!(104.50));
    }

    #[test]
    fn test_zero_thresholds_trigger_on_flat_price() {
        let rules = StopRules::new(dec!(0), dec!(0));
        assert!(rules.is_triggered(dec!(1), dec!(1), dec!(1)));
        assert!(!rules.is_triggered(dec!(1), dec!(1), dec!(1.01)));
    }
}
