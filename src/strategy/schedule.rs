use crate::models::Bar;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Number of projected buy entries
pub const SCHEDULE_LENGTH: usize = 7;

/// A threshold qualifies when dips reaching it occur on more than 5% of bars
const MIN_DIP_FREQUENCY: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledBuy {
    pub at: DateTime<Utc>,
    pub threshold: Decimal,
    pub estimated_price: Decimal,
}

/// Largest adjusted threshold whose dip frequency over the series exceeds 5%
pub fn select_threshold(bars: &[Bar], thresholds: &[Decimal]) -> Option<Decimal> {
    if bars.is_empty() {
        return None;
    }
    let total = Decimal::from(bars.len());

    thresholds
        .iter()
        .copied()
        .filter(|threshold| {
            let dips = bars
                .windows(2)
                .filter(|pair| {
                    let previous = pair[0].close;
                    previous > Decimal::ZERO && (previous - pair[1].close) / previous >= *threshold
                })
                .count();
            Decimal::from(dips) / total > MIN_DIP_FREQUENCY
        })
        .max()
}

/// Project upcoming buy entries spaced `cycle_hours` apart after the last bar
///
/// Empty when no threshold qualifies.
pub fn project_schedule(bars: &[Bar], thresholds: &[Decimal], cycle_hours: u32) -> Vec<ScheduledBuy> {
    let (Some(last), Some(threshold)) = (bars.last(), select_threshold(bars, thresholds)) else {
        return Vec::new();
    };

    let estimated_price = last.close * (Decimal::ONE - threshold);
    (1..=SCHEDULE_LENGTH)
        .map(|k| ScheduledBuy {
            at: last.timestamp + Duration::hours(i64::from(cycle_hours) * k as i64),
            threshold,
            estimated_price,
        })
        .collect()
}
