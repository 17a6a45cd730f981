// Market data sources
pub mod klines;
pub mod synthetic;

pub use klines::BinanceKlineClient;
pub use synthetic::SyntheticProvider;

use crate::models::Bar;
use std::future::Future;

/// Source of historical close prices for one instrument
///
/// Failures are logged by the provider and surface as an empty series.
pub trait MarketDataProvider: Send + Sync {
    fn fetch_series(
        &self,
        instrument: &str,
        period_days: u32,
        interval: &str,
    ) -> impl Future<Output = Vec<Bar>> + Send;
}

/// Minutes per bar for a kline interval such as `1h` or `15m`
pub fn interval_minutes(interval: &str) -> Option<i64> {
    let split = interval.len().checked_sub(1)?;
    let (count, unit) = interval.split_at(split);
    let count: i64 = count.parse().ok()?;
    let minutes = match unit {
        "m" => 1,
        "h" => 60,
        "d" => 1440,
        "w" => 10080,
        _ => return None,
    };
    (count > 0).then_some(count * minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_minutes() {
        assert_eq!(interval_minutes("1h"), Some(60));
        assert_eq!(interval_minutes("15m"), Some(15));
        assert_eq!(interval_minutes("1d"), Some(1440));
        assert_eq!(interval_minutes("0h"), None);
        assert_eq!(interval_minutes("1y"), None);
        assert_eq!(interval_minutes(""), None);
    }
}
