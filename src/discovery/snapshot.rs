use crate::models::Bar;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Read-only series of every tracked instrument, keyed by ticker
///
/// Shared across concurrent runs behind an `Arc`; never mutated once a run starts.
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    series: BTreeMap<String, Vec<Bar>>,
}

impl MarketSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, instrument: impl Into<String>, bars: Vec<Bar>) {
        self.series.insert(instrument.into(), bars);
    }

    pub fn series(&self, instrument: &str) -> Option<&[Bar]> {
        self.series.get(instrument).map(Vec::as_slice)
    }

    /// Instruments and their series in ticker order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Bar])> {
        self.series.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Close at `index`, clamped to the last known close when the series is shorter
    ///
    /// Returns None only for unknown instruments or empty series.
    pub fn close_at(&self, instrument: &str, index: usize) -> Option<Decimal> {
        let bars = self.series.get(instrument)?;
        bars.get(index).or_else(|| bars.last()).map(|b| b.close)
    }
}

impl FromIterator<(String, Vec<Bar>)> for MarketSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, Vec<Bar>)>>(iter: I) -> Self {
        Self {
            series: iter.into_iter().collect(),
        }
    }
}
