// Alternate-instrument discovery for reallocation
pub mod snapshot;
pub mod top_riser;

pub use snapshot::MarketSnapshot;
pub use top_riser::{LargestGainSelector, TopRiserSelector};
