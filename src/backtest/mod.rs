pub mod metrics;
pub mod runner;
pub mod synthetic;

pub use metrics::RunReport;
pub use runner::BacktestRunner;
pub use synthetic::{MarketScenario, SyntheticDataGenerator};
