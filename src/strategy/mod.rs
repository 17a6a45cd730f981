// Signal annotation and forward buy scheduling
pub mod schedule;
pub mod signals;

pub use schedule::{project_schedule, ScheduledBuy};
pub use signals::{annotate, average_volatility, SignalConfig};
