// Risk management module
pub mod stops;

pub use stops::StopRules;
