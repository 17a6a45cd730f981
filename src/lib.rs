// Core modules
pub mod api;
pub mod backtest;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod execution;
pub mod models;
pub mod regime;
pub mod risk;
pub mod strategy;

// Re-export commonly used types
pub use engine::{Ledger, LedgerRow, RunInput, SimulationEngine, SimulationReport};
pub use error::{ConfigError, GatewayError, MidasError, Result};
pub use models::*;
