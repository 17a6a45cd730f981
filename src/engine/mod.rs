// Single-pass simulation: primary and reallocation state machines over one bar series
pub mod ledger;
pub mod primary;
pub mod profit;
pub mod reallocation;
pub mod runner;

pub use ledger::{Ledger, LedgerRow, ReallocSignal};
pub use primary::{OpenPosition, PrimaryMachine};
pub use profit::{ProfitPolicy, ProfitSource, ProfitSplit, Treasury};
pub use reallocation::ReallocationMachine;
pub use runner::{RunInput, SimulationEngine, SimulationReport, TradeStats};
