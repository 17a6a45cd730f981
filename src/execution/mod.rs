// Order submission: the gateway seam plus paper and live implementations
pub mod binance;
pub mod gateway;
pub mod paper;

pub use binance::{BinanceGateway, Credentials};
pub use gateway::{dispatch_orders, DispatchOutcome, ExchangeGateway, OrderConfirmation, OrderRequest};
pub use paper::PaperGateway;
