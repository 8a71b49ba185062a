//! Orchestration of wallet storage, market data and the accounting engine.

pub mod trading;

pub use trading::{ServiceError, TradingService};
