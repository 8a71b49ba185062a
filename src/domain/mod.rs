//! Domain types for the paper-trading ledger.
//!
//! This module provides:
//! - Lossless numeric handling via Decimal wrapper
//! - Domain primitives: UserId, ContractAddress, TradeKind
//! - Wallet, Position and Trade records with their JSON shape
//! - Market quotes consumed by the accounting engine

pub mod decimal;
pub mod primitives;
pub mod quote;
pub mod wallet;

pub use decimal::Decimal;
pub use primitives::{AddressParseError, ContractAddress, TradeKind, UserId};
pub use quote::{MarketSnapshot, TokenQuote};
pub use wallet::{sell_dust_threshold, storage_dust_threshold, Position, Trade, Wallet};
