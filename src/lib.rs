pub mod api;
pub mod config;
pub mod dialogue;
pub mod domain;
pub mod engine;
pub mod error;
pub mod oracle;
pub mod orchestration;
pub mod store;

pub use config::Config;
pub use dialogue::{Action, ChatController, DialogueState, Reply};
pub use domain::{ContractAddress, Decimal, Position, TokenQuote, Trade, TradeKind, UserId, Wallet};
pub use engine::TradeError;
pub use error::AppError;
pub use oracle::{CachedOracle, HttpPriceOracle, MockPriceOracle, PriceOracle, QuoteCache};
pub use orchestration::{ServiceError, TradingService};
pub use store::{StoreError, WalletStore};
