//! Pure computation engine for the paper-trading ledger.
//!
//! Every operation takes a wallet snapshot plus market data and returns a new
//! snapshot; nothing here performs I/O.

use crate::domain::{ContractAddress, Decimal};
use thiserror::Error;

pub mod accounting;
pub mod report;

pub use accounting::{
    apply_buy, apply_deposit, apply_sell, BuySummary, DepositSummary, SellAmount, SellOutcome,
    SellSummary,
};
pub use report::{
    format_balance_report, format_history, format_large_number, format_menu_header,
    sell_button_label, DEFAULT_HISTORY_LIMIT,
};

/// Business-rule and input failures of a trade.
///
/// All variants are recoverable: the wallet is left untouched and the
/// `Display` text is suitable for showing to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TradeError {
    #[error("Invalid amount. Please enter a positive number.")]
    InvalidAmount,
    #[error("Percentage must be between 0 and 100.")]
    PercentageOutOfRange,
    #[error("Not enough SOL in your wallet (requested {requested}, available {available}).")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },
    #[error("Not enough tokens in your wallet.")]
    InsufficientQuantity,
    #[error("No tokens found for contract address: {0}")]
    NoSuchPosition(ContractAddress),
    #[error("Unable to fetch data for token with contract address: {0}. Try again later.")]
    QuoteUnavailable(ContractAddress),
    #[error("Unable to fetch Solana price. Try again later.")]
    BasePriceUnavailable,
}
