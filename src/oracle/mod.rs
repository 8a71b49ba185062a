//! Price oracle abstraction for live market data.

use crate::domain::{ContractAddress, Decimal, TokenQuote};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

pub mod cache;
pub mod http;
pub mod mock;

pub use cache::{CachedOracle, QuoteCache};
pub use http::{HttpPriceOracle, OracleEndpoints, RetryPolicy};
pub use mock::MockPriceOracle;

/// Source of base-currency and token prices.
///
/// Implementations never fail loudly: transient problems surface as `None`
/// or as an incomplete [`TokenQuote`], and callers decide whether the missing
/// figure is fatal for their computation.
#[async_trait]
pub trait PriceOracle: Send + Sync + fmt::Debug {
    /// Spot price of the base currency (SOL) in USD.
    async fn get_base_price(&self) -> Option<Decimal>;

    /// Price, market cap and display name for a token contract.
    async fn get_token_info(&self, contract: &ContractAddress) -> TokenQuote;

    /// Force the next lookup of `contract` to bypass any cache.
    fn invalidate(&self, _contract: &ContractAddress) {}

    /// Drop every cached quote.
    fn invalidate_all(&self) {}
}

#[async_trait]
impl<T: PriceOracle + ?Sized> PriceOracle for Arc<T> {
    async fn get_base_price(&self) -> Option<Decimal> {
        (**self).get_base_price().await
    }

    async fn get_token_info(&self, contract: &ContractAddress) -> TokenQuote {
        (**self).get_token_info(contract).await
    }

    fn invalidate(&self, contract: &ContractAddress) {
        (**self).invalidate(contract)
    }

    fn invalidate_all(&self) {
        (**self).invalidate_all()
    }
}

/// Error type for upstream market-data requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// Non-success HTTP status other than 429
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or missing fields)
    ParseError(String),
    /// HTTP 429 still returned after the last retry
    RateLimited,
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            OracleError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            OracleError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            OracleError::RateLimited => write!(f, "Rate limited"),
        }
    }
}

impl std::error::Error for OracleError {}
