//! Market data as consumed by the accounting engine.

use crate::domain::Decimal;
use serde::{Deserialize, Serialize};

/// Token economics resolved by the price oracle.
///
/// Every field is optional: the oracle reports partial or total failure by
/// leaving fields empty rather than by erroring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenQuote {
    /// Token price in USD.
    pub price: Option<Decimal>,
    /// `price * total_supply`, in USD.
    pub market_cap: Option<Decimal>,
    pub name: Option<String>,
}

impl TokenQuote {
    pub fn new(price: Decimal, market_cap: Decimal, name: impl Into<String>) -> Self {
        Self {
            price: Some(price),
            market_cap: Some(market_cap),
            name: Some(name.into()),
        }
    }

    /// The all-empty quote returned when nothing could be resolved.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// True when price and market cap are both known.
    pub fn is_complete(&self) -> bool {
        self.price.is_some() && self.market_cap.is_some()
    }
}

/// Prices needed to execute one trade: the base currency spot price and the
/// token quote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketSnapshot {
    /// Base currency (SOL) price in USD.
    pub base_price: Option<Decimal>,
    pub quote: TokenQuote,
}

impl MarketSnapshot {
    pub fn new(base_price: Option<Decimal>, quote: TokenQuote) -> Self {
        Self { base_price, quote }
    }
}
