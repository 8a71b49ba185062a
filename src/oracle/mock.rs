//! Mock price oracle for testing without network calls.

use super::PriceOracle;
use crate::domain::{ContractAddress, Decimal, TokenQuote};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory oracle whose prices can be changed between calls.
#[derive(Debug, Default)]
pub struct MockPriceOracle {
    base_price: RwLock<Option<Decimal>>,
    quotes: DashMap<ContractAddress, TokenQuote>,
    base_calls: AtomicUsize,
    token_calls: AtomicUsize,
}

impl MockPriceOracle {
    /// Create a mock with no prices: every lookup fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base price returned by get_base_price.
    pub fn with_base_price(self, price: Decimal) -> Self {
        *self.base_price.write() = Some(price);
        self
    }

    /// Add a quote to the mock oracle.
    pub fn with_quote(self, contract: ContractAddress, quote: TokenQuote) -> Self {
        self.quotes.insert(contract, quote);
        self
    }

    pub fn set_base_price(&self, price: Option<Decimal>) {
        *self.base_price.write() = price;
    }

    pub fn set_quote(&self, contract: ContractAddress, quote: TokenQuote) {
        self.quotes.insert(contract, quote);
    }

    pub fn remove_quote(&self, contract: &ContractAddress) {
        self.quotes.remove(contract);
    }

    /// Number of get_base_price calls so far.
    pub fn base_calls(&self) -> usize {
        self.base_calls.load(Ordering::SeqCst)
    }

    /// Number of get_token_info calls so far.
    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceOracle for MockPriceOracle {
    async fn get_base_price(&self) -> Option<Decimal> {
        self.base_calls.fetch_add(1, Ordering::SeqCst);
        *self.base_price.read()
    }

    async fn get_token_info(&self, contract: &ContractAddress) -> TokenQuote {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        self.quotes
            .get(contract)
            .map(|q| q.clone())
            .unwrap_or_default()
    }
}
