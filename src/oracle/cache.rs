//! Short-lived, size-bounded quote cache and the oracle decorator using it.

use super::PriceOracle;
use crate::domain::{ContractAddress, Decimal, TokenQuote};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    quote: TokenQuote,
    inserted_at: Instant,
}

/// Time-expiring map from contract address to quote.
///
/// When full, expired entries are purged first and then the oldest entry is
/// evicted to make room.
#[derive(Debug)]
pub struct QuoteCache {
    entries: DashMap<ContractAddress, CacheEntry>,
    ttl: Duration,
    capacity: usize,
}

impl QuoteCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Fresh cached quote for `contract`, if any. Expired entries are removed.
    pub fn get(&self, contract: &ContractAddress) -> Option<TokenQuote> {
        let ttl = self.ttl;
        if self
            .entries
            .remove_if(contract, |_, e| e.inserted_at.elapsed() >= ttl)
            .is_some()
        {
            return None;
        }
        self.entries.get(contract).map(|e| e.quote.clone())
    }

    pub fn insert(&self, contract: ContractAddress, quote: TokenQuote) {
        if !self.entries.contains_key(&contract) && self.entries.len() >= self.capacity {
            self.purge_expired();
            if self.entries.len() >= self.capacity {
                self.evict_oldest();
            }
        }
        self.entries.insert(
            contract,
            CacheEntry {
                quote,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, contract: &ContractAddress) {
        self.entries.remove(contract);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn purge_expired(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, e| e.inserted_at.elapsed() < ttl);
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|e| e.value().inserted_at)
            .map(|e| e.key().clone());
        if let Some(key) = oldest {
            debug!("Evicting cached quote for {}", key);
            self.entries.remove(&key);
        }
    }
}

/// Oracle decorator that serves token quotes from a [`QuoteCache`].
///
/// Only complete quotes are cached, so a failed lookup is retried on the next
/// request. The base price is always fetched live.
#[derive(Debug)]
pub struct CachedOracle<O> {
    inner: O,
    cache: Arc<QuoteCache>,
}

impl<O: PriceOracle> CachedOracle<O> {
    pub fn new(inner: O, cache: Arc<QuoteCache>) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &Arc<QuoteCache> {
        &self.cache
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }
}

#[async_trait]
impl<O: PriceOracle> PriceOracle for CachedOracle<O> {
    async fn get_base_price(&self) -> Option<Decimal> {
        self.inner.get_base_price().await
    }

    async fn get_token_info(&self, contract: &ContractAddress) -> TokenQuote {
        if let Some(quote) = self.cache.get(contract) {
            return quote;
        }
        let quote = self.inner.get_token_info(contract).await;
        if quote.is_complete() && quote.name.is_some() {
            self.cache.insert(contract.clone(), quote.clone());
        }
        quote
    }

    fn invalidate(&self, contract: &ContractAddress) {
        self.cache.invalidate(contract);
    }

    fn invalidate_all(&self) {
        self.cache.clear();
    }
}
