use crate::domain::{ContractAddress, MarketSnapshot, TokenQuote, UserId, Wallet};
use crate::engine::{
    self, format_balance_report, format_history, format_large_number, format_menu_header,
    sell_button_label, BuySummary, DepositSummary, SellSummary, TradeError,
    DEFAULT_HISTORY_LIMIT,
};
use crate::oracle::PriceOracle;
use crate::store::{StoreError, UserLocks, WalletStore};
use chrono::Utc;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input or business-rule rejection; nothing was written.
    #[error(transparent)]
    Trade(#[from] TradeError),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Runs each accounting operation as load → price → compute → save while
/// holding the user's lock.
#[derive(Debug)]
pub struct TradingService {
    store: WalletStore,
    oracle: Arc<dyn PriceOracle>,
    locks: UserLocks,
}

impl TradingService {
    pub fn new(store: WalletStore, oracle: Arc<dyn PriceOracle>) -> Self {
        Self {
            store,
            oracle,
            locks: UserLocks::new(),
        }
    }

    pub fn store(&self) -> &WalletStore {
        &self.store
    }

    pub fn oracle(&self) -> &Arc<dyn PriceOracle> {
        &self.oracle
    }

    /// Current wallet snapshot, created on first access.
    pub async fn wallet(&self, user: UserId) -> Result<Wallet, StoreError> {
        let _guard = self.locks.lock(user).await;
        self.load(user).await
    }

    pub async fn deposit(
        &self,
        user: UserId,
        amount_text: &str,
    ) -> Result<DepositSummary, ServiceError> {
        let _guard = self.locks.lock(user).await;
        let wallet = self.load(user).await?;

        let (next, summary) = engine::apply_deposit(&wallet, amount_text)?;
        self.save(user, next).await?;

        info!(
            "Deposit user={} amount={} balance={}",
            user, summary.amount, summary.new_balance
        );
        Ok(summary)
    }

    pub async fn buy(
        &self,
        user: UserId,
        contract: &ContractAddress,
        amount_text: &str,
    ) -> Result<BuySummary, ServiceError> {
        let _guard = self.locks.lock(user).await;
        let wallet = self.load(user).await?;

        let market = self.market(contract).await;
        let (next, summary) =
            engine::apply_buy(&wallet, contract, amount_text, &market, Utc::now())?;
        self.save(user, next).await?;

        info!(
            "Buy user={} contract={} spent={} tokens={}",
            user, contract, summary.base_spent, summary.tokens
        );
        Ok(summary)
    }

    pub async fn sell(
        &self,
        user: UserId,
        contract: &ContractAddress,
        amount_text: &str,
    ) -> Result<SellSummary, ServiceError> {
        let _guard = self.locks.lock(user).await;
        let wallet = self.load(user).await?;

        // No position means no trade; skip the network round trip.
        let market = if wallet.position(contract).is_some() {
            self.market(contract).await
        } else {
            MarketSnapshot::default()
        };
        let (next, summary) =
            engine::apply_sell(&wallet, contract, amount_text, &market, Utc::now())?;
        self.save(user, next).await?;

        info!(
            "Sell user={} contract={} tokens={} received={} pnl={}",
            user, contract, summary.tokens, summary.base_received, summary.trade_pnl
        );
        Ok(summary)
    }

    /// Welcome screen text.
    pub async fn menu_header(&self, user: UserId) -> Result<String, StoreError> {
        let wallet = self.wallet(user).await?;
        let base_price = self.oracle.get_base_price().await;
        Ok(format_menu_header(&wallet, base_price))
    }

    /// Balance screen; `refresh` drops every cached quote first.
    pub async fn balance_report(&self, user: UserId, refresh: bool) -> Result<String, StoreError> {
        if refresh {
            self.oracle.invalidate_all();
        }
        let wallet = self.wallet(user).await?;
        let (base_price, quotes) =
            futures::join!(self.oracle.get_base_price(), self.quotes_for(&wallet));
        Ok(format_balance_report(&wallet, base_price, &quotes))
    }

    pub async fn history(&self, user: UserId) -> Result<String, StoreError> {
        let wallet = self.wallet(user).await?;
        Ok(format_history(&wallet, DEFAULT_HISTORY_LIMIT))
    }

    /// `(contract, button label)` for every position that can be priced now.
    pub async fn sellable_positions(
        &self,
        user: UserId,
    ) -> Result<Vec<(ContractAddress, String)>, StoreError> {
        let wallet = self.wallet(user).await?;
        let quotes = self.quotes_for(&wallet).await;
        Ok(wallet
            .positions
            .iter()
            .filter_map(|(contract, position)| {
                let quote = quotes.get(contract)?;
                sell_button_label(position, quote).map(|label| (contract.clone(), label))
            })
            .collect())
    }

    /// Prompt for the sell amount, or `None` when the position is gone or
    /// cannot be priced.
    pub async fn sell_prompt(
        &self,
        user: UserId,
        contract: &ContractAddress,
    ) -> Result<Option<String>, StoreError> {
        let wallet = self.wallet(user).await?;
        let Some(position) = wallet.position(contract) else {
            return Ok(None);
        };
        let quote = self.oracle.get_token_info(contract).await;
        if quote.price.is_none() {
            return Ok(None);
        }
        let name = quote.name.as_deref().unwrap_or(&position.display_name);
        Ok(Some(format!(
            "Token: {}\nBalance: {}\nEnter amount to sell (tokens or percentage, e.g. 50%):",
            name,
            format_large_number(position.quantity)
        )))
    }

    pub async fn lookup_token(&self, contract: &ContractAddress) -> TokenQuote {
        self.oracle.get_token_info(contract).await
    }

    // Store calls are synchronous file I/O; run them on the blocking pool.
    async fn load(&self, user: UserId) -> Result<Wallet, StoreError> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.load(user)).await?
    }

    async fn save(&self, user: UserId, mut wallet: Wallet) -> Result<Wallet, StoreError> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.save(user, &mut wallet).map(|_| wallet)).await?
    }

    async fn market(&self, contract: &ContractAddress) -> MarketSnapshot {
        let (base_price, quote) = futures::join!(
            self.oracle.get_base_price(),
            self.oracle.get_token_info(contract)
        );
        MarketSnapshot::new(base_price, quote)
    }

    async fn quotes_for(&self, wallet: &Wallet) -> HashMap<ContractAddress, TokenQuote> {
        let lookups = wallet.positions.keys().map(|contract| async move {
            (contract.clone(), self.oracle.get_token_info(contract).await)
        });
        join_all(lookups).await.into_iter().collect()
    }
}
