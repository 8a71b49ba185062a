//! Per-user paper wallet: base balance, token positions and trade history.

use crate::domain::{ContractAddress, Decimal, TradeKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Quantity below which a position is dropped when the wallet is persisted.
pub fn storage_dust_threshold() -> Decimal {
    Decimal::one()
}

/// Quantity at or below which a position can no longer be sold, and below
/// which a remainder closes the position.
pub fn sell_dust_threshold() -> Decimal {
    Decimal::from_scaled(1, 2)
}

/// A single user's paper-trading account.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Wallet {
    /// Base currency (SOL) available to spend.
    pub balance: Decimal,
    /// Open positions keyed by token contract address.
    #[serde(default)]
    pub positions: BTreeMap<ContractAddress, Position>,
    /// Cumulative profit/loss booked on sells, in base currency.
    #[serde(default)]
    pub realized_pnl: Decimal,
    /// Append-only trade log, oldest first.
    #[serde(default)]
    pub history: Vec<Trade>,
}

impl Wallet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self, contract: &ContractAddress) -> Option<&Position> {
        self.positions.get(contract)
    }

    /// Remove every position whose quantity is below the storage dust threshold.
    ///
    /// Returns the number of positions removed.
    pub fn prune_dust(&mut self) -> usize {
        let threshold = storage_dust_threshold();
        let before = self.positions.len();
        self.positions.retain(|_, p| p.quantity >= threshold);
        before - self.positions.len()
    }
}

/// Holding of one token contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Token name as last reported by the oracle.
    pub display_name: String,
    pub quantity: Decimal,
    /// Quantity-weighted market cap at acquisition (only meaningful while quantity > 0).
    pub avg_cost_basis_market_cap: Decimal,
    /// Base currency spent acquiring this position.
    pub base_spent: Decimal,
    /// Base currency received from partial sells of this position.
    pub base_received: Decimal,
}

impl Position {
    pub fn opened(display_name: String, market_cap: Decimal) -> Self {
        Self {
            display_name,
            quantity: Decimal::zero(),
            avg_cost_basis_market_cap: market_cap,
            base_spent: Decimal::zero(),
            base_received: Decimal::zero(),
        }
    }

    /// Unrealized PNL as a percentage, measured on market cap against the cost basis.
    pub fn unrealized_pnl_pct(&self, current_market_cap: Decimal) -> Decimal {
        (current_market_cap - self.avg_cost_basis_market_cap)
            .checked_div(self.avg_cost_basis_market_cap)
            .and_then(|ratio| ratio.checked_mul(Decimal::hundred()))
            .unwrap_or_default()
    }

    /// Unrealized PNL in base currency: the percentage applied to `base_spent`.
    pub fn unrealized_pnl_base(&self, current_market_cap: Decimal) -> Decimal {
        self.unrealized_pnl_pct(current_market_cap)
            .checked_mul(self.base_spent)
            .map(|scaled| scaled / Decimal::hundred())
            .unwrap_or_default()
    }
}

/// Immutable record of an executed paper trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub kind: TradeKind,
    pub contract_address: ContractAddress,
    pub display_name: String,
    /// Tokens bought or sold.
    pub quantity: Decimal,
    /// Base currency spent (buy) or received (sell).
    pub base_amount: Decimal,
    /// Token price in USD at execution.
    pub unit_price_usd: Decimal,
    pub timestamp: DateTime<Utc>,
    /// Realized PNL of this trade in base currency; sells only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realized_pnl: Option<Decimal>,
}
