//! Position accounting: deposits, buys and sells against a wallet snapshot.
//!
//! Cost basis is tracked as a quantity-weighted average *market cap* rather
//! than a per-token price. Realized PNL on a sell allocates `base_spent`
//! proportionally to the fraction of the position sold.

use super::report::{format_large_number, usd};
use super::TradeError;
use crate::domain::{
    sell_dust_threshold, ContractAddress, Decimal, MarketSnapshot, Position, Trade, TradeKind,
    Wallet,
};
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Outcome of a successful deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositSummary {
    pub amount: Decimal,
    pub new_balance: Decimal,
}

impl fmt::Display for DepositSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Added {} SOL to your wallet.", self.amount)
    }
}

/// Outcome of a successful buy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuySummary {
    pub display_name: String,
    pub market_cap: Decimal,
    /// Tokens acquired before rounding.
    pub tokens: Decimal,
    pub base_spent: Decimal,
    pub base_price: Decimal,
}

impl fmt::Display for BuySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "You have purchased:\n\
             Token Name: {}\n\
             Market Cap: ${}\n\
             Number of tokens: {}\n\
             SOL used: {} SOL{}.",
            self.display_name,
            format_large_number(self.market_cap),
            format_large_number(self.tokens),
            self.base_spent,
            usd(self.base_spent, Some(self.base_price)),
        )
    }
}

/// How a sell left the position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SellOutcome {
    /// The whole position was sold and removed.
    Closed,
    /// Part of the position remains (unless `dust_removed`).
    ///
    /// `pnl_pct` and `pnl_base` compare the proceeds against the position's
    /// entire `base_spent`, not the proportional lot; they are display-only.
    Partial {
        pnl_pct: Decimal,
        pnl_base: Decimal,
        dust_removed: bool,
    },
}

/// Outcome of a successful sell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellSummary {
    pub display_name: String,
    pub tokens: Decimal,
    pub base_received: Decimal,
    pub base_price: Decimal,
    /// Realized PNL booked by this trade.
    pub trade_pnl: Decimal,
    pub outcome: SellOutcome,
}

impl fmt::Display for SellSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let usd = usd(self.base_received, Some(self.base_price));
        match &self.outcome {
            SellOutcome::Closed => write!(
                f,
                "You have sold all {} tokens ({}) for {} SOL{}.",
                self.display_name,
                self.tokens.to_fixed(2),
                self.base_received.to_fixed(2),
                usd
            ),
            SellOutcome::Partial {
                pnl_pct,
                pnl_base,
                dust_removed,
            } => {
                writeln!(
                    f,
                    "You have sold {} of {} tokens for {} SOL{}.",
                    self.tokens.to_fixed(2),
                    self.display_name,
                    self.base_received.to_fixed(2),
                    usd
                )?;
                let verb = if pnl_pct.is_negative() { "lost" } else { "made" };
                write!(
                    f,
                    "You {} {} ({}%) SOL.",
                    verb,
                    format_large_number(*pnl_base),
                    pnl_pct.to_fixed(2)
                )?;
                if *dust_removed {
                    write!(f, "\nRemaining quantity too small, token removed from wallet.")?;
                }
                Ok(())
            }
        }
    }
}

/// User-entered sell size: an absolute token quantity or a share of holdings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SellAmount {
    Tokens(Decimal),
    /// Percentage of the current quantity, e.g. `50%`.
    Percent(Decimal),
}

impl FromStr for SellAmount {
    type Err = TradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains('%') {
            let pct = Decimal::from_str_canonical(&s.replace('%', ""))
                .map_err(|_| TradeError::InvalidAmount)?;
            Ok(SellAmount::Percent(pct))
        } else {
            Decimal::from_str_canonical(s)
                .map(SellAmount::Tokens)
                .map_err(|_| TradeError::InvalidAmount)
        }
    }
}

impl SellAmount {
    /// Resolve to a token count against the current holding.
    ///
    /// The result is always in `(0.01, quantity]`.
    pub fn resolve(self, quantity: Decimal) -> Result<Decimal, TradeError> {
        let min = sell_dust_threshold();
        match self {
            SellAmount::Percent(pct) => {
                if pct.is_negative() || pct > Decimal::hundred() {
                    return Err(TradeError::PercentageOutOfRange);
                }
                let amount = pct / Decimal::hundred() * quantity;
                if amount <= min {
                    return Err(TradeError::InvalidAmount);
                }
                Ok(amount)
            }
            SellAmount::Tokens(amount) => {
                if amount <= min {
                    return Err(TradeError::InvalidAmount);
                }
                if amount > quantity {
                    return Err(TradeError::InsufficientQuantity);
                }
                Ok(amount)
            }
        }
    }
}

fn parse_positive(text: &str) -> Result<Decimal, TradeError> {
    let amount = Decimal::from_str_canonical(text).map_err(|_| TradeError::InvalidAmount)?;
    if !amount.is_positive() {
        return Err(TradeError::InvalidAmount);
    }
    Ok(amount)
}

// Zero prices count as missing.
fn known(value: Option<Decimal>) -> Option<Decimal> {
    value.filter(Decimal::is_positive)
}

/// Quantity-weighted average of the existing cost basis and a new lot.
///
/// A flat position (`held == 0`) takes the lot's market cap directly; the
/// previous cost basis is stale in that case and must not be weighted in.
/// Returns `None` when an intermediate product overflows.
pub fn weighted_cost_basis(
    basis: Decimal,
    held: Decimal,
    lot_market_cap: Decimal,
    lot_quantity: Decimal,
) -> Option<Decimal> {
    if held.is_zero() {
        return Some(lot_market_cap);
    }
    let weighted = basis
        .checked_mul(held)?
        .checked_add(lot_market_cap.checked_mul(lot_quantity)?)?;
    weighted.checked_div(held.checked_add(lot_quantity)?)
}

/// Credit the base balance.
pub fn apply_deposit(
    wallet: &Wallet,
    amount_text: &str,
) -> Result<(Wallet, DepositSummary), TradeError> {
    let amount = parse_positive(amount_text)?;

    let mut next = wallet.clone();
    next.balance = next
        .balance
        .checked_add(amount)
        .ok_or(TradeError::InvalidAmount)?;

    let summary = DepositSummary {
        amount,
        new_balance: next.balance,
    };
    Ok((next, summary))
}

/// Spend `amount_text` base currency on `contract` at the given market.
///
/// Tokens acquired are `(base_price / token_price) * amount_base`; the held
/// quantity grows by that figure rounded to 2 decimals.
pub fn apply_buy(
    wallet: &Wallet,
    contract: &ContractAddress,
    amount_text: &str,
    market: &MarketSnapshot,
    at: DateTime<Utc>,
) -> Result<(Wallet, BuySummary), TradeError> {
    let base_price = known(market.base_price).ok_or(TradeError::BasePriceUnavailable)?;
    let (token_price, market_cap) = match (known(market.quote.price), known(market.quote.market_cap))
    {
        (Some(price), Some(cap)) => (price, cap),
        _ => return Err(TradeError::QuoteUnavailable(contract.clone())),
    };

    let amount_base = parse_positive(amount_text)?;
    if amount_base > wallet.balance {
        return Err(TradeError::InsufficientBalance {
            requested: amount_base,
            available: wallet.balance,
        });
    }

    let tokens = base_price
        .checked_div(token_price)
        .and_then(|ratio| ratio.checked_mul(amount_base))
        .ok_or(TradeError::InvalidAmount)?;
    let credited = tokens.round_dp(2);
    if !credited.is_positive() {
        return Err(TradeError::InvalidAmount);
    }

    let display_name = market
        .quote
        .name
        .clone()
        .or_else(|| wallet.position(contract).map(|p| p.display_name.clone()))
        .unwrap_or_else(|| contract.to_string());

    let mut next = wallet.clone();
    next.balance -= amount_base;

    let position = next
        .positions
        .entry(contract.clone())
        .or_insert_with(|| Position::opened(display_name.clone(), market_cap));
    position.avg_cost_basis_market_cap = weighted_cost_basis(
        position.avg_cost_basis_market_cap,
        position.quantity,
        market_cap,
        tokens,
    )
    .ok_or(TradeError::InvalidAmount)?;
    position.quantity = position
        .quantity
        .checked_add(credited)
        .ok_or(TradeError::InvalidAmount)?;
    position.base_spent = position
        .base_spent
        .checked_add(amount_base)
        .ok_or(TradeError::InvalidAmount)?;
    position.display_name = display_name.clone();

    next.history.push(Trade {
        kind: TradeKind::Buy,
        contract_address: contract.clone(),
        display_name: display_name.clone(),
        quantity: credited,
        base_amount: amount_base,
        unit_price_usd: token_price,
        timestamp: at,
        realized_pnl: None,
    });

    let summary = BuySummary {
        display_name,
        market_cap,
        tokens,
        base_spent: amount_base,
        base_price,
    };
    Ok((next, summary))
}

/// Sell part or all of the position in `contract`.
///
/// Proceeds are `(token_price / base_price) * amount_tokens`. The trade's
/// realized PNL is the proceeds minus the share of `base_spent` matching the
/// fraction of the position sold.
pub fn apply_sell(
    wallet: &Wallet,
    contract: &ContractAddress,
    amount_text: &str,
    market: &MarketSnapshot,
    at: DateTime<Utc>,
) -> Result<(Wallet, SellSummary), TradeError> {
    let position = wallet
        .position(contract)
        .ok_or_else(|| TradeError::NoSuchPosition(contract.clone()))?;
    let quantity = position.quantity;
    let min = sell_dust_threshold();
    if quantity <= min {
        return Err(TradeError::InsufficientQuantity);
    }

    let token_price =
        known(market.quote.price).ok_or_else(|| TradeError::QuoteUnavailable(contract.clone()))?;
    let amount_tokens = amount_text.parse::<SellAmount>()?.resolve(quantity)?;
    let base_price = known(market.base_price).ok_or(TradeError::BasePriceUnavailable)?;

    let amount_base = token_price
        .checked_div(base_price)
        .and_then(|ratio| ratio.checked_mul(amount_tokens))
        .ok_or(TradeError::InvalidAmount)?;
    let proportion = amount_tokens / quantity;
    let trade_pnl = amount_base - position.base_spent * proportion;

    let display_name = market
        .quote
        .name
        .clone()
        .unwrap_or_else(|| position.display_name.clone());

    let mut next = wallet.clone();
    next.realized_pnl = next
        .realized_pnl
        .checked_add(trade_pnl)
        .ok_or(TradeError::InvalidAmount)?;
    next.balance = next
        .balance
        .checked_add(amount_base)
        .ok_or(TradeError::InvalidAmount)?;

    let outcome = if quantity - amount_tokens < min {
        next.positions.remove(contract);
        SellOutcome::Closed
    } else {
        let base_spent = position.base_spent;
        let pnl_pct = (amount_base - base_spent)
            .checked_div(base_spent)
            .and_then(|ratio| ratio.checked_mul(Decimal::hundred()))
            .unwrap_or_default();
        let pnl_base = if base_spent.is_zero() {
            Decimal::zero()
        } else {
            amount_base - base_spent
        };

        let remaining = quantity - amount_tokens;
        let dust_removed = remaining < min;
        if dust_removed {
            next.positions.remove(contract);
        } else if let Some(held) = next.positions.get_mut(contract) {
            held.quantity = remaining;
            held.base_received = held
                .base_received
                .checked_add(amount_base)
                .ok_or(TradeError::InvalidAmount)?;
            held.display_name = display_name.clone();
        }

        SellOutcome::Partial {
            pnl_pct,
            pnl_base,
            dust_removed,
        }
    };

    next.history.push(Trade {
        kind: TradeKind::Sell,
        contract_address: contract.clone(),
        display_name: display_name.clone(),
        quantity: amount_tokens,
        base_amount: amount_base,
        unit_price_usd: token_price,
        timestamp: at,
        realized_pnl: Some(trade_pnl),
    });

    let summary = SellSummary {
        display_name,
        tokens: amount_tokens,
        base_received: amount_base,
        base_price,
        trade_pnl,
        outcome,
    };
    Ok((next, summary))
}
