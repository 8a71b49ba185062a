//! Read-only renderings of a wallet snapshot for the chat surface.

use crate::domain::{ContractAddress, Decimal, Position, TokenQuote, TradeKind, Wallet};
use std::collections::HashMap;
use std::fmt::Write;

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Two-decimal rendering with a k/M/B suffix for values at or above each
/// threshold. Negative values never take a suffix.
pub fn format_large_number(value: Decimal) -> String {
    let billion = Decimal::from_i64(1_000_000_000);
    let million = Decimal::from_i64(1_000_000);
    let thousand = Decimal::from_i64(1_000);

    if value >= billion {
        format!("{}B", (value / billion).to_fixed(2))
    } else if value >= million {
        format!("{}M", (value / million).to_fixed(2))
    } else if value >= thousand {
        format!("{}k", (value / thousand).to_fixed(2))
    } else {
        value.to_fixed(2)
    }
}

fn signed_fixed(value: Decimal) -> String {
    if value.is_negative() {
        value.to_fixed(2)
    } else {
        format!("+{}", value.to_fixed(2))
    }
}

/// ` ($x.xx)` suffix for a base amount, or nothing without a price (or when
/// the product does not fit).
pub(crate) fn usd(amount: Decimal, base_price: Option<Decimal>) -> String {
    match base_price.and_then(|price| amount.checked_mul(price)) {
        Some(value) => format!(" (${})", value.to_fixed(2)),
        None => String::new(),
    }
}

/// Welcome screen shown above the main menu.
pub fn format_menu_header(wallet: &Wallet, base_price: Option<Decimal>) -> String {
    format!(
        "🚀 Welcome to the SOL Paper Trading Bot! 🚀\n\n\
         SOL Balance: {} SOL{}\n\
         PNL wallet: {} SOL{}\n\n\
         Select an option below to get started:",
        wallet.balance.to_fixed(2),
        usd(wallet.balance, base_price),
        signed_fixed(wallet.realized_pnl),
        usd(wallet.realized_pnl, base_price),
    )
}

/// Full balance screen: base balance, realized PNL and every position marked
/// against `quotes`.
///
/// Positions without a complete quote are listed with their stored name and
/// quantity only.
pub fn format_balance_report(
    wallet: &Wallet,
    base_price: Option<Decimal>,
    quotes: &HashMap<ContractAddress, TokenQuote>,
) -> String {
    let mut out = String::from("🚀 Your Wallet Balance 🚀\n\n");
    let _ = writeln!(
        out,
        "SOL Balance: {} SOL{}\n",
        wallet.balance.to_fixed(2),
        usd(wallet.balance, base_price)
    );

    let pnl = wallet.realized_pnl;
    let marker = if pnl.is_positive() {
        "🟢"
    } else if pnl.is_negative() {
        "🔴"
    } else {
        ""
    };
    let pnl_text = if pnl.is_zero() {
        pnl.to_fixed(2)
    } else {
        signed_fixed(pnl)
    };
    let _ = writeln!(out, "General PNL: {} SOL{}\n", pnl_text, marker);

    if wallet.positions.is_empty() {
        out.push_str("No tokens in your wallet.\n");
        return out;
    }

    out.push_str("📊 Tokens in your wallet:\n");
    for (contract, position) in &wallet.positions {
        let quote = quotes.get(contract).filter(|q| q.is_complete());
        match quote.and_then(|q| q.market_cap) {
            Some(market_cap) => {
                let name = quote
                    .and_then(|q| q.name.as_deref())
                    .unwrap_or(&position.display_name);
                write_position(&mut out, contract, name, position, market_cap);
            }
            None => {
                let _ = write!(
                    out,
                    "\n➤ Token Name: {}\n   {}\n   Balance: {}\n   Data unavailable due to API limits.\n",
                    position.display_name,
                    contract,
                    format_large_number(position.quantity),
                );
            }
        }
    }
    out
}

fn write_position(
    out: &mut String,
    contract: &ContractAddress,
    name: &str,
    position: &Position,
    market_cap: Decimal,
) {
    let pct = position.unrealized_pnl_pct(market_cap);
    let base = position.unrealized_pnl_base(market_cap);
    let _ = write!(
        out,
        "\n➤ Token Name: {}\n   {}\n   Balance: {}\n   Purchase Market Cap: ${}\n   Current Market Cap: ${}\n   Buys {} SOL\n   Sells {} SOL\n",
        name,
        contract,
        format_large_number(position.quantity),
        format_large_number(position.avg_cost_basis_market_cap),
        format_large_number(market_cap),
        position.base_spent,
        position.base_received,
    );
    if pct.is_positive() {
        let _ = writeln!(out, "   PNL: +{}% (+{} SOL)🟢", pct.to_fixed(2), base.to_fixed(2));
    } else {
        let _ = writeln!(out, "   PNL: {}% ({} SOL)🔴", pct.to_fixed(2), base.to_fixed(2));
    }
}

/// Last `limit` trades, oldest first.
pub fn format_history(wallet: &Wallet, limit: usize) -> String {
    if wallet.history.is_empty() {
        return "No transaction history available.".to_string();
    }

    let start = wallet.history.len().saturating_sub(limit);
    let mut out = String::from("📜 Transaction History 📜\n\n");
    for trade in &wallet.history[start..] {
        let _ = write!(
            out,
            "[{}] {} {}\nQuantity: {}\nSOL: {} @ ${}\n",
            trade.timestamp.format("%Y-%m-%d %H:%M:%S"),
            trade.kind.label(),
            trade.display_name,
            format_large_number(trade.quantity),
            trade.base_amount.to_fixed(2),
            trade.unit_price_usd.to_fixed(4),
        );
        if trade.kind == TradeKind::Sell {
            let pnl = trade.realized_pnl.unwrap_or_default();
            let _ = writeln!(out, "PNL: {} SOL", signed_fixed(pnl));
        }
        out.push('\n');
    }
    out
}

/// Button label for the sell picker, or `None` when the position cannot be
/// priced right now.
pub fn sell_button_label(position: &Position, quote: &TokenQuote) -> Option<String> {
    if !quote.is_complete() {
        return None;
    }
    let market_cap = quote.market_cap?;
    Some(format!(
        "{} ({}) {} SOL",
        position.display_name,
        format_large_number(position.quantity),
        signed_fixed(position.unrealized_pnl_base(market_cap)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Trade;
    use chrono::{TimeZone, Utc};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn position() -> Position {
        Position {
            display_name: "Bonk".to_string(),
            quantity: d("1500"),
            avg_cost_basis_market_cap: d("1000000"),
            base_spent: d("2"),
            base_received: Decimal::zero(),
        }
    }

    fn trade(kind: TradeKind, n: i64) -> Trade {
        Trade {
            kind,
            contract_address: ContractAddress::new("Mint1"),
            display_name: format!("Token{}", n),
            quantity: d("100"),
            base_amount: d("1"),
            unit_price_usd: d("0.5"),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, n as u32).unwrap(),
            realized_pnl: match kind {
                TradeKind::Sell => Some(d("0.25")),
                TradeKind::Buy => None,
            },
        }
    }

    #[test]
    fn test_format_large_number_suffixes() {
        assert_eq!(format_large_number(d("2500000000")), "2.50B");
        assert_eq!(format_large_number(d("1000000000")), "1.00B");
        assert_eq!(format_large_number(d("1234567")), "1.23M");
        assert_eq!(format_large_number(d("1500")), "1.50k");
        assert_eq!(format_large_number(d("999.999")), "1000.00");
        assert_eq!(format_large_number(d("42")), "42.00");
        assert_eq!(format_large_number(d("-2500")), "-2500.00");
        assert_eq!(format_large_number(d("-2500000")), "-2500000.00");
        assert_eq!(format_large_number(Decimal::zero()), "0.00");
    }

    #[test]
    fn test_format_history_empty() {
        assert_eq!(
            format_history(&Wallet::new(), DEFAULT_HISTORY_LIMIT),
            "No transaction history available."
        );
    }

    #[test]
    fn test_format_history_keeps_last_entries_in_order() {
        let mut wallet = Wallet::new();
        for n in 0..12 {
            wallet.history.push(trade(TradeKind::Buy, n));
        }
        let text = format_history(&wallet, DEFAULT_HISTORY_LIMIT);
        assert_eq!(text.matches("] BUY ").count(), 10);
        assert!(!text.contains("Token0\n"));
        assert!(!text.contains("Token1\n"));
        let first = text.find("Token2\n").unwrap();
        let last = text.find("Token11\n").unwrap();
        assert!(first < last);
    }

    #[test]
    fn test_format_history_sell_line() {
        let mut wallet = Wallet::new();
        wallet.history.push(trade(TradeKind::Sell, 5));
        let text = format_history(&wallet, DEFAULT_HISTORY_LIMIT);
        assert!(text.contains("[2024-01-01 00:00:05] SELL Token5\n"));
        assert!(text.contains("Quantity: 100.00\n"));
        assert!(text.contains("SOL: 1.00 @ $0.5000\n"));
        assert!(text.contains("PNL: +0.25 SOL\n"));
    }

    #[test]
    fn test_balance_report_marks_positions() {
        let mut wallet = Wallet::new();
        wallet.balance = d("3");
        wallet.realized_pnl = d("-0.5");
        wallet.positions.insert(ContractAddress::new("Mint1"), position());
        wallet.positions.insert(ContractAddress::new("Mint2"), position());

        let mut quotes = HashMap::new();
        quotes.insert(
            ContractAddress::new("Mint1"),
            TokenQuote::new(d("0.002"), d("1500000"), "Bonk Inu"),
        );

        let text = format_balance_report(&wallet, Some(d("100")), &quotes);
        assert!(text.contains("SOL Balance: 3.00 SOL ($300.00)"));
        assert!(text.contains("General PNL: -0.50 SOL🔴"));
        assert!(text.contains("Token Name: Bonk Inu"));
        assert!(text.contains("Purchase Market Cap: $1.00M"));
        assert!(text.contains("Current Market Cap: $1.50M"));
        assert!(text.contains("PNL: +50.00% (+1.00 SOL)🟢"));
        assert!(text.contains("Mint2\n   Balance: 1.50k\n   Data unavailable due to API limits."));
    }

    #[test]
    fn test_balance_report_empty_wallet_without_base_price() {
        let text = format_balance_report(&Wallet::new(), None, &HashMap::new());
        assert!(text.contains("SOL Balance: 0.00 SOL\n"));
        assert!(text.contains("General PNL: 0.00 SOL\n"));
        assert!(text.ends_with("No tokens in your wallet.\n"));
    }

    #[test]
    fn test_menu_header() {
        let mut wallet = Wallet::new();
        wallet.balance = d("1.5");
        wallet.realized_pnl = d("0.25");
        let text = format_menu_header(&wallet, Some(d("200")));
        assert!(text.contains("SOL Balance: 1.50 SOL ($300.00)"));
        assert!(text.contains("PNL wallet: +0.25 SOL ($50.00)"));
    }

    #[test]
    fn test_sell_button_label() {
        let label = sell_button_label(
            &position(),
            &TokenQuote::new(d("0.001"), d("500000"), "Bonk"),
        );
        assert_eq!(label.as_deref(), Some("Bonk (1.50k) -1.00 SOL"));
        assert_eq!(sell_button_label(&position(), &TokenQuote::unavailable()), None);
    }
}
