use chrono::{TimeZone, Utc};
use solpaper::domain::{ContractAddress, Decimal, Position, Trade, TradeKind, UserId, Wallet};
use solpaper::store::WalletStore;
use std::fs;
use tempfile::TempDir;

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn setup_store() -> (WalletStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = WalletStore::open(temp_dir.path().join("wallets")).unwrap();
    (store, temp_dir)
}

fn position(name: &str, quantity: &str) -> Position {
    Position {
        display_name: name.to_string(),
        quantity: d(quantity),
        avg_cost_basis_market_cap: d("1333333.333333333333333"),
        base_spent: d("1.5"),
        base_received: d("0.25"),
    }
}

fn sample_wallet() -> Wallet {
    let mut wallet = Wallet::new();
    wallet.balance = d("12.345678901");
    wallet.realized_pnl = d("-0.42");
    wallet
        .positions
        .insert(ContractAddress::new("MintA"), position("Alpha", "1500.5"));
    wallet.history.push(Trade {
        kind: TradeKind::Sell,
        contract_address: ContractAddress::new("MintA"),
        display_name: "Alpha".to_string(),
        quantity: d("10"),
        base_amount: d("0.1"),
        unit_price_usd: d("0.00012345"),
        timestamp: Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap(),
        realized_pnl: Some(d("-0.05")),
    });
    wallet
}

#[test]
fn test_first_load_creates_and_persists_default_wallet() {
    let (store, _temp) = setup_store();
    let user = UserId::new(42);
    assert!(!store.wallet_path(user).exists());

    let wallet = store.load(user).unwrap();
    assert_eq!(wallet, Wallet::new());
    assert!(store.wallet_path(user).exists());
}

#[test]
fn test_save_then_load_round_trips_exactly() {
    let (store, _temp) = setup_store();
    let user = UserId::new(1);
    let mut wallet = sample_wallet();
    let expected = wallet.clone();

    store.save(user, &mut wallet).unwrap();
    assert_eq!(wallet, expected);

    let loaded = store.load(user).unwrap();
    assert_eq!(loaded, expected);

    // A second save of the loaded snapshot is a no-op.
    let mut again = loaded.clone();
    store.save(user, &mut again).unwrap();
    assert_eq!(store.load(user).unwrap(), loaded);
}

#[test]
fn test_save_prunes_positions_below_one() {
    let (store, _temp) = setup_store();
    let user = UserId::new(2);
    let mut wallet = sample_wallet();
    wallet
        .positions
        .insert(ContractAddress::new("MintB"), position("Dust", "0.99"));
    wallet
        .positions
        .insert(ContractAddress::new("MintC"), position("Edge", "1"));

    store.save(user, &mut wallet).unwrap();
    assert!(wallet.position(&ContractAddress::new("MintB")).is_none());

    let loaded = store.load(user).unwrap();
    assert!(loaded.position(&ContractAddress::new("MintA")).is_some());
    assert!(loaded.position(&ContractAddress::new("MintB")).is_none());
    assert!(loaded.position(&ContractAddress::new("MintC")).is_some());
    assert_eq!(loaded.history.len(), 1);
}

#[test]
fn test_record_layout_on_disk() {
    let (store, _temp) = setup_store();
    let user = UserId::new(3);
    let mut wallet = sample_wallet();
    store.save(user, &mut wallet).unwrap();

    let raw = fs::read_to_string(store.wallet_path(user)).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["balance"], "12.345678901");
    assert_eq!(json["positions"]["MintA"]["display_name"], "Alpha");
    assert_eq!(json["positions"]["MintA"]["quantity"], "1500.5");
    assert_eq!(json["realized_pnl"], "-0.42");
    assert_eq!(json["history"][0]["kind"], "sell");
    assert_eq!(json["history"][0]["realized_pnl"], "-0.05");
    assert!(raw.contains('\n'), "record should be pretty-printed");
}

#[test]
fn test_users_are_isolated() {
    let (store, _temp) = setup_store();
    let mut wallet = sample_wallet();
    store.save(UserId::new(10), &mut wallet).unwrap();

    assert_eq!(store.load(UserId::new(11)).unwrap(), Wallet::new());
    assert_eq!(store.load(UserId::new(10)).unwrap().balance, d("12.345678901"));
}
