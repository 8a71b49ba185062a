use futures::future::join_all;
use solpaper::domain::{ContractAddress, Decimal, TokenQuote, UserId};
use solpaper::engine::TradeError;
use solpaper::oracle::{CachedOracle, MockPriceOracle, PriceOracle, QuoteCache};
use solpaper::orchestration::{ServiceError, TradingService};
use solpaper::store::WalletStore;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_test::assert_ok;

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn bonk() -> ContractAddress {
    ContractAddress::new("DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263")
}

fn wif() -> ContractAddress {
    ContractAddress::new("EKpQGSJtjMFqKZ9KQanSqYXRcF8fBopzLHYxdM65zcjm")
}

fn priced_oracle() -> Arc<MockPriceOracle> {
    Arc::new(
        MockPriceOracle::new()
            .with_base_price(d("100"))
            .with_quote(bonk(), TokenQuote::new(d("1"), d("1000000"), "Bonk")),
    )
}

fn setup_service(oracle: Arc<dyn PriceOracle>) -> (Arc<TradingService>, WalletStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = WalletStore::open(temp_dir.path()).unwrap();
    let service = Arc::new(TradingService::new(store.clone(), oracle));
    (service, store, temp_dir)
}

#[tokio::test]
async fn test_deposit_buy_sell_are_persisted() {
    let (service, store, _temp) = setup_service(priced_oracle());
    let user = UserId::new(1);

    assert_ok!(service.deposit(user, "5").await);
    let bought = service.buy(user, &bonk(), "2").await.unwrap();
    assert_eq!(bought.tokens, d("200"));

    let sold = service.sell(user, &bonk(), "50%").await.unwrap();
    assert_eq!(sold.tokens, d("100"));
    assert_eq!(sold.base_received, d("1"));

    let wallet = store.load(user).unwrap();
    assert_eq!(wallet.balance, d("4"));
    assert_eq!(wallet.position(&bonk()).unwrap().quantity, d("100"));
    assert_eq!(wallet.history.len(), 2);
}

#[tokio::test]
async fn test_concurrent_deposits_are_all_applied() {
    let (service, store, _temp) = setup_service(priced_oracle());
    let user = UserId::new(2);

    let tasks = (0..20).map(|_| {
        let service = service.clone();
        tokio::spawn(async move { service.deposit(user, "1").await })
    });
    for result in join_all(tasks).await {
        assert_ok!(result.unwrap());
    }

    assert_eq!(store.load(user).unwrap().balance, d("20"));
}

#[tokio::test]
async fn test_double_full_sell_books_once() {
    let (service, store, _temp) = setup_service(priced_oracle());
    let user = UserId::new(3);
    service.deposit(user, "1").await.unwrap();
    service.buy(user, &bonk(), "1").await.unwrap();

    let (mint_a, mint_b) = (bonk(), bonk());
    let (first, second) = tokio::join!(
        service.sell(user, &mint_a, "100%"),
        service.sell(user, &mint_b, "100%")
    );
    let successes = [first.is_ok(), second.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(successes, 1);

    let wallet = store.load(user).unwrap();
    assert_eq!(wallet.balance, d("1"));
    assert_eq!(wallet.history.len(), 2);
}

#[tokio::test]
async fn test_oracle_failure_leaves_wallet_untouched() {
    let oracle = priced_oracle();
    oracle.set_base_price(None);
    let (service, store, _temp) = setup_service(oracle);
    let user = UserId::new(4);
    service.deposit(user, "3").await.unwrap();
    let before = std::fs::read(store.wallet_path(user)).unwrap();

    match service.buy(user, &bonk(), "1").await {
        Err(ServiceError::Trade(TradeError::BasePriceUnavailable)) => {}
        other => panic!("Expected BasePriceUnavailable, got {:?}", other),
    }
    match service.buy(user, &wif(), "1").await {
        Err(ServiceError::Trade(TradeError::BasePriceUnavailable)) => {}
        other => panic!("Expected BasePriceUnavailable, got {:?}", other),
    }

    assert_eq!(std::fs::read(store.wallet_path(user)).unwrap(), before);
}

#[tokio::test]
async fn test_sell_without_position_skips_oracle() {
    let oracle = priced_oracle();
    let (service, _store, _temp) = setup_service(oracle.clone());

    match service.sell(UserId::new(5), &bonk(), "1").await {
        Err(ServiceError::Trade(TradeError::NoSuchPosition(contract))) => {
            assert_eq!(contract, bonk())
        }
        other => panic!("Expected NoSuchPosition, got {:?}", other),
    }
    assert_eq!(oracle.token_calls(), 0);
    assert_eq!(oracle.base_calls(), 0);
}

#[tokio::test]
async fn test_refresh_drops_cached_quotes() {
    let mock = priced_oracle();
    let cache = Arc::new(QuoteCache::new(Duration::from_secs(60), 16));
    let cached = CachedOracle::new(mock.clone(), cache.clone());
    let (service, _store, _temp) = setup_service(Arc::new(cached));
    let user = UserId::new(6);
    service.deposit(user, "2").await.unwrap();
    service.buy(user, &bonk(), "1").await.unwrap();
    let calls = mock.token_calls();

    service.balance_report(user, false).await.unwrap();
    assert_eq!(mock.token_calls(), calls);

    let report = service.balance_report(user, true).await.unwrap();
    assert_eq!(mock.token_calls(), calls + 1);
    assert!(report.contains("Token Name: Bonk"));
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_sellable_positions_skip_unpriced_tokens() {
    let oracle = priced_oracle();
    oracle.set_quote(wif(), TokenQuote::new(d("2"), d("2000000"), "dogwifhat"));
    let (service, _store, _temp) = setup_service(oracle.clone());
    let user = UserId::new(7);
    service.deposit(user, "10").await.unwrap();
    service.buy(user, &bonk(), "1").await.unwrap();
    service.buy(user, &wif(), "1").await.unwrap();

    oracle.remove_quote(&wif());
    let sellable = service.sellable_positions(user).await.unwrap();
    assert_eq!(sellable.len(), 1);
    assert_eq!(sellable[0].0, bonk());
    assert_eq!(sellable[0].1, "Bonk (100.00) +0.00 SOL");

    let prompt = service.sell_prompt(user, &wif()).await.unwrap();
    assert!(prompt.is_none());
    let prompt = service.sell_prompt(user, &bonk()).await.unwrap().unwrap();
    assert!(prompt.starts_with("Token: Bonk\nBalance: 100.00"));
}

#[tokio::test]
async fn test_history_and_menu_for_new_user() {
    let (service, _store, _temp) = setup_service(priced_oracle());
    let user = UserId::new(8);

    assert_eq!(
        service.history(user).await.unwrap(),
        "No transaction history available."
    );
    let menu = service.menu_header(user).await.unwrap();
    assert!(menu.contains("SOL Balance: 0.00 SOL ($0.00)"));
}

#[tokio::test]
async fn test_storage_failure_is_a_hard_error() {
    let (service, store, _temp) = setup_service(priced_oracle());

    // A directory where the record should be makes every read fail.
    let blocked = UserId::new(40);
    let path = store.wallet_path(blocked);
    std::fs::create_dir(&path).unwrap();
    let err = service.deposit(blocked, "1").await.unwrap_err();
    assert!(matches!(err, ServiceError::Storage(_)), "got {:?}", err);
    assert!(service.wallet(blocked).await.is_err());
    assert!(path.is_dir());

    // A corrupt record is reported, never replaced by a fresh wallet.
    let corrupt = UserId::new(41);
    let path = store.wallet_path(corrupt);
    std::fs::write(&path, b"{ not json").unwrap();
    let err = service.buy(corrupt, &bonk(), "1").await.unwrap_err();
    assert!(matches!(err, ServiceError::Storage(_)), "got {:?}", err);
    assert_eq!(std::fs::read(&path).unwrap(), b"{ not json");

    // Other users are unaffected.
    assert_ok!(service.deposit(UserId::new(42), "1").await);
}
