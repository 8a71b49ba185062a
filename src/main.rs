use anyhow::Context;
use solpaper::api::{self, AppState};
use solpaper::{
    CachedOracle, ChatController, Config, HttpPriceOracle, PriceOracle, QuoteCache,
    TradingService, WalletStore,
};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("Configuration error")?;
    let port = config.port;

    let store = WalletStore::open(&config.wallets_dir).with_context(|| {
        format!(
            "Failed to open wallets directory {}",
            config.wallets_dir.display()
        )
    })?;

    let http = HttpPriceOracle::new(
        config.endpoints.clone(),
        config.birdeye_api_key.clone(),
        config.oracle_timeout,
    )
    .context("Failed to build HTTP client")?;
    let cache = Arc::new(QuoteCache::new(
        config.oracle_cache_ttl,
        config.oracle_cache_size,
    ));
    let oracle: Arc<dyn PriceOracle> = Arc::new(CachedOracle::new(http, cache));

    let service = Arc::new(TradingService::new(store, oracle));
    let controller = Arc::new(ChatController::new(service));

    let app = api::create_router(AppState::new(controller, config.bot_token.as_str()));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
