//! HTTP price oracle: Binance for SOL, Birdeye for token prices, Solana RPC
//! for supply and DexScreener for names.

use super::{OracleError, PriceOracle};
use crate::domain::{ContractAddress, Decimal, TokenQuote};
use async_trait::async_trait;
use backoff::future::retry_notify;
use backoff::ExponentialBackoff;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Upstream URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleEndpoints {
    /// Ticker endpoint returning `{"price": "..."}` for SOLUSDT.
    pub base_price_url: String,
    /// Birdeye price endpoint; the contract is passed as `?address=`.
    pub birdeye_url: String,
    /// DexScreener tokens endpoint; the contract is appended to the path.
    pub dexscreener_url: String,
    /// Solana JSON-RPC endpoint.
    pub rpc_url: String,
}

impl Default for OracleEndpoints {
    fn default() -> Self {
        Self {
            base_price_url: "https://api.binance.com/api/v3/ticker/price?symbol=SOLUSDT"
                .to_string(),
            birdeye_url: "https://public-api.birdeye.so/defi/price".to_string(),
            dexscreener_url: "https://api.dexscreener.com/tokens/v1/solana/".to_string(),
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
        }
    }
}

/// Retry schedule for rate-limited price requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each further 429.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBackoff {
        let cap = self.base_delay * 2u32.saturating_pow(self.max_attempts);
        ExponentialBackoff {
            current_interval: self.base_delay,
            initial_interval: self.base_delay,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: cap,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpPriceOracle {
    client: Client,
    endpoints: OracleEndpoints,
    api_key: String,
    retry: RetryPolicy,
}

impl HttpPriceOracle {
    /// Build an oracle whose every request is bounded by `timeout`.
    pub fn new(
        endpoints: OracleEndpoints,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, OracleError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::NetworkError(e.to_string()))?;
        Ok(Self {
            client,
            endpoints,
            api_key,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn send_json(&self, request: RequestBuilder) -> Result<Value, OracleError> {
        let response = request
            .send()
            .await
            .map_err(|e| OracleError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(OracleError::RateLimited);
        }
        if !status.is_success() {
            return Err(OracleError::HttpError {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("Unexpected status")
                    .to_string(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| OracleError::ParseError(e.to_string()))
    }

    async fn fetch_base_price(&self) -> Result<Decimal, OracleError> {
        debug!("Fetching base price from {}", self.endpoints.base_price_url);
        let body = self
            .send_json(self.client.get(&self.endpoints.base_price_url))
            .await?;
        parse_base_price(&body)
    }

    /// Token price, retried with exponential backoff on HTTP 429 only.
    async fn fetch_token_price(&self, contract: &ContractAddress) -> Result<Decimal, OracleError> {
        debug!("Fetching token price for {}", contract);
        let attempts = AtomicU32::new(0);
        let max_attempts = self.retry.max_attempts;

        let body = retry_notify(
            self.retry.backoff(),
            || async {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                let request = self
                    .client
                    .get(&self.endpoints.birdeye_url)
                    .query(&[("address", contract.as_str())])
                    .header("accept", "application/json")
                    .header("x-chain", "solana")
                    .header("X-API-KEY", &self.api_key);

                match self.send_json(request).await {
                    Ok(body) => Ok(body),
                    Err(OracleError::RateLimited) if attempt < max_attempts => {
                        Err(backoff::Error::transient(OracleError::RateLimited))
                    }
                    Err(e) => Err(backoff::Error::permanent(e)),
                }
            },
            |_err: OracleError, wait: Duration| {
                warn!(
                    "Price API rate limited for {}. Retrying in {:?}...",
                    contract, wait
                );
            },
        )
        .await?;

        parse_token_price(&body)
    }

    async fn fetch_supply(&self, contract: &ContractAddress) -> Result<Decimal, OracleError> {
        debug!("Fetching token supply for {}", contract);
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getTokenSupply",
            "params": [contract.as_str()]
        });
        let body = self
            .send_json(self.client.post(&self.endpoints.rpc_url).json(&payload))
            .await?;
        parse_token_supply(&body)
    }

    async fn fetch_name(&self, contract: &ContractAddress) -> Result<String, OracleError> {
        debug!("Fetching token name for {}", contract);
        let url = format!("{}{}", self.endpoints.dexscreener_url, contract);
        let body = self.send_json(self.client.get(&url)).await?;
        parse_token_name(&body)
    }

    async fn resolve_quote(&self, contract: &ContractAddress) -> Result<TokenQuote, OracleError> {
        let price = self.fetch_token_price(contract).await?;
        let supply = self.fetch_supply(contract).await?;
        let name = self.fetch_name(contract).await?;
        let market_cap = price
            .checked_mul(supply)
            .filter(Decimal::is_positive)
            .ok_or_else(|| OracleError::ParseError("market cap unavailable".to_string()))?;
        Ok(TokenQuote::new(price, market_cap, name))
    }
}

#[async_trait]
impl PriceOracle for HttpPriceOracle {
    async fn get_base_price(&self) -> Option<Decimal> {
        match self.fetch_base_price().await {
            Ok(price) => Some(price),
            Err(e) => {
                warn!("Error fetching SOL price: {}", e);
                None
            }
        }
    }

    async fn get_token_info(&self, contract: &ContractAddress) -> TokenQuote {
        match self.resolve_quote(contract).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!("Error resolving token info for {}: {}", contract, e);
                TokenQuote::unavailable()
            }
        }
    }
}

/// Read a decimal from a JSON string or number.
fn json_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str_canonical(s).ok(),
        Value::Number(n) => Decimal::from_str_canonical(&n.to_string()).ok(),
        _ => None,
    }
}

fn parse_base_price(body: &Value) -> Result<Decimal, OracleError> {
    body.get("price")
        .and_then(json_decimal)
        .filter(Decimal::is_positive)
        .ok_or_else(|| OracleError::ParseError("Missing price field".to_string()))
}

fn parse_token_price(body: &Value) -> Result<Decimal, OracleError> {
    body.get("data")
        .and_then(|d| d.get("value"))
        .and_then(json_decimal)
        .filter(Decimal::is_positive)
        .ok_or_else(|| OracleError::ParseError("Missing data.value field".to_string()))
}

/// Total supply in whole tokens: the raw `amount` scaled by `decimals`
/// (6 when the node omits it).
fn parse_token_supply(body: &Value) -> Result<Decimal, OracleError> {
    let value = body
        .get("result")
        .and_then(|r| r.get("value"))
        .ok_or_else(|| OracleError::ParseError("No supply data in RPC response".to_string()))?;

    let raw = value
        .get("amount")
        .and_then(json_decimal)
        .ok_or_else(|| OracleError::ParseError("Missing supply amount".to_string()))?;

    let decimals = value.get("decimals").and_then(Value::as_u64).unwrap_or(6);
    let decimals = u32::try_from(decimals)
        .ok()
        .filter(|d| *d <= 28)
        .ok_or_else(|| OracleError::ParseError(format!("Invalid decimals: {}", decimals)))?;

    Ok(raw * Decimal::from_scaled(1, decimals))
}

fn parse_token_name(body: &Value) -> Result<String, OracleError> {
    body.as_array()
        .and_then(|pairs| pairs.first())
        .and_then(|pair| pair.get("baseToken"))
        .and_then(|token| token.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| OracleError::ParseError("No pair data in DexScreener response".to_string()))
}
