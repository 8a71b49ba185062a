use crate::oracle::OracleEndpoints;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Shared secret the chat front-end presents as a bearer token.
    pub bot_token: String,
    pub birdeye_api_key: String,
    pub wallets_dir: PathBuf,
    pub oracle_cache_ttl: Duration,
    pub oracle_cache_size: usize,
    pub oracle_timeout: Duration,
    pub endpoints: OracleEndpoints,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    /// Load from the process environment, reading a `.env` file first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or(&env_map, "PORT", 8080u16, "must be a valid u16")?;

        let bot_token = required(&env_map, "BOT_TOKEN")?;
        let birdeye_api_key = required(&env_map, "BIRDEYE_API_KEY")?;

        let wallets_dir = env_map
            .get("WALLETS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./wallets"));

        let oracle_cache_ttl = Duration::from_secs(parse_or(
            &env_map,
            "ORACLE_CACHE_TTL_SECS",
            10u64,
            "must be a valid u64",
        )?);

        let oracle_cache_size = parse_or(
            &env_map,
            "ORACLE_CACHE_SIZE",
            128usize,
            "must be a positive integer",
        )?;
        if oracle_cache_size == 0 {
            return Err(ConfigError::InvalidValue(
                "ORACLE_CACHE_SIZE".to_string(),
                "must be a positive integer".to_string(),
            ));
        }

        let oracle_timeout = Duration::from_millis(parse_or(
            &env_map,
            "ORACLE_TIMEOUT_MS",
            5000u64,
            "must be a valid u64",
        )?);

        let defaults = OracleEndpoints::default();
        let endpoints = OracleEndpoints {
            base_price_url: optional(&env_map, "BASE_PRICE_URL", defaults.base_price_url),
            birdeye_url: optional(&env_map, "BIRDEYE_API_URL", defaults.birdeye_url),
            dexscreener_url: optional(&env_map, "DEXSCREENER_API_URL", defaults.dexscreener_url),
            rpc_url: optional(&env_map, "SOLANA_RPC_URL", defaults.rpc_url),
        };

        Ok(Config {
            port,
            bot_token,
            birdeye_api_key,
            wallets_dir,
            oracle_cache_ttl,
            oracle_cache_size,
            oracle_timeout,
            endpoints,
        })
    }
}

fn required(env_map: &HashMap<String, String>, key: &str) -> Result<String, ConfigError> {
    env_map
        .get(key)
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnv(key.to_string()))
}

fn optional(env_map: &HashMap<String, String>, key: &str, default: String) -> String {
    env_map.get(key).cloned().unwrap_or(default)
}

fn parse_or<T: std::str::FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
    hint: &str,
) -> Result<T, ConfigError> {
    match env_map.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), hint.to_string())),
    }
}
