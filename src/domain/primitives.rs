//! Domain primitives: UserId, ContractAddress, TradeKind.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Chat user identifier (the numeric id assigned by the chat platform).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl UserId {
    pub fn new(id: i64) -> Self {
        UserId(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SPL token mint address (base58 string).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractAddress(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    #[error("contract address is empty")]
    Empty,
    #[error("contract address has invalid length {0}")]
    InvalidLength(usize),
    #[error("contract address contains non-base58 character {0:?}")]
    InvalidCharacter(char),
}

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

impl ContractAddress {
    /// Wrap an address without validation (trusted sources such as persisted wallets).
    pub fn new(addr: impl Into<String>) -> Self {
        ContractAddress(addr.into())
    }

    /// Get the address as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ContractAddress {
    type Err = AddressParseError;

    /// Validates user input: a 32..=44 character base58 string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AddressParseError::Empty);
        }
        if let Some(c) = s.chars().find(|c| !BASE58_ALPHABET.contains(*c)) {
            return Err(AddressParseError::InvalidCharacter(c));
        }
        if !(32..=44).contains(&s.len()) {
            return Err(AddressParseError::InvalidLength(s.len()));
        }
        Ok(ContractAddress(s.to_string()))
    }
}

impl std::fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trade direction recorded in history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeKind {
    Buy,
    Sell,
}

impl TradeKind {
    pub fn label(&self) -> &'static str {
        match self {
            TradeKind::Buy => "BUY",
            TradeKind::Sell => "SELL",
        }
    }
}
