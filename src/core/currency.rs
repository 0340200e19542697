//! Currency conversion abstractions

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A short currency identifier such as `USD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn usd() -> Self {
        CurrencyCode("USD".to_string())
    }

    pub fn eur() -> Self {
        CurrencyCode("EUR".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CurrencyCode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim();
        if code.is_empty() {
            bail!("Currency code cannot be empty");
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            bail!("Invalid currency code: {code}");
        }
        Ok(CurrencyCode(code.to_ascii_uppercase()))
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> String {
        code.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Latest rates published by a provider for one base currency.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    pub base: CurrencyCode,
    pub date: Option<NaiveDate>,
    /// Units of each currency per one unit of `base`, in provider order.
    pub rates: Vec<(CurrencyCode, f64)>,
}

impl RateTable {
    pub fn codes(&self) -> Vec<CurrencyCode> {
        self.rates.iter().map(|(code, _)| code.clone()).collect()
    }

    pub fn rate_for(&self, code: &CurrencyCode) -> Option<f64> {
        self.rates
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, rate)| *rate)
    }
}

#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    async fn latest_rates(&self, base: &CurrencyCode) -> Result<RateTable>;
}
