use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::core::currency::{CurrencyCode, CurrencyRateProvider, RateTable};

pub const DEFAULT_BASE_URL: &str = "https://api.exchangerate-api.com";

// ExchangeRateApiProvider implementation for CurrencyRateProvider
pub struct ExchangeRateApiProvider {
    base_url: String,
    client: reqwest::Client,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fxconv/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ExchangeRateApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    base: Option<String>,
    date: Option<String>,
    rates: Map<String, Value>,
}

/// Entries with a non-numeric rate or an unparseable code are skipped; a
/// lookup for such a currency then finds nothing.
fn parse_rates(base: &CurrencyCode, data: LatestRatesResponse) -> RateTable {
    let mut rates = Vec::with_capacity(data.rates.len());
    for (key, value) in data.rates {
        let Some(rate) = value.as_f64() else {
            warn!(%base, currency = %key, value = %value, "Skipping non-numeric rate");
            continue;
        };
        match key.parse::<CurrencyCode>() {
            Ok(code) => rates.push((code, rate)),
            Err(e) => warn!(%base, currency = %key, error = %e, "Skipping invalid currency"),
        }
    }

    // An unparseable date only loses the annotation, not the rates.
    let date = data
        .date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
    let reported_base = data
        .base
        .and_then(|b| b.parse::<CurrencyCode>().ok())
        .unwrap_or_else(|| base.clone());

    RateTable {
        base: reported_base,
        date,
        rates,
    }
}

#[async_trait]
impl CurrencyRateProvider for ExchangeRateApiProvider {
    #[instrument(name = "LatestRatesFetch", skip(self), fields(base = %base))]
    async fn latest_rates(&self, base: &CurrencyCode) -> Result<RateTable> {
        let url = format!("{}/v4/latest/{}", self.base_url, base);
        debug!("Requesting latest rates from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for base currency: {}", e, base))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for base currency: {}",
                response.status(),
                base
            ));
        }

        let text = response.text().await?;

        let data: LatestRatesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", base, e))?;

        let table = parse_rates(base, data);
        debug!(count = table.rates.len(), "Received latest rates");
        Ok(table)
    }
}
