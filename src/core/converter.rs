//! Converter state driven by asynchronous catalog and rate fetches.
//!
//! Fetches run as spawned tasks that never touch the state directly. Each one
//! reports back through a channel and the owner applies the result on its own
//! task, so the state needs no locking. Rate requests carry the generation
//! they were issued under; completions for an older generation are dropped.

use super::conversion::{self, Conversion};
use super::currency::{CurrencyCode, CurrencyRateProvider, RateTable};
use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct ConverterState {
    pub amount: f64,
    pub source: CurrencyCode,
    pub target: CurrencyCode,
    /// Units of `target` per unit of `source`; `None` while unresolved or after a failure.
    pub rate: Option<f64>,
    pub catalog: Vec<CurrencyCode>,
    /// Publication date of the rate currently held, if the provider reported one.
    pub rate_date: Option<NaiveDate>,
}

impl ConverterState {
    pub fn new(amount: f64, source: CurrencyCode, target: CurrencyCode) -> Self {
        Self {
            amount,
            source,
            target,
            rate: None,
            catalog: Vec::new(),
            rate_date: None,
        }
    }

    pub fn conversion(&self) -> Conversion {
        conversion::convert(self.amount, self.rate)
    }

    /// Conversion followed by the target code, e.g. `9.12 EUR`.
    pub fn display(&self) -> String {
        format!("{} {}", self.conversion(), self.target)
    }
}

/// What a call to [`Converter::next_update`] changed.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Catalog,
    Rate,
    /// A rate response for a selection that is no longer current.
    Discarded,
}

#[derive(Debug)]
enum Update {
    Catalog(Result<Vec<CurrencyCode>>),
    Rate {
        generation: u64,
        source: CurrencyCode,
        target: CurrencyCode,
        result: Result<(f64, Option<NaiveDate>)>,
    },
}

pub struct Converter {
    provider: Arc<dyn CurrencyRateProvider>,
    catalog_base: CurrencyCode,
    state: ConverterState,
    generation: u64,
    outstanding: usize,
    catalog_requested: bool,
    tx: mpsc::UnboundedSender<Update>,
    rx: mpsc::UnboundedReceiver<Update>,
}

impl Converter {
    pub fn new(
        provider: Arc<dyn CurrencyRateProvider>,
        catalog_base: CurrencyCode,
        state: ConverterState,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            provider,
            catalog_base,
            state,
            generation: 0,
            outstanding: 0,
            catalog_requested: false,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> &ConverterState {
        &self.state
    }

    /// True while any fetch issued by this converter has not reported back.
    pub fn is_loading(&self) -> bool {
        self.outstanding > 0
    }

    /// Starts the catalog load and resolves the initial pair.
    pub fn mount(&mut self) {
        self.load_catalog();
        self.resolve_rate();
    }

    /// Requests the catalog. Only the first call per converter issues a fetch.
    pub fn load_catalog(&mut self) {
        if self.catalog_requested {
            debug!("Catalog already requested, skipping");
            return;
        }
        self.catalog_requested = true;
        self.outstanding += 1;

        let provider = Arc::clone(&self.provider);
        let base = self.catalog_base.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            debug!(base = %base, "Fetching currency catalog");
            let result = provider.latest_rates(&base).await.map(|t| t.codes());
            let _ = tx.send(Update::Catalog(result));
        });
    }

    /// Amount edits are local and never trigger a fetch.
    pub fn set_amount(&mut self, amount: f64) {
        self.state.amount = amount;
    }

    pub fn set_source(&mut self, source: CurrencyCode) {
        if source == self.state.source {
            return;
        }
        self.warn_if_unknown(&source);
        self.state.source = source;
        self.resolve_rate();
    }

    pub fn set_target(&mut self, target: CurrencyCode) {
        if target == self.state.target {
            return;
        }
        self.warn_if_unknown(&target);
        self.state.target = target;
        self.resolve_rate();
    }

    fn warn_if_unknown(&self, code: &CurrencyCode) {
        if !self.state.catalog.is_empty() && !self.state.catalog.contains(code) {
            warn!(code = %code, "Currency is not in the catalog");
        }
    }

    /// Resolves the rate for the current pair, superseding any request in flight.
    pub fn resolve_rate(&mut self) {
        self.generation += 1;
        self.state.rate_date = None;

        if self.state.source == self.state.target {
            debug!(currency = %self.state.source, "Same currency, rate is 1");
            self.state.rate = Some(1.0);
            return;
        }

        self.state.rate = None;
        self.outstanding += 1;

        let provider = Arc::clone(&self.provider);
        let generation = self.generation;
        let source = self.state.source.clone();
        let target = self.state.target.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            debug!(%source, %target, generation, "Fetching exchange rate");
            let result = provider
                .latest_rates(&source)
                .await
                .and_then(|table| pair_rate(&table, &source, &target));
            let _ = tx.send(Update::Rate {
                generation,
                source,
                target,
                result,
            });
        });
    }

    /// Waits for the next fetch to report back and applies it.
    ///
    /// Pends forever when nothing is outstanding; check [`Self::is_loading`]
    /// first or race it against other input.
    pub async fn next_update(&mut self) -> Change {
        match self.rx.recv().await {
            Some(update) => self.apply(update),
            // The converter holds a sender, so the channel never closes.
            None => std::future::pending().await,
        }
    }

    /// Applies updates until no fetch is outstanding.
    pub async fn settle(&mut self) {
        while self.is_loading() {
            self.next_update().await;
        }
    }

    fn apply(&mut self, update: Update) -> Change {
        self.outstanding = self.outstanding.saturating_sub(1);
        match update {
            Update::Catalog(Ok(codes)) => {
                debug!(count = codes.len(), "Currency catalog loaded");
                self.state.catalog = codes;
                Change::Catalog
            }
            Update::Catalog(Err(e)) => {
                error!(error = %e, "Error fetching currencies");
                Change::Catalog
            }
            Update::Rate { generation, .. } if generation != self.generation => {
                debug!(
                    generation,
                    current = self.generation,
                    "Discarding rate for a superseded selection"
                );
                Change::Discarded
            }
            Update::Rate {
                source,
                target,
                result,
                ..
            } => {
                match result {
                    Ok((rate, date)) => {
                        debug!(%source, %target, rate, "Exchange rate resolved");
                        self.state.rate = Some(rate);
                        self.state.rate_date = date;
                    }
                    Err(e) => {
                        error!(%source, %target, error = %e, "Error fetching exchange rate");
                        self.state.rate = None;
                        self.state.rate_date = None;
                    }
                }
                Change::Rate
            }
        }
    }
}

fn pair_rate(
    table: &RateTable,
    source: &CurrencyCode,
    target: &CurrencyCode,
) -> Result<(f64, Option<NaiveDate>)> {
    let rate = table
        .rate_for(target)
        .ok_or_else(|| anyhow!("No rate for {} in response for {}", target, source))?;
    if !rate.is_finite() || rate <= 0.0 {
        return Err(anyhow!("Invalid rate {} for {}", rate, target));
    }
    Ok((rate, table.date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn code(s: &str) -> CurrencyCode {
        s.parse().unwrap()
    }

    struct Scripted {
        rates: Vec<(CurrencyCode, f64)>,
        delay: Duration,
    }

    /// Answers per base currency with a fixed table after a per-base delay.
    #[derive(Default)]
    struct ScriptedProvider {
        responses: HashMap<CurrencyCode, Scripted>,
        calls: AtomicUsize,
        requested: Mutex<Vec<CurrencyCode>>,
    }

    impl ScriptedProvider {
        fn with(mut self, base: &str, delay_ms: u64, rates: &[(&str, f64)]) -> Self {
            self.responses.insert(
                code(base),
                Scripted {
                    rates: rates.iter().map(|(c, r)| (code(c), *r)).collect(),
                    delay: Duration::from_millis(delay_ms),
                },
            );
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CurrencyRateProvider for ScriptedProvider {
        async fn latest_rates(&self, base: &CurrencyCode) -> Result<RateTable> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().unwrap().push(base.clone());
            let scripted = self
                .responses
                .get(base)
                .ok_or_else(|| anyhow!("Request error: connection refused"))?;
            tokio::time::sleep(scripted.delay).await;
            Ok(RateTable {
                base: base.clone(),
                date: NaiveDate::from_ymd_opt(2024, 5, 1),
                rates: scripted.rates.clone(),
            })
        }
    }

    fn converter(provider: Arc<ScriptedProvider>, amount: f64, from: &str, to: &str) -> Converter {
        Converter::new(
            provider,
            code("USD"),
            ConverterState::new(amount, code(from), code(to)),
        )
    }

    #[tokio::test]
    async fn test_mount_loads_catalog_and_rate() {
        let provider = Arc::new(ScriptedProvider::default().with(
            "USD",
            0,
            &[("USD", 1.0), ("EUR", 0.9123), ("GBP", 0.79)],
        ));
        let mut converter = converter(Arc::clone(&provider), 10.0, "USD", "EUR");

        converter.mount();
        assert!(converter.is_loading());
        converter.settle().await;

        let state = converter.state();
        assert_eq!(state.catalog, vec![code("USD"), code("EUR"), code("GBP")]);
        assert_eq!(state.rate, Some(0.9123));
        assert_eq!(state.rate_date, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(state.display(), "9.12 EUR");
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_same_currency_short_circuits_without_fetch() {
        let provider = Arc::new(ScriptedProvider::default());
        let mut converter = converter(Arc::clone(&provider), 7.0, "USD", "USD");

        converter.resolve_rate();
        assert!(!converter.is_loading());
        assert_eq!(converter.state().rate, Some(1.0));
        assert_eq!(converter.state().display(), "7.00 USD");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_rate_fetch_shows_error() {
        let provider = Arc::new(ScriptedProvider::default());
        let mut converter = converter(Arc::clone(&provider), 42.0, "USD", "EUR");

        converter.mount();
        converter.settle().await;

        let state = converter.state();
        assert!(state.catalog.is_empty());
        assert_eq!(state.rate, None);
        assert_eq!(state.conversion().to_string(), "Error");
        assert_eq!(state.display(), "Error EUR");

        // Still interactive after both failures.
        converter.set_amount(1.0);
        converter.set_target(code("USD"));
        assert_eq!(converter.state().display(), "1.00 USD");
    }

    #[tokio::test]
    async fn test_missing_or_invalid_target_rate_is_failure() {
        let provider = Arc::new(
            ScriptedProvider::default()
                .with("USD", 0, &[("USD", 1.0), ("XXX", 0.0)])
                .with("GBP", 0, &[("GBP", 1.0), ("USD", 1.27)]),
        );
        let mut converter = converter(Arc::clone(&provider), 1.0, "USD", "EUR");

        converter.resolve_rate();
        converter.settle().await;
        assert_eq!(converter.state().rate, None);

        converter.set_target(code("XXX"));
        converter.settle().await;
        assert_eq!(converter.state().rate, None);

        converter.set_source(code("GBP"));
        converter.set_target(code("USD"));
        converter.settle().await;
        assert_eq!(converter.state().rate, Some(1.27));
    }

    #[tokio::test]
    async fn test_catalog_loads_once() {
        let provider = Arc::new(ScriptedProvider::default().with("USD", 0, &[("USD", 1.0)]));
        let mut converter = converter(Arc::clone(&provider), 1.0, "USD", "USD");

        converter.load_catalog();
        converter.load_catalog();
        converter.mount();
        converter.settle().await;

        assert_eq!(provider.calls(), 1);
        assert_eq!(converter.state().catalog, vec![code("USD")]);
    }

    #[tokio::test]
    async fn test_amount_change_does_not_fetch() {
        let provider = Arc::new(ScriptedProvider::default().with("USD", 0, &[("EUR", 0.5)]));
        let mut converter = converter(Arc::clone(&provider), 1.0, "USD", "EUR");

        converter.resolve_rate();
        converter.settle().await;
        converter.set_amount(3.0);
        converter.set_amount(5.0);

        assert!(!converter.is_loading());
        assert_eq!(provider.calls(), 1);
        assert_eq!(converter.state().display(), "2.50 EUR");
    }

    #[tokio::test]
    async fn test_stale_response_does_not_overwrite_current_pair() {
        let provider = Arc::new(
            ScriptedProvider::default()
                .with("USD", 0, &[("EUR", 0.9)])
                .with("GBP", 200, &[("EUR", 1.17)])
                .with("JPY", 0, &[("EUR", 0.0061)]),
        );
        let mut converter = converter(Arc::clone(&provider), 1000.0, "USD", "EUR");

        converter.set_source(code("GBP"));
        converter.set_source(code("JPY"));

        // The fast JPY response lands first and is applied.
        assert_eq!(converter.next_update().await, Change::Rate);
        assert_eq!(converter.state().rate, Some(0.0061));

        // The slow GBP response arrives afterwards and is dropped.
        assert_eq!(converter.next_update().await, Change::Discarded);
        assert!(!converter.is_loading());
        assert_eq!(converter.state().rate, Some(0.0061));
        assert_eq!(converter.state().display(), "6.10 EUR");
    }

    #[tokio::test]
    async fn test_same_currency_supersedes_in_flight_request() {
        let provider = Arc::new(ScriptedProvider::default().with("USD", 100, &[("EUR", 0.9)]));
        let mut converter = converter(Arc::clone(&provider), 2.0, "USD", "EUR");

        converter.resolve_rate();
        converter.set_target(code("USD"));
        assert_eq!(converter.state().rate, Some(1.0));

        converter.settle().await;
        assert_eq!(converter.state().rate, Some(1.0));
        assert_eq!(converter.state().display(), "2.00 USD");
    }

    #[tokio::test]
    async fn test_selection_change_clears_previous_rate() {
        let provider = Arc::new(
            ScriptedProvider::default()
                .with("USD", 0, &[("EUR", 0.9)])
                .with("EUR", 50, &[("USD", 1.1)]),
        );
        let mut converter = converter(Arc::clone(&provider), 1.0, "USD", "EUR");

        converter.resolve_rate();
        converter.settle().await;
        assert_eq!(converter.state().rate, Some(0.9));

        converter.set_source(code("EUR"));
        converter.set_target(code("USD"));
        assert_eq!(converter.state().rate, None);
        assert!(converter.is_loading());

        converter.settle().await;
        assert_eq!(converter.state().rate, Some(1.1));
        assert_eq!(
            *provider.requested.lock().unwrap(),
            vec![code("USD"), code("EUR")]
        );
    }
}
