pub mod cli;
pub mod core;
pub mod providers;

pub use crate::core::config;

use crate::core::{Converter, ConverterState, CurrencyCode};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Convert {
        amount: Option<f64>,
        from: Option<CurrencyCode>,
        to: Option<CurrencyCode>,
    },
    Currencies,
    Interactive,
}

/// Builds a converter from the config, with explicit values taking precedence.
pub fn build_converter(
    config: &config::AppConfig,
    amount: Option<f64>,
    from: Option<CurrencyCode>,
    to: Option<CurrencyCode>,
) -> Result<Converter> {
    let provider = providers::ExchangeRateApiProvider::new(&config.provider.base_url)?;
    let state = ConverterState::new(
        amount.unwrap_or(config.defaults.amount),
        from.unwrap_or_else(|| config.defaults.from.clone()),
        to.unwrap_or_else(|| config.defaults.to.clone()),
    );
    Ok(Converter::new(
        Arc::new(provider),
        config.catalog_base.clone(),
        state,
    ))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Currency converter starting...");

    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Convert { amount, from, to } => {
            cli::convert::run(build_converter(&config, amount, from, to)?).await
        }
        AppCommand::Currencies => {
            cli::currencies::run(build_converter(&config, None, None, None)?).await
        }
        AppCommand::Interactive => {
            cli::interactive::run(build_converter(&config, None, None, None)?).await
        }
    }
}
