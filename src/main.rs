use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxconv::core::CurrencyCode;
use fxconv::core::conversion::parse_amount;
use fxconv::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for fxconv::AppCommand {
    fn from(cmd: Commands) -> fxconv::AppCommand {
        match cmd {
            Commands::Convert { amount, from, to } => {
                fxconv::AppCommand::Convert { amount, from, to }
            }
            Commands::Currencies => fxconv::AppCommand::Currencies,
            Commands::Interactive => fxconv::AppCommand::Interactive,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Convert an amount once and print the result
    Convert {
        /// Amount to convert (defaults to the configured amount)
        #[arg(allow_negative_numbers = true, value_parser = parse_amount)]
        amount: Option<f64>,
        /// Currency to convert from, e.g. USD
        from: Option<CurrencyCode>,
        /// Currency to convert to, e.g. EUR
        to: Option<CurrencyCode>,
    },
    /// List the currencies offered by the rate provider
    Currencies,
    /// Start an interactive converter session
    Interactive,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fxconv::cli::setup::setup(),
        Some(cmd) => fxconv::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_rejects_non_finite_amount() {
        for amount in ["NaN", "inf", "-inf"] {
            assert!(Cli::try_parse_from(["fxconv", "convert", amount, "USD", "EUR"]).is_err());
        }
        let cli = Cli::try_parse_from(["fxconv", "convert", "-2.5", "usd", "eur"]).unwrap();
        match cli.command {
            Some(Commands::Convert { amount, .. }) => assert_eq!(amount, Some(-2.5)),
            _ => panic!("expected convert"),
        }
    }
}
