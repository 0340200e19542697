use super::ui::{self, StyleType};
use crate::core::conversion::parse_amount;
use crate::core::{Change, Converter, CurrencyCode};
use anyhow::{Result, bail};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  <number> | amount <number>   set the amount
  from <CODE>                  convert from this currency
  to <CODE>                    convert to this currency
  list                         show available currencies
  help                         show this help
  quit | exit                  leave";

#[derive(Debug, PartialEq)]
enum Command {
    Amount(f64),
    From(CurrencyCode),
    To(CurrencyCode),
    List,
    Help,
    Quit,
    Empty,
}

fn parse_command(line: &str) -> Result<Command> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Ok(Command::Empty);
    };
    let arg = parts.next();
    if parts.next().is_some() {
        bail!("Too many arguments. Type 'help' for commands.");
    }

    let command = match (head.to_ascii_lowercase().as_str(), arg) {
        ("amount", Some(value)) => Command::Amount(parse_amount(value)?),
        ("from", Some(code)) => Command::From(code.parse()?),
        ("to", Some(code)) => Command::To(code.parse()?),
        ("list", None) => Command::List,
        ("help", None) => Command::Help,
        ("quit" | "exit", None) => Command::Quit,
        ("amount" | "from" | "to", None) => bail!("Missing value for '{head}'"),
        (_, None) if head.parse::<f64>().is_ok() => Command::Amount(parse_amount(head)?),
        _ => bail!("Unknown command: {head}. Type 'help' for commands."),
    };
    Ok(command)
}

fn render<W: Write>(converter: &Converter, out: &mut W) -> Result<()> {
    writeln!(
        out,
        "{}",
        ui::render_conversion(converter.state(), converter.is_loading())
    )?;
    Ok(())
}

/// Runs a session on stdin and stdout.
pub async fn run(converter: Converter) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    session(converter, stdin, std::io::stdout()).await?;
    Ok(())
}

/// Re-renders the conversion after each edit and each resolved rate until
/// `quit` or end of input. Returns the converter for inspection.
pub async fn session<R, W>(mut converter: Converter, input: R, mut out: W) -> Result<Converter>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();

    writeln!(out, "{}", ui::style_text("Currency Converter", StyleType::Title))?;
    writeln!(out, "{}", ui::style_text("Type 'help' for commands.", StyleType::Subtle))?;
    converter.mount();
    render(&converter, &mut out)?;

    loop {
        tokio::select! {
            biased;

            change = converter.next_update() => match change {
                Change::Rate => render(&converter, &mut out)?,
                Change::Catalog => {
                    let count = converter.state().catalog.len();
                    if count == 0 {
                        writeln!(out, "{}", ui::style_text("Currency list unavailable.", StyleType::Error))?;
                    } else {
                        writeln!(out, "{}", ui::style_text(&format!("{count} currencies available."), StyleType::Subtle))?;
                    }
                }
                Change::Discarded => {}
            },
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(Command::Empty) => {}
                    Ok(Command::Help) => writeln!(out, "{HELP}")?,
                    Ok(Command::List) => {
                        let catalog = &converter.state().catalog;
                        if catalog.is_empty() {
                            writeln!(out, "{}", ui::style_text("No currencies available.", StyleType::Error))?;
                        } else {
                            writeln!(out, "{}", ui::catalog_table(catalog, ui::CATALOG_COLUMNS))?;
                        }
                    }
                    Ok(Command::Amount(amount)) => {
                        converter.set_amount(amount);
                        render(&converter, &mut out)?;
                    }
                    Ok(Command::From(code)) => {
                        converter.set_source(code);
                        render(&converter, &mut out)?;
                    }
                    Ok(Command::To(code)) => {
                        converter.set_target(code);
                        render(&converter, &mut out)?;
                    }
                    Err(e) => writeln!(out, "{}", ui::style_text(&e.to_string(), StyleType::Error))?,
                }
            }
        }
    }

    Ok(converter)
}
