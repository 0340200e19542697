use super::ui;
use crate::core::{Converter, ConverterState};
use anyhow::Result;

/// Resolves the rate for the converter's current pair and prints the result.
pub async fn run(mut converter: Converter) -> Result<()> {
    let pb = ui::new_spinner("Fetching exchange rate...");
    let state = resolve(&mut converter).await;
    pb.finish_and_clear();

    println!("{}", ui::render_conversion(&state, false));
    Ok(())
}

pub async fn resolve(converter: &mut Converter) -> ConverterState {
    converter.resolve_rate();
    converter.settle().await;
    converter.state().clone()
}
