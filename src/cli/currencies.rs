use super::ui;
use crate::core::Converter;
use anyhow::Result;

pub async fn run(mut converter: Converter) -> Result<()> {
    let pb = ui::new_spinner("Fetching currencies...");
    converter.load_catalog();
    converter.settle().await;
    pb.finish_and_clear();

    let catalog = &converter.state().catalog;
    if catalog.is_empty() {
        println!(
            "{}",
            ui::style_text("No currencies available.", ui::StyleType::Error)
        );
    } else {
        println!("{}", ui::catalog_table(catalog, ui::CATALOG_COLUMNS));
    }
    Ok(())
}
