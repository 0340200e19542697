use crate::core::{Conversion, ConverterState, CurrencyCode};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Label,
    Value,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Label => style(text).bold(),
        StyleType::Value => style(text).green().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Currency codes per row in catalog tables.
pub const CATALOG_COLUMNS: usize = 8;

/// Lays the catalog out row by row, `columns` codes per row.
pub fn catalog_table(catalog: &[CurrencyCode], columns: usize) -> Table {
    let columns = columns.max(1);
    let mut table = new_styled_table();
    table.set_header(vec![header_cell(&format!(
        "Currencies ({})",
        catalog.len()
    ))]);
    for chunk in catalog.chunks(columns) {
        let row: Vec<Cell> = chunk.iter().map(|code| Cell::new(code.as_str())).collect();
        table.add_row(row);
    }
    table
}

/// Plain conversion line, e.g. `10 USD = 9.12 EUR`.
pub fn conversion_line(state: &ConverterState) -> String {
    format!("{} {} = {}", state.amount, state.source, state.display())
}

/// Renders the conversion with styling, marking it stale while loading.
pub fn render_conversion(state: &ConverterState, loading: bool) -> String {
    let label = style_text("Converted Amount:", StyleType::Label);
    let from = format!("{} {}", state.amount, state.source);
    if loading && state.rate.is_none() {
        return format!(
            "{label} {from} = {}",
            style_text(&format!("... {}", state.target), StyleType::Subtle)
        );
    }
    let value = match state.conversion() {
        Conversion::Value(_) => style_text(&state.display(), StyleType::Value),
        Conversion::Error => style_text(&state.display(), StyleType::Error),
    };
    let mut line = format!("{label} {from} = {value}");
    if let Some(date) = state.rate_date {
        line.push_str(&style_text(&format!(" (rates as of {date})"), StyleType::Subtle));
    }
    line
}

/// Creates a spinner shown while fetches are outstanding.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}")
    {
        pb.set_style(spinner_style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
