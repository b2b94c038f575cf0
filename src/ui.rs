//! Terminal rendering helpers: styled tables and download progress.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;

use crate::catalog::{CurrencyOption, Product};

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

/// Formats an optional price. `None` is displayed as "N/A".
fn price_cell(value: Option<Decimal>) -> Cell {
    value.map_or(
        Cell::new("N/A")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right),
        |amount| Cell::new(format!("{amount:.2}")).set_alignment(CellAlignment::Right),
    )
}

pub fn products_table(products: &[Product]) -> String {
    let mut table = new_styled_table();
    table.set_header(vec![
        header_cell("Number"),
        header_cell("Name"),
        header_cell("Category"),
        header_cell("EUR"),
        header_cell("CHF"),
        header_cell("New"),
    ]);

    for product in products {
        table.add_row(vec![
            Cell::new(&product.number),
            Cell::new(&product.name),
            Cell::new(&product.category),
            price_cell(product.price_eur),
            price_cell(product.price_chf),
            Cell::new(if product.is_new { "yes" } else { "" }),
        ]);
    }

    table.to_string()
}

pub fn currencies_table(currencies: &[CurrencyOption]) -> String {
    let mut table = new_styled_table();
    table.set_header(vec![header_cell("Id"), header_cell("Currency")]);
    for currency in currencies {
        table.add_row(vec![Cell::new(&currency.id), Cell::new(&currency.name)]);
    }
    table.to_string()
}

pub fn subtle_text(text: &str) -> String {
    style(text).dim().to_string()
}

pub fn error_text(text: &str) -> String {
    style(text).red().to_string()
}

/// Byte-level progress bar for blob downloads. The length is adjusted once
/// the store reports the total size.
pub fn new_download_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})",
            )
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_products_table_renders_prices_and_placeholders() {
        let products = vec![Product {
            id: "p1".to_string(),
            name: "Widget".to_string(),
            number: "W-100".to_string(),
            category: "Widgets".to_string(),
            is_new: true,
            price_eur: Some("99.90".parse().unwrap()),
            price_chf: None,
        }];

        let rendered = products_table(&products);
        assert!(rendered.contains("W-100"));
        assert!(rendered.contains("99.90"));
        assert!(rendered.contains("N/A"));
    }
}
