use crate::data::result_renderer::{DisplayTable, RenderOutcome, NO_RESULTS};
use comfy_table::{Attribute, Cell, ContentArrangement, Table};

/// Build a terminal table from a rendered result.
///
/// Only the first `max_rows` body rows are included.
pub fn build_table(display: &DisplayTable, max_rows: usize) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let headers: Vec<Cell> = display
        .headers
        .iter()
        .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
        .collect();
    table.set_header(headers);

    for row in display.rows.iter().take(max_rows) {
        table.add_row(row.clone());
    }

    table
}

/// Text for the results area, plus an optional footer line
pub fn format_outcome(outcome: &RenderOutcome, max_rows: usize) -> (String, Option<String>) {
    match outcome {
        RenderOutcome::Empty => (NO_RESULTS.to_string(), None),
        RenderOutcome::Table(display) => {
            let table = build_table(display, max_rows).to_string();
            let total = display.row_count();
            let footer = if total > max_rows {
                format!("{} rows returned ({} shown)", total, max_rows)
            } else {
                format!("{} rows returned", total)
            };
            (table, Some(footer))
        }
    }
}
