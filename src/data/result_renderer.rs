use crate::data::column_order::{order_columns, OrderHint};
use crate::data::query_result::{display_value, QueryResponse, StatementResult};

/// Header shown above the synthetic row-number column
pub const ROW_INDEX_HEADER: &str = "#";

/// Text shown when there is nothing to display
pub const NO_RESULTS: &str = "No results";

/// What the results area shows after a query
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Table(DisplayTable),
    /// Valid terminal state, not an error
    Empty,
}

impl RenderOutcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, RenderOutcome::Empty)
    }

    pub fn table(&self) -> Option<&DisplayTable> {
        match self {
            RenderOutcome::Table(table) => Some(table),
            RenderOutcome::Empty => None,
        }
    }
}

/// Fully rendered result grid, every cell already converted to text
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayTable {
    /// Column names in display order, as the backend spelled them
    pub columns: Vec<String>,
    /// `#` followed by the upper-cased column names
    pub headers: Vec<String>,
    /// One entry per row: 1-based index, then one cell per column
    pub rows: Vec<Vec<String>>,
}

impl DisplayTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Pick the displayed statement and its column order.
///
/// Returns `None` for the same inputs that `render` turns into `Empty`.
pub fn display_selection<'a>(
    response: &'a QueryResponse,
    hint: &OrderHint,
) -> Option<(&'a StatementResult, Vec<String>)> {
    let last = response.last_statement()?;
    if last.is_empty() {
        return None;
    }
    let columns = order_columns(&last.column_names(), hint);
    Some((last, columns))
}

pub fn render(response: &QueryResponse, hint: &OrderHint) -> RenderOutcome {
    let Some((last, columns)) = display_selection(response, hint) else {
        return RenderOutcome::Empty;
    };

    let mut headers = Vec::with_capacity(columns.len() + 1);
    headers.push(ROW_INDEX_HEADER.to_string());
    headers.extend(columns.iter().map(|c| c.to_uppercase()));

    let rows = last
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let mut cells = Vec::with_capacity(columns.len() + 1);
            cells.push((index + 1).to_string());
            cells.extend(columns.iter().map(|col| display_value(row.get(col))));
            cells
        })
        .collect();

    RenderOutcome::Table(DisplayTable {
        columns,
        headers,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: serde_json::Value) -> QueryResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_render_orders_and_marks_nulls() {
        let resp = response(json!([[{"name": "Alice", "age": 30}, {"name": "Bob", "age": null}]]));
        let outcome = render(&resp, &OrderHint::parse("age name"));
        let table = outcome.table().expect("table expected");

        assert_eq!(table.columns, vec!["age", "name"]);
        assert_eq!(table.headers, vec!["#", "AGE", "NAME"]);
        assert_eq!(table.rows[0], vec!["1", "30", "Alice"]);
        assert_eq!(table.rows[1], vec!["2", "NULL", "Bob"]);
    }

    #[test]
    fn test_empty_last_statement_is_empty_marker() {
        let resp = response(json!([[{"name": "Alice"}], []]));
        assert_eq!(render(&resp, &OrderHint::empty()), RenderOutcome::Empty);
    }

    #[test]
    fn test_no_statements_is_empty_marker() {
        assert!(render(&QueryResponse::default(), &OrderHint::empty()).is_empty());
    }

    #[test]
    fn test_only_last_statement_is_shown() {
        let resp = response(json!([
            [{"RANK": "SGT"}],
            [{"EDIPI": "1234567890", "LASTNAME": "Doe"}]
        ]));
        let outcome = render(&resp, &OrderHint::empty());
        let table = outcome.table().unwrap();
        assert_eq!(table.columns, vec!["EDIPI", "LASTNAME"]);
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_first_row_defines_columns() {
        // Later rows may carry extra keys or miss some; only the first row counts
        let resp = response(json!([[
            {"a": 1, "b": 2},
            {"a": 3, "c": 9}
        ]]));
        let outcome = render(&resp, &OrderHint::empty());
        let table = outcome.table().unwrap();
        assert_eq!(table.columns, vec!["a", "b"]);
        assert_eq!(table.rows[1], vec!["2", "3", "NULL"]);
    }

    #[test]
    fn test_render_is_repeatable() {
        let resp = response(json!([[{"z": 1, "y": "two"}]]));
        let hint = OrderHint::parse("y");
        assert_eq!(render(&resp, &hint), render(&resp, &hint));
    }
}
