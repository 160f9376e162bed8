use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One result row, keyed by column name. Key order follows the backend's JSON.
pub type Row = Map<String, Value>;

/// Rows produced by a single SQL statement within a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatementResult {
    pub rows: Vec<Row>,
}

impl StatementResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Column set of the statement, taken from the first row only
    pub fn column_names(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Full response to a `/query` submission: one `StatementResult` per statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryResponse {
    pub statements: Vec<StatementResult>,
}

impl QueryResponse {
    /// The statement whose rows get displayed
    pub fn last_statement(&self) -> Option<&StatementResult> {
        self.statements.last()
    }

    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }
}

/// Text shown for a single cell. Null and absent values both read `NULL`.
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "NULL".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}
