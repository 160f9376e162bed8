use std::collections::HashMap;
use std::fmt;

/// Operator-supplied column priority list.
///
/// Tokens are whitespace separated. The hint only reorders columns; it never
/// hides or adds any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderHint {
    tokens: Vec<String>,
}

impl OrderHint {
    pub fn parse(text: &str) -> Self {
        Self {
            tokens: text.split_whitespace().map(str::to_string).collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

impl fmt::Display for OrderHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens.join(" "))
    }
}

/// Order `raw_columns` for display.
///
/// Hinted columns come first in hint order, everything else follows in
/// case-sensitive ascending order. Hint tokens that don't name a column are
/// ignored, and for duplicated tokens the first position counts.
pub fn order_columns<S: AsRef<str>>(raw_columns: &[S], hint: &OrderHint) -> Vec<String> {
    let mut priority: HashMap<&str, usize> = HashMap::new();
    for (rank, token) in hint.tokens().iter().enumerate() {
        if raw_columns.iter().any(|c| c.as_ref() == token) {
            priority.entry(token.as_str()).or_insert(rank);
        }
    }

    let mut columns: Vec<String> = raw_columns.iter().map(|c| c.as_ref().to_string()).collect();
    columns.sort_by(|a, b| {
        let rank_a = priority.get(a.as_str()).copied().unwrap_or(usize::MAX);
        let rank_b = priority.get(b.as_str()).copied().unwrap_or(usize::MAX);
        rank_a.cmp(&rank_b).then_with(|| a.cmp(b))
    });
    columns
}
