//! Result data handling
//!
//! Row/response types as the backend sends them, the column ordering policy,
//! the renderer that turns the last statement into a display grid, and the
//! exporters that reproduce that grid as CSV, JSON or Markdown.

pub mod column_order;
pub mod data_exporter;
pub mod query_result;
pub mod result_renderer;
