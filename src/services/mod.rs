pub mod query_panel;
