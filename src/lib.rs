pub mod api_client;
pub mod config;
pub mod data;
pub mod repl_commands;
pub mod services;
pub mod session;
pub mod table_display;
pub mod utils;
