//! Configuration module
//!
//! Settings file handling for the console.

pub mod config;

pub use config::Config;
