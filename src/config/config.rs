use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub display: DisplayConfig,
    pub export: ExportConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the roster backend
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Space-separated column priority applied to every result
    pub order_hint: String,

    /// Print "N rows returned" under each table
    pub show_row_count: bool,

    /// Rows printed before the table is truncated on screen (exports are never truncated)
    pub max_display_rows: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory for exports without an explicit path (defaults to the working directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// EDIPI of the operator, resolved against /users at start-up
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edipi: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            order_hint: String::new(),
            show_row_count: true,
            max_display_rows: 1000,
        }
    }
}

impl Config {
    /// Load config from the default location, falling back to defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Get the default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("roster-console").join("config.toml"))
    }

    /// Create a default config file with comments
    pub fn create_default_with_comments() -> String {
        r#"# Roster Console Configuration File
# Location: ~/.config/roster-console/config.toml (Linux)
#           ~/Library/Application Support/roster-console/config.toml (macOS)
#           %APPDATA%\roster-console\config.toml (Windows)

[server]
# Roster backend serving /tables, /query and /users/{id}
base_url = "http://127.0.0.1:5000"

[display]
# Columns listed here are shown first, in this order; the rest follow alphabetically
# Example: order_hint = "RANK LASTNAME FIRSTNAME"
order_hint = ""

# Print the row count under each result table
show_row_count = true

# Rows printed on screen before truncating (exports always include every row)
max_display_rows = 1000

[export]
# Where \export writes files when no path is given (default: current directory)
# output_dir = "/path/to/exports"

[session]
# Your EDIPI; looked up once at start-up to identify the operator
# edipi = "1234567890"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.base_url, "http://127.0.0.1:5000");
        assert!(config.display.order_hint.is_empty());
        assert!(config.session.edipi.is_none());
    }

    #[test]
    fn test_commented_default_parses() {
        let config: Config = toml::from_str(&Config::create_default_with_comments()).unwrap();
        assert_eq!(config.server.base_url, Config::default().server.base_url);
        assert_eq!(config.display.max_display_rows, 1000);
        assert!(config.export.output_dir.is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[session]\nedipi = \"1234567890\"\n").unwrap();
        assert_eq!(config.session.edipi.as_deref(), Some("1234567890"));
        assert!(config.display.show_row_count);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.display.order_hint = "RANK LASTNAME".to_string();
        fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.display.order_hint, "RANK LASTNAME");
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded.server.base_url, "http://127.0.0.1:5000");
    }
}
