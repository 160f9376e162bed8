use crate::data::data_exporter::ExportFormat;
use anyhow::{anyhow, Result};
use std::path::PathBuf;

const DEFAULT_LOG_LINES: usize = 20;

/// One line of operator input
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    /// Anything that is not a backslash command is sent as SQL
    Query(String),
    Tables,
    Open(String),
    /// `None` prints the current hint; `\order -` clears it
    Order(Option<String>),
    Export {
        format: ExportFormat,
        path: Option<PathBuf>,
    },
    Show(ExportFormat),
    WhoAmI,
    Logs(usize),
    Clear,
    Help,
    Quit,
}

impl ReplCommand {
    /// Parse a line; `Ok(None)` for blank input
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let Some(command) = line.strip_prefix('\\') else {
            return Ok(Some(ReplCommand::Query(line.to_string())));
        };

        let (name, args) = match command.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (command, ""),
        };

        let parsed = match name.to_ascii_lowercase().as_str() {
            "tables" | "t" => ReplCommand::Tables,
            "open" | "o" => {
                if args.is_empty() {
                    return Err(anyhow!("Usage: \\open <table>"));
                }
                ReplCommand::Open(args.to_string())
            }
            "order" => match args {
                "" => ReplCommand::Order(None),
                "-" => ReplCommand::Order(Some(String::new())),
                hint => ReplCommand::Order(Some(hint.to_string())),
            },
            "export" | "e" => {
                let mut parts = args.splitn(2, char::is_whitespace);
                let format = parts
                    .next()
                    .filter(|f| !f.is_empty())
                    .ok_or_else(|| anyhow!("Usage: \\export <csv|json|md> [path]"))?
                    .parse::<ExportFormat>()?;
                let path = parts
                    .next()
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(PathBuf::from);
                ReplCommand::Export { format, path }
            }
            "show" => ReplCommand::Show(args.parse::<ExportFormat>()?),
            "whoami" => ReplCommand::WhoAmI,
            "logs" => {
                let count = if args.is_empty() {
                    DEFAULT_LOG_LINES
                } else {
                    args.parse::<usize>()
                        .map_err(|_| anyhow!("Usage: \\logs [count]"))?
                };
                ReplCommand::Logs(count)
            }
            "clear" => ReplCommand::Clear,
            "help" | "h" | "?" => ReplCommand::Help,
            "quit" | "q" | "exit" => ReplCommand::Quit,
            other => return Err(anyhow!("Unknown command \\{} (try \\help)", other)),
        };

        Ok(Some(parsed))
    }
}
