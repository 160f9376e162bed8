use anyhow::{Context, Result};
use clap::Parser;
use crossterm::style::Stylize;
use reedline::{
    FileBackedHistory, Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus,
    Reedline, Signal,
};
use roster_console::api_client::{ApiClient, RosterApi};
use roster_console::config::Config;
use roster_console::data::column_order::OrderHint;
use roster_console::data::data_exporter::{DataExporter, ExportFormat};
use roster_console::repl_commands::ReplCommand;
use roster_console::services::query_panel::{PanelUpdate, QueryPanel};
use roster_console::session::{ApiIdentityResolver, Session};
use roster_console::table_display::format_outcome;
use roster_console::utils::app_paths::AppPaths;
use roster_console::utils::logging;
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{info, warn};

const HISTORY_CAPACITY: usize = 1000;

#[derive(Parser, Debug)]
#[command(name = "roster-console", version, about = "Query and export the personnel roster")]
struct Cli {
    /// Backend base URL (overrides the config file)
    #[arg(long, env = "ROSTER_SERVER")]
    server: Option<String>,

    /// Operator EDIPI used to establish the session
    #[arg(long, env = "ROSTER_EDIPI")]
    edipi: Option<String>,

    /// Column priority, e.g. "RANK LASTNAME"
    #[arg(long)]
    order: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a commented default config file and exit
    #[arg(long)]
    generate_config: bool,

    /// Run one query, print the result and exit
    #[arg(short = 'e', long)]
    execute: Option<String>,

    /// With --execute: print the result as csv, json or md instead of a table
    #[arg(long, requires = "execute")]
    format: Option<ExportFormat>,

    /// Don't write a log file
    #[arg(long)]
    no_log_file: bool,
}

struct ConsolePrompt {
    label: String,
}

impl Prompt for ConsolePrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.label.as_str())
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, edit_mode: PromptEditMode) -> Cow<'_, str> {
        match edit_mode {
            PromptEditMode::Default | PromptEditMode::Emacs => "> ".into(),
            PromptEditMode::Vi(vi_mode) => match vi_mode {
                reedline::PromptViMode::Normal => "N> ".into(),
                reedline::PromptViMode::Insert => "I> ".into(),
            },
            PromptEditMode::Custom(str) => format!("{str}> ").into(),
        }
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("... ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!(
            "({}reverse search: {})",
            prefix, history_search.term
        ))
    }
}

fn print_help() {
    println!("{}", "Roster Console - SQLite roster manager".blue().bold());
    println!();
    println!("{}", "Commands:".yellow());
    println!(
        "  {}          - Run SQL (multiple statements allowed, last one is shown)",
        "<sql>".green()
    );
    println!("  {}        - List tables", "\\tables".green());
    println!("  {}  - SELECT * FROM <table>", "\\open <table>".green());
    println!(
        "  {}  - Show or set the column priority (\\order - clears)",
        "\\order [cols]".green()
    );
    println!(
        "  {} - Save the displayed result to a file",
        "\\export <csv|json|md> [path]".green()
    );
    println!("  {}  - Print the displayed result as csv, json or md", "\\show <format>".green());
    println!("  {}        - Show the current operator", "\\whoami".green());
    println!("  {}      - Show recent log entries", "\\logs [n]".green());
    println!("  {}         - Clear screen", "\\clear".green());
    println!("  {}          - Exit (or Ctrl+D)", "\\quit".green());
    println!();
}

/// Everything the REPL needs between commands
struct Console {
    runtime: Runtime,
    panel: QueryPanel,
    session: Session,
    config: Config,
}

impl Console {
    fn print_results(&self) {
        if let Some(banner) = self.panel.error_banner() {
            eprintln!("{}", format!("Error: {}", banner).red());
        }

        let Some(outcome) = self.panel.render() else {
            return;
        };
        let (text, footer) = format_outcome(&outcome, self.config.display.max_display_rows);
        println!("{}", text);
        if let Some(footer) = footer.filter(|_| self.config.display.show_row_count) {
            println!("\n{}", footer.green());
        }
    }

    fn report(&self, update: PanelUpdate) {
        match update {
            PanelUpdate::Applied { .. } => self.print_results(),
            PanelUpdate::Failed(message) => eprintln!("{}", format!("Error: {}", message).red()),
            PanelUpdate::Stale { .. } => {}
        }
    }

    /// Returns `false` when the operator asked to quit
    fn handle(&mut self, command: ReplCommand, editor: &mut Reedline) -> Result<bool> {
        match command {
            ReplCommand::Query(sql) => {
                println!("{}", format!("Executing: {}", sql).cyan());
                let update = self.runtime.block_on(self.panel.submit(&sql));
                self.report(update);
            }
            ReplCommand::Tables => match self.runtime.block_on(self.panel.refresh_tables()) {
                Ok(tables) if tables.is_empty() => println!("{}", "No tables".yellow()),
                Ok(tables) => {
                    for table in tables {
                        println!("  {}", table);
                    }
                }
                Err(e) => eprintln!("{}", format!("Error fetching tables: {}", e).red()),
            },
            ReplCommand::Open(table) => {
                let sql = QueryPanel::select_all_sql(&table);
                println!("{}", format!("Executing: {}", sql).cyan());
                let update = self.runtime.block_on(self.panel.open_table(&table));
                self.report(update);
            }
            ReplCommand::Order(None) => {
                let hint = self.panel.order_hint();
                if hint.is_empty() {
                    println!("No column priority set (alphabetical order)");
                } else {
                    println!("Column priority: {}", hint);
                }
            }
            ReplCommand::Order(Some(text)) => {
                self.panel.set_order_hint(OrderHint::parse(&text));
                self.print_results();
            }
            ReplCommand::Export { format, path } => {
                let content = self.panel.export(format)?;
                let written = DataExporter::write_to_file(
                    format,
                    &content,
                    path.as_deref(),
                    self.config.export.output_dir.as_deref(),
                )?;
                println!(
                    "{}",
                    format!("Exported {} to {}", format, written.display()).green()
                );
            }
            ReplCommand::Show(format) => println!("{}", self.panel.export(format)?),
            ReplCommand::WhoAmI => match (self.session.identity(), self.session.user()) {
                (None, _) => println!("Anonymous session (set --edipi or [session] edipi)"),
                (Some(id), None) => println!("EDIPI {} (profile could not be loaded)", id),
                (Some(_), Some(user)) => println!("{}", serde_json::to_string_pretty(user)?),
            },
            ReplCommand::Logs(count) => match logging::get_log_buffer() {
                Some(buffer) if buffer.is_empty() => println!("No log entries yet"),
                Some(buffer) => {
                    for entry in buffer.get_recent(count) {
                        println!("{}", entry.format_for_display());
                    }
                }
                None => println!("Logging is not initialized"),
            },
            ReplCommand::Clear => editor.clear_screen()?,
            ReplCommand::Help => print_help(),
            ReplCommand::Quit => return Ok(false),
        }
        Ok(true)
    }
}

fn run_once(console: &mut Console, sql: &str, format: Option<ExportFormat>) -> Result<()> {
    let update = console.runtime.block_on(console.panel.submit(sql));
    if let PanelUpdate::Failed(message) = update {
        anyhow::bail!("Query failed: {}", message);
    }

    match format {
        Some(format) => println!("{}", console.panel.export(format)?.trim_end()),
        None => console.print_results(),
    }
    Ok(())
}

fn run_repl(console: &mut Console) -> Result<()> {
    let mut line_editor = Reedline::create();
    let history = AppPaths::history_file().and_then(|path| {
        FileBackedHistory::with_file(HISTORY_CAPACITY, path).map_err(|e| anyhow::anyhow!("{}", e))
    });
    match history {
        Ok(history) => line_editor = line_editor.with_history(Box::new(history)),
        Err(e) => warn!("History disabled: {}", e),
    }

    let label = match console.session.identity() {
        Some(id) => format!("roster[{}]", id),
        None => "roster".to_string(),
    };
    let prompt = ConsolePrompt { label };

    println!("{}", "Roster Console".blue().bold());
    println!("Connected to {} - type \\help for commands", console.config.server.base_url);
    println!();

    loop {
        match line_editor.read_line(&prompt)? {
            Signal::Success(line) => match ReplCommand::parse(&line) {
                Ok(Some(command)) => match console.handle(command, &mut line_editor) {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => eprintln!("{}", format!("Error: {:#}", e).red()),
                },
                Ok(None) => {}
                Err(e) => eprintln!("{}", e.to_string().red()),
            },
            Signal::CtrlD => break,
            Signal::CtrlC => continue,
        }
    }

    info!("Console closed");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.generate_config {
        let path = match &cli.config {
            Some(path) => path.clone(),
            None => Config::get_config_path()?,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Error creating config directory {}", parent.display()))?;
        }
        std::fs::write(&path, Config::create_default_with_comments())
            .with_context(|| format!("Error writing config file {}", path.display()))?;
        println!("Configuration file created at: {}", path.display());
        return Ok(());
    }

    let log_dir = if cli.no_log_file {
        None
    } else {
        AppPaths::log_dir().ok()
    };
    if let Some(log_path) = logging::init_tracing(log_dir.as_deref()) {
        if cli.execute.is_none() {
            eprintln!("Logs: {}", log_path.display());
        }
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(server) = cli.server {
        config.server.base_url = server;
    }
    if let Some(edipi) = cli.edipi {
        config.session.edipi = Some(edipi);
    }
    if let Some(order) = cli.order {
        config.display.order_hint = order;
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let api: Arc<dyn RosterApi> = Arc::new(ApiClient::new(&config.server.base_url));
    let resolver = ApiIdentityResolver::new(Arc::clone(&api));
    let session = runtime.block_on(Session::establish(&resolver, config.session.edipi.as_deref()));
    let panel = QueryPanel::new(api, OrderHint::parse(&config.display.order_hint));

    let mut console = Console {
        runtime,
        panel,
        session,
        config,
    };

    match cli.execute {
        Some(sql) => run_once(&mut console, &sql, cli.format),
        None => run_repl(&mut console),
    }
}
