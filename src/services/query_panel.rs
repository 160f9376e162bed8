use crate::api_client::{ApiResult, RosterApi};
use crate::data::column_order::OrderHint;
use crate::data::data_exporter::{DataExporter, ExportFormat};
use crate::data::query_result::{QueryResponse, StatementResult};
use crate::data::result_renderer::{display_selection, render, RenderOutcome};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Whether a submission is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    Idle,
    Awaiting { seq: u64 },
}

/// What happened when a completion reached the panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelUpdate {
    Applied { statements: usize, rows: usize },
    Failed(String),
    /// A newer submission was issued; the completion was dropped
    Stale { seq: u64, latest: u64 },
}

/// A submitted query that has not run yet.
///
/// Owns everything it needs so it can be awaited or spawned independently of
/// the panel that issued it.
pub struct PendingQuery {
    seq: u64,
    sql: String,
    api: Arc<dyn RosterApi>,
}

impl PendingQuery {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub async fn run(self) -> QueryCompletion {
        let result = self.api.run_query(&self.sql).await;
        QueryCompletion {
            seq: self.seq,
            result,
        }
    }
}

/// Outcome of a `PendingQuery`, tagged with the sequence number it was issued under
pub struct QueryCompletion {
    pub seq: u64,
    pub result: ApiResult<QueryResponse>,
}

/// SQL submission, result display and export for the database manager view
pub struct QueryPanel {
    api: Arc<dyn RosterApi>,
    state: PanelState,
    latest_seq: u64,
    query_text: String,
    order_hint: OrderHint,
    response: Option<QueryResponse>,
    tables: Vec<String>,
    error_banner: Option<String>,
}

impl QueryPanel {
    pub fn new(api: Arc<dyn RosterApi>, order_hint: OrderHint) -> Self {
        Self {
            api,
            state: PanelState::Idle,
            latest_seq: 0,
            query_text: String::new(),
            order_hint,
            response: None,
            tables: Vec::new(),
            error_banner: None,
        }
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn is_awaiting(&self) -> bool {
        matches!(self.state, PanelState::Awaiting { .. })
    }

    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    pub fn order_hint(&self) -> &OrderHint {
        &self.order_hint
    }

    /// Changing the hint only affects rendering; nothing is re-queried
    pub fn set_order_hint(&mut self, hint: OrderHint) {
        debug!("Order hint set to '{}'", hint);
        self.order_hint = hint;
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn error_banner(&self) -> Option<&str> {
        self.error_banner.as_deref()
    }

    pub fn response(&self) -> Option<&QueryResponse> {
        self.response.as_ref()
    }

    /// Issue a new submission. Any earlier one still in flight becomes stale.
    pub fn dispatch(&mut self, sql: &str) -> PendingQuery {
        self.latest_seq += 1;
        let seq = self.latest_seq;
        self.state = PanelState::Awaiting { seq };
        self.query_text = sql.to_string();
        info!("Submitting query #{}", seq);

        PendingQuery {
            seq,
            sql: sql.to_string(),
            api: Arc::clone(&self.api),
        }
    }

    /// Apply a completion if it belongs to the latest submission
    pub fn apply(&mut self, completion: QueryCompletion) -> PanelUpdate {
        if completion.seq != self.latest_seq {
            debug!(
                "Dropping stale completion #{} (latest is #{})",
                completion.seq, self.latest_seq
            );
            return PanelUpdate::Stale {
                seq: completion.seq,
                latest: self.latest_seq,
            };
        }

        self.state = PanelState::Idle;
        match completion.result {
            Ok(response) => {
                let statements = response.statement_count();
                let rows = response.last_statement().map_or(0, StatementResult::len);
                info!(
                    "Query #{} returned {} statement(s), {} row(s) in last",
                    completion.seq, statements, rows
                );
                self.response = Some(response);
                self.error_banner = None;
                PanelUpdate::Applied { statements, rows }
            }
            Err(e) => {
                warn!("Query #{} failed: {}", completion.seq, e);
                let message = e.to_string();
                self.error_banner = Some(message.clone());
                PanelUpdate::Failed(message)
            }
        }
    }

    pub async fn submit(&mut self, sql: &str) -> PanelUpdate {
        let completion = self.dispatch(sql).run().await;
        self.apply(completion)
    }

    /// SQL that `open_table` submits for `table`
    pub fn select_all_sql(table: &str) -> String {
        format!("SELECT * FROM {};", table)
    }

    /// Query every row of `table`
    pub async fn open_table(&mut self, table: &str) -> PanelUpdate {
        let sql = Self::select_all_sql(table);
        self.submit(&sql).await
    }

    /// Reload the table list. On failure the previous list is kept.
    pub async fn refresh_tables(&mut self) -> ApiResult<&[String]> {
        match self.api.list_tables().await {
            Ok(tables) => {
                info!("Fetched {} table(s)", tables.len());
                self.tables = tables;
                self.error_banner = None;
                Ok(self.tables.as_slice())
            }
            Err(e) => {
                warn!("Error fetching tables: {}", e);
                self.error_banner = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// `None` until a query has completed successfully
    pub fn render(&self) -> Option<RenderOutcome> {
        self.response
            .as_ref()
            .map(|response| render(response, &self.order_hint))
    }

    /// Export what is currently displayed, in display column order
    pub fn export(&self, format: ExportFormat) -> Result<String> {
        let response = self
            .response
            .as_ref()
            .ok_or_else(|| anyhow!("No results to export - run a query first"))?;

        match display_selection(response, &self.order_hint) {
            Some((last, columns)) => DataExporter::export(format, last, &columns),
            None => DataExporter::export(format, &StatementResult::default(), &[]),
        }
    }
}
