use async_trait::async_trait;
use roster_console::api_client::{ApiError, ApiResult, RosterApi, UserProfile};
use roster_console::data::column_order::OrderHint;
use roster_console::data::data_exporter::ExportFormat;
use roster_console::data::query_result::QueryResponse;
use roster_console::data::result_renderer::RenderOutcome;
use roster_console::services::query_panel::{PanelState, PanelUpdate, QueryPanel};
use roster_console::session::{ApiIdentityResolver, Session};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// In-memory stand-in for the roster backend
struct FakeRoster {
    tables_down: AtomicBool,
}

impl FakeRoster {
    fn new() -> Self {
        Self {
            tables_down: AtomicBool::new(false),
        }
    }

    fn roster_rows() -> serde_json::Value {
        json!([
            {"RANK": "SGT", "FIRSTNAME": "Jane", "LASTNAME": "Doe", "MI": "Q",
             "EDIPI": "1234567890", "DOR": 20230101, "PMOS": "0311", "BILMOS": "0369"},
            {"RANK": "CPL", "FIRSTNAME": "John", "LASTNAME": "Roe", "MI": null,
             "EDIPI": "2345678901", "DOR": 20240601, "PMOS": "0311", "BILMOS": "0311"}
        ])
    }
}

#[async_trait]
impl RosterApi for FakeRoster {
    async fn list_tables(&self) -> ApiResult<Vec<String>> {
        if self.tables_down.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(vec!["roster".to_string(), "mos".to_string()])
    }

    async fn run_query(&self, sql: &str) -> ApiResult<QueryResponse> {
        let lowered = sql.to_lowercase();
        if lowered.contains("slow") {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let value = if lowered.contains("from roster") {
            json!([FakeRoster::roster_rows()])
        } else if lowered.starts_with("update") {
            // UPDATE followed by an empty SELECT
            json!([[], []])
        } else if lowered.contains("from mos") {
            json!([[{"BILMOS": "0369", "DESCRIPTION": "Infantry Unit Leader"}]])
        } else {
            return Err(ApiError::Status {
                status: 400,
                body: format!("no such table in: {}", sql),
            });
        };

        serde_json::from_value(value).map_err(|e| ApiError::Malformed(e.to_string()))
    }

    async fn get_user(&self, id: &str) -> ApiResult<UserProfile> {
        let rows = FakeRoster::roster_rows();
        let found = rows
            .as_array()
            .and_then(|rows| rows.iter().find(|r| r["EDIPI"] == json!(id)).cloned());
        match found {
            Some(row) => {
                serde_json::from_value(row).map_err(|e| ApiError::Malformed(e.to_string()))
            }
            None => Err(ApiError::Status {
                status: 404,
                body: r#"{"error": "User not found"}"#.to_string(),
            }),
        }
    }
}

fn create_panel(hint: &str) -> (Arc<FakeRoster>, QueryPanel) {
    let api = Arc::new(FakeRoster::new());
    let panel = QueryPanel::new(api.clone(), OrderHint::parse(hint));
    (api, panel)
}

#[tokio::test]
async fn test_open_table_renders_roster() {
    let (_, mut panel) = create_panel("RANK LASTNAME");

    let update = panel.open_table("roster").await;
    assert_eq!(update, PanelUpdate::Applied { statements: 1, rows: 2 });

    let outcome = panel.render().expect("query applied");
    let table = outcome.table().expect("rows expected");
    assert_eq!(
        table.columns,
        vec!["RANK", "LASTNAME", "BILMOS", "DOR", "EDIPI", "FIRSTNAME", "MI", "PMOS"]
    );
    assert_eq!(table.headers[0], "#");
    assert_eq!(table.rows[1][0], "2");
    // MI column is the 7th display column, after the row index
    assert_eq!(table.rows[1][7], "NULL");
}

#[tokio::test]
async fn test_changing_hint_rerenders_without_query() {
    let (_, mut panel) = create_panel("");
    panel.submit("SELECT * FROM mos;").await;

    let alphabetical = panel.render().unwrap();
    assert_eq!(alphabetical.table().unwrap().columns, vec!["BILMOS", "DESCRIPTION"]);

    panel.set_order_hint(OrderHint::parse("DESCRIPTION"));
    let hinted = panel.render().unwrap();
    assert_eq!(hinted.table().unwrap().columns, vec!["DESCRIPTION", "BILMOS"]);
}

#[tokio::test]
async fn test_empty_last_statement_shows_no_results() {
    let (_, mut panel) = create_panel("");
    panel.submit("SELECT * FROM roster;").await;
    panel.submit("UPDATE roster SET RANK = 'SSGT'; SELECT * FROM nowhere_empty;").await;

    assert_eq!(panel.render(), Some(RenderOutcome::Empty));
    assert_eq!(panel.export(ExportFormat::Json).unwrap(), "[]");
    assert_eq!(panel.export(ExportFormat::Csv).unwrap(), "");
}

#[tokio::test]
async fn test_export_matches_display_order() {
    let (_, mut panel) = create_panel("LASTNAME EDIPI");
    panel.submit("SELECT * FROM roster;").await;

    let csv = panel.export(ExportFormat::Csv).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("LASTNAME,EDIPI,BILMOS,DOR,FIRSTNAME,MI,PMOS,RANK")
    );
    assert_eq!(
        lines.next(),
        Some("Doe,1234567890,0369,20230101,Jane,Q,0311,SGT")
    );
    assert_eq!(lines.next(), Some("Roe,2345678901,0311,20240601,John,,0311,CPL"));

    let md = panel.export(ExportFormat::Markdown).unwrap();
    assert!(md.starts_with("| LASTNAME | EDIPI |"));
    assert!(md.contains("| Roe | 2345678901 | 0311 | 20240601 | John | NULL | 0311 | CPL |"));
}

#[tokio::test]
async fn test_failed_query_keeps_display_and_sets_banner() {
    let (_, mut panel) = create_panel("");
    panel.submit("SELECT * FROM mos;").await;
    let shown = panel.render();

    let update = panel.submit("SELECT * FROM missing;").await;
    assert!(matches!(update, PanelUpdate::Failed(ref msg) if msg.contains("400")));
    assert_eq!(panel.render(), shown);
    assert!(panel.error_banner().is_some());
    assert_eq!(panel.state(), PanelState::Idle);
}

#[tokio::test]
async fn test_table_refresh_failure_keeps_list() {
    let (api, mut panel) = create_panel("");
    assert_eq!(panel.refresh_tables().await.unwrap(), ["roster", "mos"]);

    api.tables_down.store(true, Ordering::SeqCst);
    assert!(panel.refresh_tables().await.is_err());
    assert_eq!(panel.tables(), ["roster", "mos"]);
    assert!(panel.error_banner().unwrap().contains("503"));
}

#[tokio::test]
async fn test_table_refresh_success_clears_banner() {
    let (api, mut panel) = create_panel("");
    api.tables_down.store(true, Ordering::SeqCst);
    assert!(panel.refresh_tables().await.is_err());
    assert!(panel.error_banner().is_some());

    api.tables_down.store(false, Ordering::SeqCst);
    assert!(panel.refresh_tables().await.is_ok());
    assert!(panel.error_banner().is_none());
}

#[tokio::test]
async fn test_superseded_request_never_overwrites_newer_result() {
    let (_, mut panel) = create_panel("");

    // The slow request is issued first but finishes last
    let slow = tokio::spawn(panel.dispatch("SELECT * FROM roster /* slow */;").run());
    let fast = tokio::spawn(panel.dispatch("SELECT * FROM mos;").run());

    let fast_done = fast.await.unwrap();
    assert_eq!(
        panel.apply(fast_done),
        PanelUpdate::Applied { statements: 1, rows: 1 }
    );

    let slow_done = slow.await.unwrap();
    assert_eq!(panel.apply(slow_done), PanelUpdate::Stale { seq: 1, latest: 2 });

    let outcome = panel.render().unwrap();
    assert_eq!(outcome.table().unwrap().columns, vec!["BILMOS", "DESCRIPTION"]);
    assert_eq!(panel.query_text(), "SELECT * FROM mos;");
}

#[tokio::test]
async fn test_session_established_through_api() {
    let api: Arc<dyn RosterApi> = Arc::new(FakeRoster::new());
    let resolver = ApiIdentityResolver::new(api);

    let session = Session::establish(&resolver, Some("2345678901")).await;
    let user = session.user().expect("profile resolved");
    assert_eq!(user.last_name.as_deref(), Some("Roe"));
    assert_eq!(user.bilmos.as_deref(), Some("0311"));

    let unknown = Session::establish(&resolver, Some("9999999999")).await;
    assert!(!unknown.is_resolved());
}
