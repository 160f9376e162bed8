use crate::data::query_result::QueryResponse;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Failures at the HTTP boundary
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct QueryRequest<'a> {
    pub query: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TablesResponse {
    pub tables: Vec<String>,
}

/// Roster record as served by `/users/{id}`.
///
/// The backend returns raw SQLite column names (`FIRSTNAME`, `EDIPI`, ...);
/// cached profiles use camelCase. Both spellings are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, alias = "RANK")]
    pub rank: Option<String>,
    #[serde(default, alias = "FIRSTNAME")]
    pub first_name: Option<String>,
    #[serde(default, alias = "LASTNAME")]
    pub last_name: Option<String>,
    #[serde(default, alias = "MI")]
    pub mi: Option<String>,
    #[serde(default, alias = "EDIPI")]
    pub edipi: Option<String>,
    #[serde(default, alias = "DOR")]
    pub dor: Option<Value>,
    #[serde(default, alias = "PMOS")]
    pub pmos: Option<String>,
    #[serde(default, alias = "BILMOS")]
    pub bilmos: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Backend endpoints the console consumes
#[async_trait]
pub trait RosterApi: Send + Sync {
    async fn list_tables(&self) -> ApiResult<Vec<String>>;

    async fn run_query(&self, sql: &str) -> ApiResult<QueryResponse>;

    async fn get_user(&self, id: &str) -> ApiResult<UserProfile>;
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check the status, then decode the body into `T`
    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl RosterApi for ApiClient {
    async fn list_tables(&self) -> ApiResult<Vec<String>> {
        debug!("GET {}/tables", self.base_url);
        let response = self.client.get(self.url("/tables")).send().await?;
        let tables: TablesResponse = Self::decode(response).await?;
        Ok(tables.tables)
    }

    async fn run_query(&self, sql: &str) -> ApiResult<QueryResponse> {
        debug!("POST {}/query ({} chars)", self.base_url, sql.len());
        let response = self
            .client
            .post(self.url("/query"))
            .json(&QueryRequest { query: sql })
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn get_user(&self, id: &str) -> ApiResult<UserProfile> {
        debug!("GET {}/users/{}", self.base_url, id);
        let response = self
            .client
            .get(self.url(&format!("/users/{}", id)))
            .send()
            .await?;
        Self::decode(response).await
    }
}
