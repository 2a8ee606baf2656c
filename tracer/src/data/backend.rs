//! HTTP client for the trace collector backend.
//!
//! Thin, stateless plumbing around the core: authenticate an API key,
//! resolve a project id, persist span records. Delivery is best-effort;
//! callers decide what a failed write means.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;

use crate::core::config::BackendConfig;
use crate::data::error::{BackendError, SinkError};
use crate::data::record::SpanRecord;
use crate::data::sink::SpanSink;

/// Body snippet length kept in API error messages.
const ERROR_BODY_MAX_CHARS: usize = 200;

/// Organization info returned by a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInfo {
    #[serde(default)]
    pub org_name: Option<String>,
}

/// Bearer-authenticated JSON client for the collector API.
pub struct ApiClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl ApiClient {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(BackendError::MissingCredentials)?;
        Ok(Self {
            http: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Validate the API key.
    pub async fn login(&self) -> Result<LoginInfo, BackendError> {
        let response = self
            .http
            .post(format!("{}/api/apikey/login", self.api_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        Ok(Self::checked(response).await?.json().await?)
    }

    /// Resolve (creating if needed) the project spans are filed under.
    pub async fn register_project(&self, name: &str) -> Result<String, BackendError> {
        #[derive(Deserialize)]
        struct Registered {
            project: RegisteredProject,
        }
        #[derive(Deserialize)]
        struct RegisteredProject {
            id: String,
        }

        let response = self
            .http
            .post(format!("{}/api/project/register", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&json!({ "project_name": name }))
            .send()
            .await?;
        let registered: Registered = Self::checked(response).await?.json().await?;
        if registered.project.id.is_empty() {
            return Err(BackendError::MalformedResponse(
                "project register returned an empty id".to_string(),
            ));
        }
        Ok(registered.project.id)
    }

    /// Persist one span record, returning the backend row id when provided.
    pub async fn insert_span(
        &self,
        project_id: &str,
        record: &SpanRecord,
    ) -> Result<Option<String>, BackendError> {
        #[derive(Deserialize)]
        struct Inserted {
            #[serde(default)]
            row_ids: Vec<String>,
        }

        let response = self
            .http
            .post(format!(
                "{}/v1/project_logs/{}/insert",
                self.api_url, project_id
            ))
            .bearer_auth(&self.api_key)
            .json(&json!({ "events": [record] }))
            .send()
            .await?;
        let inserted: Inserted = Self::checked(response).await?.json().await?;
        Ok(inserted.row_ids.into_iter().next())
    }

    async fn checked(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(BackendError::Api {
            status: status.as_u16(),
            message: crate::utils::string::truncate_chars(&message, ERROR_BODY_MAX_CHARS),
        })
    }
}

/// Backend-backed [`SpanSink`].
///
/// Accepted records are mirrored in memory so the two-method sink contract
/// holds for downstream inspection; rejected records are reported through
/// [`SinkError`] and not mirrored.
pub struct BackendSpanSink {
    client: ApiClient,
    project_id: String,
    accepted: Mutex<Vec<SpanRecord>>,
}

impl BackendSpanSink {
    /// Resolve the configured project and build a sink bound to it.
    pub async fn connect(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = ApiClient::new(config)?;
        let project_id = client.register_project(&config.project).await?;
        tracing::debug!(project_id = %project_id, "connected to trace backend");
        Ok(Self {
            client,
            project_id,
            accepted: Mutex::new(Vec::new()),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }
}

#[async_trait]
impl SpanSink for BackendSpanSink {
    async fn insert_span(&self, record: SpanRecord) -> Result<Option<String>, SinkError> {
        let row_id = self.client.insert_span(&self.project_id, &record).await?;
        self.accepted.lock().push(record);
        Ok(row_id)
    }

    async fn spans(&self) -> Vec<SpanRecord> {
        self.accepted.lock().clone()
    }
}
