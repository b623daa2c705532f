use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use aiterm_types::{
    DirectoryResponse, ErrorBody, ExecuteRequest, ExecuteResponse, Executor, FeedbackResponse,
    HealthResponse, HistoryResponse, SearchRequest, SearchResponse,
};

use crate::config::ClientConfig;
use crate::error::TransportError;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// The one backend capability the session store depends on.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    async fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteResponse, TransportError>;
}

/// REST client for the command-execution backend.
#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl BackendClient {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            base_url: config.api_base_url.clone(),
            client,
            timeout: config.request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn execute_command(
        &self,
        command: &str,
        is_voice: bool,
        preferred_executor: Executor,
    ) -> Result<ExecuteResponse, TransportError> {
        let request = ExecuteRequest {
            command: command.to_string(),
            is_voice,
            preferred_executor,
        };
        self.execute(&request).await
    }

    pub async fn health(&self) -> Result<HealthResponse, TransportError> {
        self.send_json(self.client.get(self.url("/api/health")))
            .await
    }

    pub async fn current_directory(&self) -> Result<DirectoryResponse, TransportError> {
        self.send_json(self.client.get(self.url("/api/directory")))
            .await
    }

    pub async fn history(&self, limit: usize) -> Result<HistoryResponse, TransportError> {
        let rb = self
            .client
            .get(self.url("/api/history"))
            .query(&[("limit", limit)]);
        self.send_json(rb).await
    }

    pub async fn feedback(&self) -> Result<FeedbackResponse, TransportError> {
        self.send_json(self.client.get(self.url("/api/feedback")))
            .await
    }

    pub async fn search_files(
        &self,
        filename: &str,
        start_dir: Option<&str>,
    ) -> Result<SearchResponse, TransportError> {
        let body = SearchRequest {
            filename: filename.to_string(),
            start_dir: start_dir.map(str::to_string),
        };
        self.send_json(self.client.post(self.url("/api/search")).json(&body))
            .await
    }

    async fn send_json<T: DeserializeOwned>(&self, rb: RequestBuilder) -> Result<T, TransportError> {
        let resp = rb
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(e, self.timeout))?;
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(e, self.timeout))?;

        if !status.is_success() {
            let body_error = serde_json::from_slice::<ErrorBody>(&bytes)
                .ok()
                .and_then(|b| b.error);
            let err = TransportError::from_status(status.as_u16(), body_error);
            warn!(status = status.as_u16(), "backend request failed: {err}");
            return Err(err);
        }

        serde_json::from_slice::<T>(&bytes).map_err(|e| {
            debug!(len = bytes.len(), "failed to decode backend response: {e}");
            TransportError::Parse(e.to_string())
        })
    }
}

#[async_trait]
impl CommandTransport for BackendClient {
    async fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteResponse, TransportError> {
        self.send_json(self.client.post(self.url("/api/execute")).json(request))
            .await
    }
}
