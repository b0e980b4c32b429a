//! Generation backend HTTP client.

use std::time::Duration;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use aivid_models::{parse_remote_url, GenerationId, GenerationUpdate, Template};

use crate::error::{ApiError, ApiResult};
use crate::types::{ApiEnvelope, SubmissionData, SubmitRequest};

/// Configuration for the generation backend client.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the backend
    pub base_url: String,
    /// Bearer token sent with every request
    pub bearer_token: Option<String>,
    /// Engine tag requested from the template endpoint
    pub engine_tag: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            bearer_token: None,
            engine_tag: "pv".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("AIVID_API_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            bearer_token: std::env::var("AIVID_API_TOKEN").ok(),
            engine_tag: std::env::var("AIVID_API_ENGINE").unwrap_or_else(|_| "pv".to_string()),
            timeout: Duration::from_secs(
                std::env::var("AIVID_API_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }
}

/// Client for the generation backend.
pub struct GenerationClient {
    http: Client,
    config: ApiConfig,
}

impl GenerationClient {
    /// Create a new client.
    pub fn new(config: ApiConfig) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ApiError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ApiResult<Self> {
        Self::new(ApiConfig::from_env())
    }

    /// Submit a generation job; returns the server-assigned job ID.
    pub async fn submit_generation(&self, request: &SubmitRequest) -> ApiResult<GenerationId> {
        let url = format!("{}/generate", self.config.base_url);

        let mut form = Form::new()
            .text("userId", request.user_id.clone())
            .text("appId", request.app_id.clone());

        if let Some(template_id) = &request.template_id {
            form = form.text("templateId", template_id.clone());
        }
        if let Some(prompt) = &request.prompt {
            form = form.text("prompt", prompt.clone());
        }
        if let Some(image) = &request.image {
            let part = Part::bytes(image.bytes.clone())
                .file_name(image.file_name.clone())
                .mime_str("image/jpeg")
                .map_err(ApiError::Network)?;
            form = form.part("image", part);
        }

        debug!(url = %url, "Submitting generation job");

        let response = self
            .authorized(self.http.post(&url))
            .query(&[("format", "json")])
            .multipart(form)
            .send()
            .await?;

        let envelope: ApiEnvelope<SubmissionData> = self.decode(response).await?;
        Ok(envelope.data.generation_id)
    }

    /// Query the status of an in-flight generation job.
    pub async fn generation_status(&self, id: &GenerationId) -> ApiResult<GenerationUpdate> {
        let url = format!("{}/generationStatus", self.config.base_url);

        let response = self
            .authorized(self.http.get(&url))
            .query(&[("format", "json"), ("generationId", id.as_str())])
            .send()
            .await?;

        let envelope: ApiEnvelope<GenerationUpdate> = self.decode(response).await?;
        Ok(envelope.data)
    }

    /// Fetch the full template catalog for an application.
    pub async fn fetch_templates(&self, app_id: &str) -> ApiResult<Vec<Template>> {
        let url = format!("{}/templates", self.config.base_url);

        let response = self
            .authorized(self.http.get(&url))
            .query(&[("appName", app_id), ("ai[]", self.config.engine_tag.as_str())])
            .send()
            .await?;

        let envelope: ApiEnvelope<Vec<Template>> = self.decode(response).await?;
        if envelope.data.is_empty() {
            debug!(app_id = %app_id, "Received empty template list");
        }
        Ok(envelope.data)
    }

    /// Download a blob from an arbitrary http(s) URL.
    pub async fn download(&self, url: &str) -> ApiResult<Bytes> {
        let url = parse_remote_url(url)?;

        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(url = %url, status = %status, "Blob download failed");
            return Err(ApiError::Status { status, body });
        }

        Ok(response.bytes().await?)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Check the HTTP status and unwrap the response envelope.
    async fn decode<T: DeserializeOwned>(&self, response: Response) -> ApiResult<ApiEnvelope<T>> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }

        let envelope: ApiEnvelope<T> = response.json().await?;
        if envelope.error {
            return Err(ApiError::Api(envelope.messages.join("; ")));
        }

        Ok(envelope)
    }
}
