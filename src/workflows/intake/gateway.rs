use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::domain::Application;
use crate::config::BackendConfig;

pub const CONNECTIVITY_MESSAGE: &str =
    "Unable to reach the server. Please check your internet connection and try again.";
pub const FALLBACK_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Fragments of transport error text that mean the backend was never reached.
const UNREACHABLE_PATTERNS: [&str; 6] = [
    "failed to fetch",
    "networkerror",
    "network error",
    "connection refused",
    "network is unreachable",
    "dns error",
];

/// Why an insert did not go through.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InsertError {
    #[error("backend unreachable: {detail}")]
    Connectivity { detail: String },
    #[error("backend rejected the insert with code {code}: {message}")]
    Backend { code: String, message: String },
    #[error("insert failed: {}", .0.as_deref().unwrap_or("no detail"))]
    Unknown(Option<String>),
}

impl InsertError {
    /// Classify an opaque error from its text and optional structured code.
    pub fn classify(message: Option<&str>, code: Option<&str>) -> Self {
        let message = message.map(str::trim).filter(|text| !text.is_empty());

        if let Some(text) = message {
            let lowered = text.to_ascii_lowercase();
            if UNREACHABLE_PATTERNS
                .iter()
                .any(|pattern| lowered.contains(pattern))
            {
                return Self::Connectivity {
                    detail: text.to_string(),
                };
            }
        }

        match (code.map(str::trim).filter(|code| !code.is_empty()), message) {
            (Some(code), message) => Self::Backend {
                code: code.to_string(),
                message: message.unwrap_or("no message").to_string(),
            },
            (None, Some(text)) => Self::Unknown(Some(text.to_string())),
            (None, None) => Self::Unknown(None),
        }
    }

    /// Text shown to the applicant in the error notification.
    pub fn user_message(&self) -> String {
        match self {
            Self::Connectivity { .. } => CONNECTIVITY_MESSAGE.to_string(),
            Self::Backend { code, message } => format!("Database error: {message} (code {code})"),
            Self::Unknown(Some(message)) => message.clone(),
            Self::Unknown(None) => FALLBACK_MESSAGE.to_string(),
        }
    }
}

/// Remote insert API for application rows.
#[async_trait]
pub trait ApplicationGateway: Send + Sync {
    /// Insert `rows` in one request. The form always sends exactly one row.
    async fn insert(&self, rows: Vec<Application>) -> Result<(), InsertError>;
}

/// Error body returned by PostgREST-style table APIs.
#[derive(Debug, Default, Deserialize)]
struct RestErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

/// Gateway posting rows to `{base_url}/rest/v1/{table}`.
#[derive(Debug, Clone)]
pub struct RestApplicationGateway {
    client: Client,
    endpoint: String,
}

impl RestApplicationGateway {
    pub fn new(config: &BackendConfig) -> Result<Self, InsertError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("prefer", HeaderValue::from_static("return=minimal"));
        if !config.api_key.is_empty() {
            let key = HeaderValue::from_str(&config.api_key)
                .map_err(|err| InsertError::Unknown(Some(format!("invalid API key: {err}"))))?;
            let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .map_err(|err| InsertError::Unknown(Some(format!("invalid API key: {err}"))))?;
            headers.insert("apikey", key);
            headers.insert(AUTHORIZATION, bearer);
        }

        let client = Client::builder()
            .user_agent(concat!("creator-intake/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| InsertError::Unknown(Some(format!("failed to build HTTP client: {err}"))))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/rest/v1/{}",
                config.base_url.trim_end_matches('/'),
                config.table
            ),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(err: reqwest::Error) -> InsertError {
        if err.is_connect() || err.is_timeout() {
            return InsertError::Connectivity {
                detail: err.to_string(),
            };
        }
        InsertError::classify(Some(&err.to_string()), None)
    }
}

#[async_trait]
impl ApplicationGateway for RestApplicationGateway {
    async fn insert(&self, rows: Vec<Application>) -> Result<(), InsertError> {
        debug!(rows = rows.len(), endpoint = %self.endpoint, "inserting application rows");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&rows)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status();
        if status.is_success() {
            info!(status = status.as_u16(), "application rows inserted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let error = rejection(status, &body);
        warn!(status = status.as_u16(), error = %error, "backend rejected application insert");
        debug!(body = %body, "rejected insert response body");
        Err(error)
    }
}

/// Classify a non-success response. Only the JSON error body is surfaced; other
/// bodies (proxy HTML pages and the like) are reduced to the status line.
fn rejection(status: StatusCode, body: &str) -> InsertError {
    let parsed: RestErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .or(parsed.details)
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| format!("request failed with status {status}"));

    InsertError::classify(Some(&message), parsed.code.as_deref())
}
