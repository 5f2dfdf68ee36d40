//! Authenticated HTTP access to the two external services.
//!
//! [`TransportClient`] is a configuration holder: one pooled
//! `reqwest::Client`, plus an [`ServiceEndpoint`] (base URL + bearer token)
//! for each service. The pipeline stages build their own requests through it
//! and hand the response to [`TransportClient::send`], which applies the one
//! shared rule: any non-2xx status becomes [`MedOcrError::Api`] carrying the
//! status and body.

use crate::config::ProcessorConfig;
use crate::error::MedOcrError;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Service name used for the OCR endpoint in errors and logs.
pub const OCR_SERVICE: &str = "Mistral OCR";
/// Service name used for the chat endpoint in errors and logs.
pub const CHAT_SERVICE: &str = "Groq chat";

/// One remote service: where it lives and how to authenticate.
#[derive(Clone)]
pub struct ServiceEndpoint {
    name: &'static str,
    base_url: String,
    api_key: String,
}

impl ServiceEndpoint {
    pub fn new(name: &'static str, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            name,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join the base URL with `path` (which must start with `/`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl fmt::Debug for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceEndpoint")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Holds the HTTP client and both service endpoints.
#[derive(Debug, Clone)]
pub struct TransportClient {
    http: Client,
    ocr: ServiceEndpoint,
    chat: ServiceEndpoint,
}

impl TransportClient {
    /// Build from a validated [`ProcessorConfig`].
    pub fn new(config: &ProcessorConfig) -> Result<Self, MedOcrError> {
        let http = Client::builder()
            .user_agent(concat!("edgequake-medocr/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MedOcrError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            ocr: ServiceEndpoint::new(
                OCR_SERVICE,
                &config.ocr_base_url,
                &config.credentials.ocr_api_key,
            ),
            chat: ServiceEndpoint::new(
                CHAT_SERVICE,
                &config.chat_base_url,
                &config.credentials.chat_api_key,
            ),
        })
    }

    pub fn ocr(&self) -> &ServiceEndpoint {
        &self.ocr
    }

    pub fn chat(&self) -> &ServiceEndpoint {
        &self.chat
    }

    /// Authenticated POST against `endpoint`.
    pub fn post(&self, endpoint: &ServiceEndpoint, path: &str) -> RequestBuilder {
        self.http
            .post(endpoint.url(path))
            .bearer_auth(&endpoint.api_key)
    }

    /// Authenticated GET against `endpoint`.
    pub fn get(&self, endpoint: &ServiceEndpoint, path: &str) -> RequestBuilder {
        self.http
            .get(endpoint.url(path))
            .bearer_auth(&endpoint.api_key)
    }

    /// Send `request`, reject non-2xx statuses, and decode the JSON body.
    ///
    /// `timeout` is applied to this request only; `None` waits indefinitely.
    pub async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &ServiceEndpoint,
        request: RequestBuilder,
        timeout: Option<Duration>,
    ) -> Result<T, MedOcrError> {
        let timeout_secs = timeout.map(|t| t.as_secs());
        let request = match timeout {
            Some(t) => request.timeout(t),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| MedOcrError::from_reqwest(endpoint.name, e, timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MedOcrError::Api {
                service: endpoint.name.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MedOcrError::from_reqwest(endpoint.name, e, timeout_secs))?;
        debug!("{} responded {} ({} bytes)", endpoint.name, status, bytes.len());

        serde_json::from_slice(&bytes).map_err(|e| MedOcrError::MalformedResponse {
            service: endpoint.name.to_string(),
            detail: e.to_string(),
        })
    }
}
