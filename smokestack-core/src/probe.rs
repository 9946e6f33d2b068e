//! Bounded HTTP probe for stack services.
//!
//! Thin `reqwest` wrapper used by every check and by the readiness waiter.
//! All requests carry an explicit connect timeout and total timeout so a
//! wedged service can never stall the harness indefinitely.

use crate::config::HttpConfig;
use crate::error::ProbeError;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// HTTP client with bounded connect/total timeouts.
#[derive(Debug, Clone)]
pub struct Probe {
    client: Client,
    request_timeout: Duration,
    chat_timeout: Duration,
}

impl Probe {
    /// Build a probe from the configured HTTP bounds.
    pub fn new(http: &HttpConfig) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(http.connect_timeout_secs))
            .timeout(Duration::from_secs(http.request_timeout_secs))
            .build()
            .map_err(|e| ProbeError::Client {
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            request_timeout: Duration::from_secs(http.request_timeout_secs),
            chat_timeout: Duration::from_secs(http.chat_timeout_secs),
        })
    }

    /// GET a URL and return the HTTP status code, whatever it is.
    ///
    /// Connection failures and timeouts are errors; any received status
    /// (including 4xx/5xx) is a successful observation.
    pub async fn status(&self, url: &str) -> Result<u16, ProbeError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_error(url, self.request_timeout, e))?;
        Ok(response.status().as_u16())
    }

    /// GET a URL, require a success status, and parse the body as JSON.
    pub async fn get_json(&self, url: &str) -> Result<Value, ProbeError> {
        debug!(url = url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_error(url, self.request_timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(|e| ProbeError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| ProbeError::Json {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// POST a JSON body, require a success status, and parse the response as JSON.
    ///
    /// Used for read-only search-index requests (`_search`, `_count`).
    pub async fn post_json(&self, url: &str, body: &Value) -> Result<Value, ProbeError> {
        debug!(url = url, "POST");
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_error(url, self.request_timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(|e| ProbeError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| ProbeError::Json {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// POST a chat-completion body and return the raw response text.
    ///
    /// Chat requests get the longer chat timeout; the raw text is returned
    /// so callers can parse it either as a JSON document (non-streaming) or
    /// as SSE lines (streaming).
    pub async fn post_chat(&self, url: &str, body: &Value) -> Result<String, ProbeError> {
        debug!(url = url, "POST (chat)");
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body)
            .timeout(self.chat_timeout)
            .send()
            .await
            .map_err(|e| self.map_error(url, self.chat_timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| ProbeError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Map a reqwest error to the probe error taxonomy.
    fn map_error(&self, url: &str, timeout: Duration, e: reqwest::Error) -> ProbeError {
        if e.is_timeout() {
            ProbeError::Timeout {
                url: url.to_string(),
                timeout_secs: timeout.as_secs(),
            }
        } else if e.is_builder() {
            ProbeError::Url {
                url: url.to_string(),
                message: e.to_string(),
            }
        } else {
            ProbeError::Connection {
                url: url.to_string(),
                message: e.to_string(),
            }
        }
    }
}
