//! Relay HTTP transport used by the provider adapters
//!
//! Wraps a shared `reqwest` client with the configured timeout and user
//! agent. When a relay base URL is configured, every request is routed
//! through it with the target URL as an encoded query parameter; browser
//! deployments use this to sidestep upstream CORS and referrer checks.
//! The relay forwards status codes and bodies transparently, so error
//! mapping is identical with or without it.

use serde_json::Value;
use thiserror::Error;

use crate::config::NetworkConfig;

/// Errors produced by the relay transport.
///
/// Timeouts surface as `Request` like any other network failure; the
/// caller treats both as transient.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Request could not be sent or timed out.
    #[error("request failed: {reason}")]
    Request {
        /// The reason for the transport failure
        reason: String,
    },

    /// Upstream answered with a non-success status.
    #[error("upstream returned HTTP {status} for {url}")]
    Status {
        /// The HTTP status code returned
        status: u16,
        /// The target URL that was requested
        url: String,
    },

    /// Response body was not the expected JSON.
    #[error("response decode failed: {reason}")]
    Decode {
        /// The reason for the decode failure
        reason: String,
    },
}

impl RelayError {
    /// True when the upstream responded 404 for the target.
    ///
    /// Adapters use this to tell "entity absent from catalog" apart from
    /// transient transport trouble.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RelayError::Status { status: 404, .. })
    }
}

/// HTTP client every adapter call goes through.
#[derive(Debug, Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    relay_base: Option<String>,
}

impl RelayClient {
    /// Builds the shared client from network configuration.
    ///
    /// # Errors
    /// - `RelayError::Request` - the underlying HTTP client could not be
    ///   constructed (TLS backend initialization failure)
    pub fn new(config: &NetworkConfig) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| RelayError::Request {
                reason: format!("client construction failed: {e}"),
            })?;

        Ok(Self {
            client,
            relay_base: config.relay_base.clone(),
        })
    }

    /// Rewrites `target` through the relay when one is configured.
    fn request_url(&self, target: &str) -> String {
        match &self.relay_base {
            Some(base) => format!(
                "{}?url={}",
                base.trim_end_matches('/'),
                urlencoding::encode(target)
            ),
            None => target.to_string(),
        }
    }

    /// GET `target` and decode the JSON body.
    ///
    /// # Errors
    /// - `RelayError::Request` - network failure or timeout
    /// - `RelayError::Status` - upstream returned non-2xx
    /// - `RelayError::Decode` - body was not valid JSON
    pub async fn get_json(&self, target: &str) -> Result<Value, RelayError> {
        let request = self.client.get(self.request_url(target));
        self.execute(target, request).await
    }

    /// GET `target` with an explicit referer header.
    ///
    /// # Errors
    /// Same as [`RelayClient::get_json`].
    pub async fn get_json_with_referer(
        &self,
        target: &str,
        referer: &str,
    ) -> Result<Value, RelayError> {
        let request = self
            .client
            .get(self.request_url(target))
            .header(reqwest::header::REFERER, referer);
        self.execute(target, request).await
    }

    /// POST a JSON body to `target` and decode the JSON response.
    ///
    /// # Errors
    /// Same as [`RelayClient::get_json`].
    pub async fn post_json(&self, target: &str, body: &Value) -> Result<Value, RelayError> {
        let request = self.client.post(self.request_url(target)).json(body);
        self.execute(target, request).await
    }

    async fn execute(
        &self,
        target: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, RelayError> {
        let response = request.send().await.map_err(|e| RelayError::Request {
            reason: format!("{target}: {e}"),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Status {
                status: status.as_u16(),
                url: target.to_string(),
            });
        }

        response.json().await.map_err(|e| RelayError::Decode {
            reason: format!("{target}: {e}"),
        })
    }
}
