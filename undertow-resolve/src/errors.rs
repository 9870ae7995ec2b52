//! Error types for source resolution.

use thiserror::Error;
use undertow_core::relay::RelayError;

/// Failure of one provider adapter operation.
///
/// Every variant is transient from the orchestrator's point of view: the
/// attempt is logged, nothing is negative-cached, and the search moves on
/// to the next candidate title or provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network failure or timeout reaching the upstream.
    #[error("network failure: {reason}")]
    Network {
        /// The reason for the transport failure
        reason: String,
    },

    /// Upstream answered with an unexpected status code.
    #[error("upstream returned HTTP {status} for {url}")]
    UpstreamStatus {
        /// The HTTP status code returned
        status: u16,
        /// The target URL that was requested
        url: String,
    },

    /// Upstream answered 2xx but the payload did not have the expected
    /// shape.
    #[error("unexpected upstream payload: {reason}")]
    Payload {
        /// The reason the payload could not be used
        reason: String,
    },
}

impl From<RelayError> for ProviderError {
    fn from(error: RelayError) -> Self {
        match error {
            RelayError::Request { reason } => ProviderError::Network { reason },
            RelayError::Status { status, url } => ProviderError::UpstreamStatus { status, url },
            RelayError::Decode { reason } => ProviderError::Payload { reason },
        }
    }
}

/// Errors from the metadata catalog client.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The catalog could not be reached or answered mid-sentence.
    #[error("metadata fetch failed: {reason}")]
    FetchFailed {
        /// The reason for the fetch failure
        reason: String,
    },

    /// The catalog has no entry under the requested id.
    #[error("media {id} not found in catalog")]
    NotFound {
        /// The requested catalog id
        id: u32,
    },
}
