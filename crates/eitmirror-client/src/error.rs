//! Error types for eitmirror-client.

use eitmirror_core::DecodeError;
use thiserror::Error;

use crate::endpoint::Endpoint;

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors raised while talking to the host.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Connection, timeout or body read failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The host answered with a non-success status.
    #[error("host returned status {status} for {endpoint}")]
    Status { endpoint: Endpoint, status: u16 },

    /// The host address could not be parsed or joined with an endpoint path.
    #[error("invalid host address: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The response body could not be interpreted.
    #[error("invalid payload: {0}")]
    Payload(#[from] DecodeError),
}
