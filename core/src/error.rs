//! Error types for the ServiceNow table client.
//!
//! # Design
//! Failures are split by where they happen so a caller can tell "the request
//! never reached the server" (`TransportError`, `EncodingError`) apart from
//! "the server answered with something unusable" (`RemoteError`,
//! `DecodingError`). Bodies of error responses are never kept: `RemoteError`
//! carries only the status code.

use thiserror::Error;

/// Errors returned by `TableClient` and its transports.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A construction argument was empty or the base URL is unusable.
    #[error("invalid configuration: {0}")]
    ConfigurationError(&'static str),

    /// The request could not be sent or the response could not be received.
    #[error("transport failed: {0}")]
    TransportError(String),

    /// The server answered with a status code of 400 or above.
    #[error("ServiceNow returned the HTTP error code: {status}")]
    RemoteError { status: u16 },

    /// The outgoing record could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    EncodingError(String),

    /// The response body did not match the expected JSON envelope.
    #[error("deserialization failed: {0}")]
    DecodingError(String),

    /// An update was attempted on a record that has no `sys_id`.
    #[error("record has no sys_id to update")]
    MissingSysId,
}

pub type Result<T> = std::result::Result<T, ApiError>;
