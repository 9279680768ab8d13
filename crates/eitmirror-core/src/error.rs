//! Error types for decoding host payloads.

use thiserror::Error;

/// Errors produced while decoding vertex or color payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload length is not a whole number of records.
    #[error("buffer of {len} bytes is not a multiple of the {stride}-byte record stride")]
    TruncatedBuffer { len: usize, stride: usize },

    /// Payload decoded to zero records.
    #[error("buffer contains no records")]
    EmptyBuffer,

    /// Update payload does not match the established record count.
    #[error("record count mismatch: expected {expected}, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    /// Electrodes config payload is not valid JSON.
    #[error("invalid electrodes config: {0}")]
    InvalidElectrodesConfig(String),
}

/// A specialized Result type for decode operations.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
