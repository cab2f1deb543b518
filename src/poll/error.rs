//! Error types for poll operations

use thiserror::Error;

use crate::aggregate::AggregationError;
use crate::codec::DecodeError;

/// Rejection of a poll operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    /// The poll no longer accepts responses
    #[error("poll is closed")]
    Closed,
    /// The poll was already closed (or is being closed)
    #[error("poll is already closed")]
    AlreadyClosed,
    /// The submitted ciphertext could not be decoded
    #[error("bad response payload: {0}")]
    BadPayload(#[from] DecodeError),
    /// The result could not be computed; the poll stays open
    #[error("aggregation failed: {0}")]
    Aggregation(#[from] AggregationError),
}

/// Result type for poll operations
pub type Result<T> = std::result::Result<T, PollError>;
