//! Protocol-level errors for lane record decoding.

use thiserror::Error;

/// Record decoding errors with diagnostic context.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Fragment is too small to contain the expected record.
    #[error("message too small: need {need} bytes, got {got}")]
    MessageTooSmall { need: usize, got: usize },

    /// Wire value does not map to a known DC event kind.
    #[error("invalid DC event kind on wire: {0}")]
    InvalidEventKind(i32),

    /// Wire value does not map to a known trading signal.
    #[error("invalid trading signal on wire: {0}")]
    InvalidSignalType(i32),
}
