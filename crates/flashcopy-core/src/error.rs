//! Error types for dispatching operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::OperationKind;

/// Reasons the coordinator refuses to dispatch a request.
///
/// Failures of a dispatched operation are never errors; they arrive as
/// outcomes with `success == false`.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Another operation holds the busy flag.
    #[error("{kind} rejected: another operation is in progress")]
    Busy { kind: OperationKind },

    /// The destination's parent directory could not be created.
    #[error("Failed to create destination directory {path}: {source}")]
    CreateDestination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The request itself is malformed.
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

impl DispatchError {
    /// Create an invalid-request error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Whether the request was refused because the coordinator was busy.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }
}
