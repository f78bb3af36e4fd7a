use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transaction::TransactionId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Transaction {0} already belongs to another transfer pair")]
    AlreadyPaired(TransactionId),
    #[error("Transactions do not form a transfer: {0}")]
    InvalidPair(String),
    #[error("Coverage update lost {attempts} concurrent write race(s)")]
    CoverageConflict { attempts: u32 },
    #[error("Upstream unavailable: {0}")]
    Upstream(String),
}

/// Stable, serializable tag for a [`ReconcileError`], reported per item in
/// bulk confirmation results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    NotFound,
    AlreadyPaired,
    InvalidPair,
    CoverageConflict,
    UpstreamUnavailable,
}

impl ReconcileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReconcileError::Validation(_) => ErrorKind::Validation,
            ReconcileError::NotFound(_) => ErrorKind::NotFound,
            ReconcileError::AlreadyPaired(_) => ErrorKind::AlreadyPaired,
            ReconcileError::InvalidPair(_) => ErrorKind::InvalidPair,
            ReconcileError::CoverageConflict { .. } => ErrorKind::CoverageConflict,
            ReconcileError::Upstream(_) => ErrorKind::UpstreamUnavailable,
        }
    }

    /// Whether repeating the same request may succeed without any change on
    /// the caller's side.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReconcileError::CoverageConflict { .. } | ReconcileError::Upstream(_)
        )
    }
}
