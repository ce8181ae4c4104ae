use thiserror::Error;

/// Failure reported by a store for a write it could not persist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("write to `{path}` rejected: {reason}")]
    Rejected { path: String, reason: String },
}
