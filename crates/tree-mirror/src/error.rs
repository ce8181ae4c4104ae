use thiserror::Error;
use tree_mirror_store::StoreError;

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("invalid discriminant key `{0}`")]
    InvalidTypeKey(String),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store write failed: {0}")]
    Store(#[from] StoreError),
}
