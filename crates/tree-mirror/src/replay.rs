//! Mirror a JSON document through an in-memory store and serialize it back.
//!
//! Used by the `tree-mirror-replay` binary. The root is coerced like any other
//! node, so an untagged document comes back unchanged.

use serde_json::Value;
use tree_mirror_store::MemoryStore;

use crate::{coerce_with, MirrorError, MirrorOptions, ToJson};

pub fn replay_value(document: Value, options: &MirrorOptions) -> Result<Value, MirrorError> {
    options.validate()?;
    let store = MemoryStore::with_value(document);
    let root = coerce_with(&store.snapshot(""), options);
    let delivered = store.flush()?;
    tracing::debug!(delivered, mirror = ?root.mirror_type(), "document replayed");
    Ok(root.to_json())
}

pub fn replay_document(document: &str, options: &MirrorOptions) -> Result<Value, MirrorError> {
    let document: Value = serde_json::from_str(document)?;
    replay_value(document, options)
}
