//! Remote hierarchical store interface consumed by `tree-mirror`.
//!
//! The mirrors only rely on [`RemoteRef`]: child addressing, four
//! notification kinds, and fire-and-forget writes. [`MemoryStore`] is a
//! single-threaded implementation with queued delivery, used by tests and by
//! the replay tool.

mod error;
mod event;
pub mod memory;
pub mod path;
mod remote;

pub use error::StoreError;
pub use event::{EventKind, Snapshot};
pub use memory::{MemoryRef, MemoryStore};
pub use remote::{Completion, Listener, ListenerId, RemoteRef};
