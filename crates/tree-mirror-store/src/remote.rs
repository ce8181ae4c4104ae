use std::fmt;

use serde_json::Value;

use crate::{EventKind, Snapshot, StoreError};

pub type ListenerId = u64;

/// Callback registered for one notification kind on one address.
pub type Listener<R> = Box<dyn FnMut(&Snapshot<R>)>;

/// Write acknowledgement.
///
/// Receives the outcome of the write once the store has processed it. Any
/// error the completion returns is raised by the store's delivery loop, so a
/// completion that wants to propagate a failure simply returns it.
pub type Completion = Box<dyn FnOnce(Result<(), StoreError>) -> Result<(), StoreError>>;

/// Addressable handle to a node of a push-notifying hierarchical store.
///
/// Writes are fire-and-forget: they return immediately and resolve later.
/// When `on_complete` is `None`, a failed write must be raised by the store's
/// delivery loop instead of being discarded.
pub trait RemoteRef: Clone + fmt::Debug + 'static {
    /// Last path segment; empty for the root.
    fn key(&self) -> &str;

    /// Slash-separated absolute path, `/` for the root.
    fn path(&self) -> String;

    /// Handle to a descendant; `path` may hold several `/`-separated segments.
    fn child(&self, path: &str) -> Self;

    fn on(&self, kind: EventKind, listener: Listener<Self>) -> ListenerId;

    /// Returns `false` when no listener of that kind and id was registered here.
    fn off(&self, kind: EventKind, id: ListenerId) -> bool;

    fn set(&self, value: Value, on_complete: Option<Completion>);

    fn remove(&self, on_complete: Option<Completion>);

    /// Creates a child under a store-assigned key, available synchronously on
    /// the returned handle.
    fn push(&self, value: Value, on_complete: Option<Completion>) -> Self;
}
