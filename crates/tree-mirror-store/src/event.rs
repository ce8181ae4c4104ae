use serde_json::Value;

/// Notification kinds a [`RemoteRef`](crate::RemoteRef) can be subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    ChildAdded,
    ChildChanged,
    ChildRemoved,
    Value,
}

impl EventKind {
    /// Subscription order used by mirrors.
    pub const ALL: [EventKind; 4] = [
        EventKind::ChildAdded,
        EventKind::ChildChanged,
        EventKind::ChildRemoved,
        EventKind::Value,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::ChildAdded => "child_added",
            EventKind::ChildChanged => "child_changed",
            EventKind::ChildRemoved => "child_removed",
            EventKind::Value => "value",
        }
    }
}

/// Point-in-time view of a remote node: its key, value, and address.
///
/// Child events carry the child's snapshot; value events carry the snapshot of
/// the subscribed node itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<R> {
    key: String,
    value: Value,
    reference: R,
}

impl<R> Snapshot<R> {
    pub fn new(key: impl Into<String>, value: Value, reference: R) -> Self {
        Self {
            key: key.into(),
            value,
            reference,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn reference(&self) -> &R {
        &self.reference
    }

    /// `false` when the node holds no value (absent or deleted).
    pub fn exists(&self) -> bool {
        !self.value.is_null()
    }
}
