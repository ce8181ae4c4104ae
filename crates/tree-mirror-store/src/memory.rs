//! In-memory hierarchical store with queued, push-style notifications.
//!
//! Writes and notifications are queued and only processed by
//! [`MemoryStore::flush`], which plays the role of an asynchronous transport on
//! a single thread: a caller never observes its own write until the echo is
//! delivered.
//!
//! Notification semantics:
//! - subscribing `ChildAdded` queues one event per existing child, subscribing
//!   `Value` queues the current value;
//! - after a write, every registration on an ancestor, the same path, or a
//!   descendant of the written path compares its node before and after and
//!   receives child events first, then value events;
//! - writing `null` removes the node, and empty parents are pruned.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::path;
use crate::{Completion, EventKind, Listener, ListenerId, RemoteRef, Snapshot, StoreError};

/// Shared handle to an in-memory store. Cloning yields another handle to the
/// same tree.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<Inner>>,
}

/// Address of a node inside a [`MemoryStore`].
#[derive(Clone)]
pub struct MemoryRef {
    inner: Rc<RefCell<Inner>>,
    segments: Vec<String>,
}

struct Registration {
    segments: Vec<String>,
    kind: EventKind,
    listener: Rc<RefCell<Listener<MemoryRef>>>,
}

enum WriteOp {
    Set(Value),
    Remove,
}

enum Task {
    Write {
        segments: Vec<String>,
        op: WriteOp,
        on_complete: Option<Completion>,
    },
    Deliver {
        listener: ListenerId,
        snapshot: Snapshot<MemoryRef>,
    },
}

struct Inner {
    root: Value,
    registrations: BTreeMap<ListenerId, Registration>,
    next_listener_id: ListenerId,
    next_push_id: u64,
    queue: VecDeque<Task>,
    rejections: Vec<(Vec<String>, String)>,
    flushing: bool,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            root: Value::Null,
            registrations: BTreeMap::new(),
            next_listener_id: 1,
            next_push_id: 1,
            queue: VecDeque::new(),
            rejections: Vec::new(),
            flushing: false,
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the tree with `value` without emitting notifications.
    pub fn with_value(value: Value) -> Self {
        let store = Self::new();
        store.inner.borrow_mut().root = value;
        store
    }

    pub fn root(&self) -> MemoryRef {
        self.reference("")
    }

    pub fn reference(&self, path: &str) -> MemoryRef {
        MemoryRef {
            inner: Rc::clone(&self.inner),
            segments: path::split(path),
        }
    }

    /// Current value at `path`, `Value::Null` when absent.
    pub fn value_at(&self, path: &str) -> Value {
        let inner = self.inner.borrow();
        path::value_at(&inner.root, &path::split(path))
            .cloned()
            .unwrap_or(Value::Null)
    }

    pub fn snapshot(&self, path: &str) -> Snapshot<MemoryRef> {
        let reference = self.reference(path);
        let value = self.value_at(path);
        Snapshot::new(reference.key().to_owned(), value, reference)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().registrations.len()
    }

    pub fn listener_count_at(&self, path: &str) -> usize {
        let segments = path::split(path);
        self.inner
            .borrow()
            .registrations
            .values()
            .filter(|reg| reg.segments == segments)
            .count()
    }

    /// Number of queued writes and deliveries.
    pub fn pending(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    /// Makes every later write at or below `prefix` fail with `reason`.
    pub fn reject_writes(&self, prefix: &str, reason: impl Into<String>) {
        self.inner
            .borrow_mut()
            .rejections
            .push((path::split(prefix), reason.into()));
    }

    pub fn clear_rejections(&self) {
        self.inner.borrow_mut().rejections.clear();
    }

    /// Processes queued writes and deliveries until the queue drains.
    ///
    /// Returns the number of notifications delivered. The first write failure
    /// that is not absorbed by a completion aborts the flush and is returned;
    /// the remaining queue stays intact for the next call. Calling `flush`
    /// from inside a listener does nothing.
    pub fn flush(&self) -> Result<usize, StoreError> {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.flushing {
                return Ok(0);
            }
            inner.flushing = true;
        }
        let outcome = self.drain();
        self.inner.borrow_mut().flushing = false;
        outcome
    }

    fn drain(&self) -> Result<usize, StoreError> {
        let mut delivered = 0;
        loop {
            let task = self.inner.borrow_mut().queue.pop_front();
            let Some(task) = task else {
                return Ok(delivered);
            };
            match task {
                Task::Write {
                    segments,
                    op,
                    on_complete,
                } => {
                    let outcome = self.apply_write(&segments, op);
                    let raised = match on_complete {
                        Some(on_complete) => on_complete(outcome),
                        None => outcome,
                    };
                    if let Err(err) = raised {
                        tracing::warn!(path = %path::join(&segments), error = %err, "write failed");
                        return Err(err);
                    }
                }
                Task::Deliver { listener, snapshot } => {
                    let listener = self
                        .inner
                        .borrow()
                        .registrations
                        .get(&listener)
                        .map(|reg| Rc::clone(&reg.listener));
                    if let Some(listener) = listener {
                        let mut callback = listener.borrow_mut();
                        (*callback)(&snapshot);
                        delivered += 1;
                    }
                }
            }
        }
    }

    fn apply_write(&self, segments: &[String], op: WriteOp) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        if let Some((_, reason)) = inner
            .rejections
            .iter()
            .find(|(prefix, _)| path::is_prefix(prefix, segments))
        {
            return Err(StoreError::Rejected {
                path: path::join(segments),
                reason: reason.clone(),
            });
        }
        let before = inner.root.clone();
        match op {
            WriteOp::Set(value) if !value.is_null() => path::insert(&mut inner.root, segments, value),
            WriteOp::Set(_) | WriteOp::Remove => {
                path::remove(&mut inner.root, segments);
            }
        }
        let tasks = notifications(&self.inner, &inner, segments, &before);
        inner.queue.extend(tasks);
        Ok(())
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("MemoryStore")
            .field("root", &inner.root)
            .field("listeners", &inner.registrations.len())
            .field("pending", &inner.queue.len())
            .finish()
    }
}

static NULL: Value = Value::Null;

fn notifications(
    shared: &Rc<RefCell<Inner>>,
    inner: &Inner,
    written: &[String],
    before: &Value,
) -> Vec<Task> {
    let mut child_tasks = Vec::new();
    let mut value_tasks = Vec::new();
    for (&id, reg) in &inner.registrations {
        if !path::is_prefix(&reg.segments, written) && !path::is_prefix(written, &reg.segments) {
            continue;
        }
        let old = path::value_at(before, &reg.segments).unwrap_or(&NULL);
        let new = path::value_at(&inner.root, &reg.segments).unwrap_or(&NULL);
        if old == new {
            continue;
        }
        let node = MemoryRef {
            inner: Rc::clone(shared),
            segments: reg.segments.clone(),
        };
        match reg.kind {
            EventKind::Value => value_tasks.push(Task::Deliver {
                listener: id,
                snapshot: Snapshot::new(node.key().to_owned(), new.clone(), node),
            }),
            kind => {
                for (key, value) in child_diff(kind, old, new) {
                    child_tasks.push(Task::Deliver {
                        listener: id,
                        snapshot: Snapshot::new(key.clone(), value, node.child(&key)),
                    });
                }
            }
        }
    }
    child_tasks.extend(value_tasks);
    child_tasks
}

fn child_diff(kind: EventKind, old: &Value, new: &Value) -> Vec<(String, Value)> {
    let empty = Map::new();
    let old = old.as_object().unwrap_or(&empty);
    let new = new.as_object().unwrap_or(&empty);
    match kind {
        EventKind::ChildAdded => new
            .iter()
            .filter(|(key, _)| !old.contains_key(*key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        EventKind::ChildRemoved => old
            .iter()
            .filter(|(key, _)| !new.contains_key(*key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        EventKind::ChildChanged => new
            .iter()
            .filter(|(key, value)| old.get(*key).is_some_and(|prev| prev != *value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        EventKind::Value => Vec::new(),
    }
}

impl MemoryRef {
    fn enqueue_write(&self, segments: Vec<String>, op: WriteOp, on_complete: Option<Completion>) {
        self.inner.borrow_mut().queue.push_back(Task::Write {
            segments,
            op,
            on_complete,
        });
    }
}

impl RemoteRef for MemoryRef {
    fn key(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    fn path(&self) -> String {
        path::join(&self.segments)
    }

    fn child(&self, path: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(path::split(path));
        Self {
            inner: Rc::clone(&self.inner),
            segments,
        }
    }

    fn on(&self, kind: EventKind, listener: Listener<Self>) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_listener_id;
        inner.next_listener_id = inner.next_listener_id.saturating_add(1);
        inner.registrations.insert(
            id,
            Registration {
                segments: self.segments.clone(),
                kind,
                listener: Rc::new(RefCell::new(listener)),
            },
        );
        let current = path::value_at(&inner.root, &self.segments)
            .cloned()
            .unwrap_or(Value::Null);
        match kind {
            EventKind::ChildAdded => {
                if let Value::Object(children) = &current {
                    for (key, value) in children {
                        inner.queue.push_back(Task::Deliver {
                            listener: id,
                            snapshot: Snapshot::new(key.clone(), value.clone(), self.child(key)),
                        });
                    }
                }
            }
            EventKind::Value => inner.queue.push_back(Task::Deliver {
                listener: id,
                snapshot: Snapshot::new(self.key().to_owned(), current, self.clone()),
            }),
            EventKind::ChildChanged | EventKind::ChildRemoved => {}
        }
        id
    }

    fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let matches = inner
            .registrations
            .get(&id)
            .is_some_and(|reg| reg.kind == kind && reg.segments == self.segments);
        if matches {
            inner.registrations.remove(&id);
        }
        matches
    }

    fn set(&self, value: Value, on_complete: Option<Completion>) {
        self.enqueue_write(self.segments.clone(), WriteOp::Set(value), on_complete);
    }

    fn remove(&self, on_complete: Option<Completion>) {
        self.enqueue_write(self.segments.clone(), WriteOp::Remove, on_complete);
    }

    fn push(&self, value: Value, on_complete: Option<Completion>) -> Self {
        let key = {
            let mut inner = self.inner.borrow_mut();
            let seq = inner.next_push_id;
            inner.next_push_id = inner.next_push_id.saturating_add(1);
            format!("-P{seq:010}")
        };
        let child = self.child(&key);
        self.enqueue_write(child.segments.clone(), WriteOp::Set(value), on_complete);
        child
    }
}

impl PartialEq for MemoryRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner) && self.segments == other.segments
    }
}

impl fmt::Debug for MemoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemoryRef({})", path::join(&self.segments))
    }
}
