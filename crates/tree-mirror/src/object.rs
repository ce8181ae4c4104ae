use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};
use tree_mirror_store::{Completion, EventKind, RemoteRef, Snapshot, StoreError};

use crate::{MirrorOptions, MirrorType, ObserverId, SyncCore, SyncHooks, ToJson};

/// Acknowledgement for [`ScalarMap::set`]: the write outcome, the path it was
/// written to, and the value.
pub type SetCallback = Box<dyn FnOnce(Result<(), StoreError>, &str, &Value)>;

struct ObjectState {
    content: Map<String, Value>,
    type_key: String,
}

impl<R: RemoteRef> SyncHooks<R> for ObjectState {
    // Value notifications carry the whole node, so this is an overwrite.
    fn value_changed(&mut self, snapshot: &Snapshot<R>) {
        self.content = match snapshot.value() {
            Value::Object(fields) => fields
                .iter()
                .filter(|(key, _)| **key != self.type_key)
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            _ => Map::new(),
        };
    }
}

/// Mirror of a flat key → value node (`"object"`).
pub struct ScalarMap<R: RemoteRef> {
    state: Rc<RefCell<ObjectState>>,
    core: SyncCore<R>,
}

impl<R: RemoteRef> ScalarMap<R> {
    pub fn new(reference: R) -> Self {
        Self::with_options(reference, &MirrorOptions::default())
    }

    pub fn with_options(reference: R, options: &MirrorOptions) -> Self {
        let state = Rc::new(RefCell::new(ObjectState {
            content: Map::new(),
            type_key: options.type_key.clone(),
        }));
        let core = SyncCore::activate(reference, MirrorType::Object, options, &state);
        Self { state, core }
    }

    pub fn reference(&self) -> &R {
        self.core.reference()
    }

    /// Fields last observed remotely, without the discriminant.
    pub fn content(&self) -> Map<String, Value> {
        self.state.borrow().content.clone()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.state.borrow().content.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().content.is_empty()
    }

    /// Writes `value` under `key`, where each `.` in `key` descends one level.
    ///
    /// Local content is untouched until the store echoes the change. Without a
    /// callback, a failed write is raised by the store's delivery loop.
    pub fn set(&self, key: &str, value: Value, callback: Option<SetCallback>) {
        let path = key.replace('.', "/");
        let target = self.core.reference().child(&path);
        let echoed = value.clone();
        let completion: Completion = Box::new(move |result: Result<(), StoreError>| match callback {
            Some(callback) => {
                callback(result, path.as_str(), &echoed);
                Ok(())
            }
            None => result,
        });
        target.set(value, Some(completion));
    }

    pub fn on_event<F>(&self, kind: EventKind, observer: F) -> ObserverId
    where
        F: FnMut(&Snapshot<R>) + 'static,
    {
        self.core.on_event(kind, observer)
    }

    pub fn off_event(&self, id: ObserverId) -> bool {
        self.core.off_event(id)
    }

    pub fn is_active(&self) -> bool {
        self.core.is_active()
    }

    pub fn dispose(&mut self) {
        self.core.deactivate();
    }
}

impl<R: RemoteRef> ToJson for ScalarMap<R> {
    fn to_json(&self) -> Value {
        let mut json = self.content();
        json.insert(
            self.core.type_key().to_owned(),
            Value::from(MirrorType::Object.as_str()),
        );
        Value::Object(json)
    }
}

impl<R: RemoteRef> fmt::Debug for ScalarMap<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarMap")
            .field("reference", self.reference())
            .field("content", &self.state.borrow().content)
            .finish()
    }
}
