//! Ordered mirrors of remote-keyed child sets.
//!
//! Elements are kept in a single insertion-ordered map from remote key to
//! mirrored element, so the key index and the content can never drift apart.
//! Local order is notification-arrival order: new children are appended at
//! the tail, removals close the gap, and changes replace in place.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tree_mirror_store::{EventKind, RemoteRef, Snapshot};

use crate::{coerce_with, Coerced, MirrorOptions, MirrorType, ObserverId, ScalarMap, SyncCore, SyncHooks, ToJson};

/// Chooses the local shape of each child of an [`OrderedCollection`].
pub trait ChildPolicy: 'static {
    const MIRROR_TYPE: MirrorType;

    fn coerce_child<R: RemoteRef>(snapshot: &Snapshot<R>, options: &MirrorOptions) -> Coerced<R>;
}

/// Children pick their own shape through their discriminant (`"array"`).
#[derive(Debug, Clone, Copy, Default)]
pub struct Dispatch;

impl ChildPolicy for Dispatch {
    const MIRROR_TYPE: MirrorType = MirrorType::Array;

    fn coerce_child<R: RemoteRef>(snapshot: &Snapshot<R>, options: &MirrorOptions) -> Coerced<R> {
        coerce_with(snapshot, options)
    }
}

/// Every child is a [`ScalarMap`], whatever its discriminant (`"objectArray"`).
#[derive(Debug, Clone, Copy, Default)]
pub struct Records;

impl ChildPolicy for Records {
    const MIRROR_TYPE: MirrorType = MirrorType::ObjectArray;

    fn coerce_child<R: RemoteRef>(snapshot: &Snapshot<R>, options: &MirrorOptions) -> Coerced<R> {
        Coerced::ScalarMap(ScalarMap::with_options(snapshot.reference().clone(), options))
    }
}

struct CollectionState<R: RemoteRef, P> {
    entries: IndexMap<String, Coerced<R>>,
    options: MirrorOptions,
    policy: PhantomData<fn() -> P>,
}

impl<R: RemoteRef, P: ChildPolicy> SyncHooks<R> for CollectionState<R, P> {
    fn child_added(&mut self, snapshot: &Snapshot<R>) {
        let element = P::coerce_child(snapshot, &self.options);
        if self
            .entries
            .insert(snapshot.key().to_owned(), element)
            .is_some()
        {
            tracing::debug!(key = snapshot.key(), "repeated add replaced element in place");
        }
    }

    fn child_removed(&mut self, snapshot: &Snapshot<R>) {
        if self.entries.shift_remove(snapshot.key()).is_none() {
            tracing::debug!(key = snapshot.key(), "remove for unknown key ignored");
        }
    }

    fn child_changed(&mut self, snapshot: &Snapshot<R>) {
        let Some(slot) = self.entries.get_mut(snapshot.key()) else {
            tracing::debug!(key = snapshot.key(), "change for unknown key ignored");
            return;
        };
        // A record mirror follows its own value subscription.
        if matches!(slot, Coerced::ScalarMap(_)) {
            return;
        }
        *slot = P::coerce_child(snapshot, &self.options);
    }
}

/// Mirror of an ordered remote node (`"array"`), generic over how children
/// are shaped.
pub struct OrderedCollection<R: RemoteRef, P: ChildPolicy = Dispatch> {
    state: Rc<RefCell<CollectionState<R, P>>>,
    core: SyncCore<R>,
}

/// Ordered mirror whose children are all [`ScalarMap`]s (`"objectArray"`).
pub type TypedOrderedCollection<R> = OrderedCollection<R, Records>;

impl<R: RemoteRef, P: ChildPolicy> OrderedCollection<R, P> {
    pub fn new(reference: R) -> Self {
        Self::with_options(reference, &MirrorOptions::default())
    }

    pub fn with_options(reference: R, options: &MirrorOptions) -> Self {
        let state = Rc::new(RefCell::new(CollectionState {
            entries: IndexMap::new(),
            options: options.clone(),
            policy: PhantomData,
        }));
        let core = SyncCore::activate(reference, P::MIRROR_TYPE, options, &state);
        Self { state, core }
    }

    pub fn reference(&self) -> &R {
        self.core.reference()
    }

    pub fn mirror_type(&self) -> MirrorType {
        P::MIRROR_TYPE
    }

    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().entries.is_empty()
    }

    /// Remote keys in local order.
    pub fn index(&self) -> Vec<String> {
        self.state.borrow().entries.keys().cloned().collect()
    }

    pub fn key_at(&self, position: usize) -> Option<String> {
        self.state
            .borrow()
            .entries
            .get_index(position)
            .map(|(key, _)| key.clone())
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.state.borrow().entries.get_index_of(key)
    }

    /// Borrows the element at `position`. The borrow must be released before
    /// the store delivers further notifications.
    pub fn get(&self, position: usize) -> Option<Ref<'_, Coerced<R>>> {
        Ref::filter_map(self.state.borrow(), |state| {
            state.entries.get_index(position).map(|(_, element)| element)
        })
        .ok()
    }

    pub fn get_by_key(&self, key: &str) -> Option<Ref<'_, Coerced<R>>> {
        Ref::filter_map(self.state.borrow(), |state| state.entries.get(key)).ok()
    }

    /// Wire form of every element, in local order.
    pub fn contents_json(&self) -> Vec<Value> {
        self.state
            .borrow()
            .entries
            .values()
            .map(ToJson::to_json)
            .collect()
    }

    /// Splice entry point: asks the store to delete the children at
    /// `[start, start + remove_count)` and to append each inserted value as a
    /// new child. Returns the references of the pushed children.
    ///
    /// Nothing changes locally until the echoes arrive, and inserted values
    /// land wherever the store orders them, not at `start`. Positions past the
    /// end are skipped.
    pub fn replace_content<T: ToJson>(&self, start: usize, remove_count: usize, inserted: &[T]) -> Vec<R> {
        let doomed: Vec<String> = {
            let state = self.state.borrow();
            (start..start.saturating_add(remove_count))
                .map_while(|position| state.entries.get_index(position).map(|(key, _)| key.clone()))
                .collect()
        };
        let reference = self.core.reference();
        for key in &doomed {
            reference.child(key).remove(None);
        }
        inserted
            .iter()
            .map(|value| reference.push(value.to_json(), None))
            .collect()
    }

    /// Appends `value` as a new remote child; the element shows up locally
    /// once the `added` echo arrives.
    pub fn push<T: ToJson>(&self, value: &T) -> R {
        self.core.reference().push(value.to_json(), None)
    }

    pub fn remove_at(&self, position: usize) {
        self.replace_content::<Value>(position, 1, &[]);
    }

    pub fn clear(&self) {
        self.replace_content::<Value>(0, self.len(), &[]);
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

    /// Releases this collection's subscriptions and those of every element.
    pub fn dispose(&mut self) {
        self.core.deactivate();
        let mut state = self.state.borrow_mut();
        for element in state.entries.values_mut() {
            element.dispose();
        }
    }
}

impl<R: RemoteRef, P: ChildPolicy> ToJson for OrderedCollection<R, P> {
    fn to_json(&self) -> Value {
        let state = self.state.borrow();
        let mut json: Map<String, Value> = state
            .entries
            .iter()
            .map(|(key, element)| (key.clone(), element.to_json()))
            .collect();
        json.insert(
            self.core.type_key().to_owned(),
            Value::from(P::MIRROR_TYPE.as_str()),
        );
        Value::Object(json)
    }
}

impl<R: RemoteRef, P: ChildPolicy> fmt::Debug for OrderedCollection<R, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedCollection")
            .field("reference", self.reference())
            .field("type", &P::MIRROR_TYPE)
            .field("index", &self.index())
            .finish()
    }
}
