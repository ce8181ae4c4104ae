//! Subscription and dispatch plumbing shared by every mirror shape.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tree_mirror_store::{EventKind, Listener, ListenerId, RemoteRef, Snapshot};

use crate::{MirrorOptions, MirrorType};

/// Shape-specific reactions to remote notifications. Every hook defaults to a
/// no-op.
pub trait SyncHooks<R: RemoteRef> {
    fn child_added(&mut self, _snapshot: &Snapshot<R>) {}

    fn child_changed(&mut self, _snapshot: &Snapshot<R>) {}

    fn child_removed(&mut self, _snapshot: &Snapshot<R>) {}

    fn value_changed(&mut self, _snapshot: &Snapshot<R>) {}
}

/// Names of the [`SyncHooks`] methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    ChildAdded,
    ChildChanged,
    ChildRemoved,
    ValueChanged,
}

impl Hook {
    pub fn invoke<R: RemoteRef, H: SyncHooks<R> + ?Sized>(self, hooks: &mut H, snapshot: &Snapshot<R>) {
        match self {
            Hook::ChildAdded => hooks.child_added(snapshot),
            Hook::ChildChanged => hooks.child_changed(snapshot),
            Hook::ChildRemoved => hooks.child_removed(snapshot),
            Hook::ValueChanged => hooks.value_changed(snapshot),
        }
    }
}

pub type ObserverId = u64;

type Observer<R> = Rc<RefCell<Box<dyn FnMut(&Snapshot<R>)>>>;

struct Observers<R> {
    next_id: ObserverId,
    entries: BTreeMap<ObserverId, (EventKind, Observer<R>)>,
}

impl<R> Default for Observers<R> {
    fn default() -> Self {
        Self {
            next_id: 1,
            entries: BTreeMap::new(),
        }
    }
}

fn emit<R>(observers: &RefCell<Observers<R>>, kind: EventKind, snapshot: &Snapshot<R>) {
    // Collected first so observers may (un)register observers while running.
    let targets: Vec<Observer<R>> = observers
        .borrow()
        .entries
        .values()
        .filter(|(observed, _)| *observed == kind)
        .map(|(_, observer)| Rc::clone(observer))
        .collect();
    for observer in targets {
        let mut callback = observer.borrow_mut();
        (*callback)(snapshot);
    }
}

/// Binds a mirror to its remote node.
///
/// Activation writes the mirror's type tag to the discriminant child and
/// subscribes the four notification kinds. Notifications about the
/// discriminant child are dropped; the rest raise an event for external
/// observers and then reach the hook chosen by [`MirrorOptions::routing`].
///
/// Hooks are held weakly, so the owning mirror controls their lifetime.
/// Deactivation (explicit or on drop) releases the subscriptions exactly once,
/// and no hook or observer runs afterwards.
pub struct SyncCore<R: RemoteRef> {
    reference: R,
    mirror_type: MirrorType,
    type_key: String,
    subscriptions: Vec<(EventKind, ListenerId)>,
    observers: Rc<RefCell<Observers<R>>>,
    active: Rc<Cell<bool>>,
}

impl<R: RemoteRef> SyncCore<R> {
    pub fn activate<H>(
        reference: R,
        mirror_type: MirrorType,
        options: &MirrorOptions,
        hooks: &Rc<RefCell<H>>,
    ) -> Self
    where
        H: SyncHooks<R> + 'static,
    {
        reference
            .child(&options.type_key)
            .set(Value::from(mirror_type.as_str()), None);

        let observers: Rc<RefCell<Observers<R>>> = Rc::default();
        let active = Rc::new(Cell::new(true));
        let subscriptions = EventKind::ALL
            .into_iter()
            .map(|kind| {
                let listener = dispatcher(
                    kind,
                    options.routing.hook_for(kind),
                    options.type_key.clone(),
                    Rc::downgrade(hooks),
                    Rc::clone(&observers),
                    Rc::clone(&active),
                );
                (kind, reference.on(kind, listener))
            })
            .collect();

        tracing::debug!(
            path = %reference.path(),
            mirror = mirror_type.as_str(),
            routing = ?options.routing,
            "mirror activated"
        );

        Self {
            reference,
            mirror_type,
            type_key: options.type_key.clone(),
            subscriptions,
            observers,
            active,
        }
    }

    pub fn reference(&self) -> &R {
        &self.reference
    }

    pub fn mirror_type(&self) -> MirrorType {
        self.mirror_type
    }

    pub fn type_key(&self) -> &str {
        &self.type_key
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Registers an observer for every unfiltered notification of `kind`.
    pub fn on_event<F>(&self, kind: EventKind, observer: F) -> ObserverId
    where
        F: FnMut(&Snapshot<R>) + 'static,
    {
        let observer: Box<dyn FnMut(&Snapshot<R>)> = Box::new(observer);
        let mut observers = self.observers.borrow_mut();
        let id = observers.next_id;
        observers.next_id = observers.next_id.saturating_add(1);
        observers
            .entries
            .insert(id, (kind, Rc::new(RefCell::new(observer))));
        id
    }

    pub fn off_event(&self, id: ObserverId) -> bool {
        self.observers.borrow_mut().entries.remove(&id).is_some()
    }

    pub fn deactivate(&mut self) {
        if !self.active.replace(false) {
            return;
        }
        for (kind, id) in self.subscriptions.drain(..) {
            self.reference.off(kind, id);
        }
        self.observers.borrow_mut().entries.clear();
        tracing::debug!(
            path = %self.reference.path(),
            mirror = self.mirror_type.as_str(),
            "mirror deactivated"
        );
    }
}

impl<R: RemoteRef> Drop for SyncCore<R> {
    fn drop(&mut self) {
        self.deactivate();
    }
}

fn dispatcher<R, H>(
    kind: EventKind,
    hook: Hook,
    type_key: String,
    hooks: Weak<RefCell<H>>,
    observers: Rc<RefCell<Observers<R>>>,
    active: Rc<Cell<bool>>,
) -> Listener<R>
where
    R: RemoteRef,
    H: SyncHooks<R> + 'static,
{
    Box::new(move |snapshot: &Snapshot<R>| {
        if !active.get() || snapshot.key() == type_key {
            return;
        }
        tracing::trace!(
            path = %snapshot.reference().path(),
            event = kind.as_str(),
            hook = ?hook,
            "notification"
        );
        emit(&observers, kind, snapshot);
        // An observer may have disposed the mirror.
        if !active.get() {
            return;
        }
        if let Some(hooks) = hooks.upgrade() {
            hook.invoke(&mut *hooks.borrow_mut(), snapshot);
        }
    })
}
