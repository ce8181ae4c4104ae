//! Typed, observable local mirrors of a push-notifying hierarchical store.
//!
//! A remote node tagged with a discriminant (default `_type`) is mirrored as
//! one of three shapes:
//! - `"object"` → [`ScalarMap`], a flat key → value mapping;
//! - `"array"` → [`OrderedCollection`], an ordered set of remote-keyed children
//!   whose shapes are chosen recursively by [`coerce`];
//! - `"objectArray"` → [`TypedOrderedCollection`], whose children are always
//!   [`ScalarMap`]s.
//!
//! Every mirror composes a [`SyncCore`], which owns the four remote
//! subscriptions and routes notifications to the shape's [`SyncHooks`].
//! Local state only changes when notifications are delivered; writes go
//! upstream and come back as echoes.

mod collection;
mod dispatch;
mod error;
mod object;
mod options;
pub mod replay;
mod sync;
mod wire;

pub use tree_mirror_store as store;

pub use collection::{ChildPolicy, Dispatch, OrderedCollection, Records, TypedOrderedCollection};
pub use dispatch::{coerce, coerce_with, Coerced, MirrorType};
pub use error::MirrorError;
pub use object::{ScalarMap, SetCallback};
pub use options::{HookRouting, MirrorOptions, DEFAULT_TYPE_KEY};
pub use sync::{Hook, ObserverId, SyncCore, SyncHooks};
pub use wire::ToJson;
