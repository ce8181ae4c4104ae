use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tree_mirror_store::{RemoteRef, Snapshot};

use crate::{MirrorOptions, OrderedCollection, ScalarMap, ToJson, TypedOrderedCollection};

/// Shape tag stored under the discriminant key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MirrorType {
    Object,
    Array,
    ObjectArray,
}

impl MirrorType {
    pub fn as_str(self) -> &'static str {
        match self {
            MirrorType::Object => "object",
            MirrorType::Array => "array",
            MirrorType::ObjectArray => "objectArray",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "object" => Some(MirrorType::Object),
            "array" => Some(MirrorType::Array),
            "objectArray" => Some(MirrorType::ObjectArray),
            _ => None,
        }
    }

    /// Reads the discriminant of `value`; `None` for scalars, untagged
    /// mappings, and unknown tags.
    pub fn of(value: &Value, type_key: &str) -> Option<Self> {
        value.get(type_key)?.as_str().and_then(Self::from_tag)
    }
}

impl fmt::Display for MirrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of coercing a snapshot: a live mirror, or the raw value when the
/// node carries no recognized discriminant.
#[derive(Debug)]
pub enum Coerced<R: RemoteRef> {
    ScalarMap(ScalarMap<R>),
    Ordered(OrderedCollection<R>),
    TypedOrdered(TypedOrderedCollection<R>),
    Opaque(Value),
}

impl<R: RemoteRef> Coerced<R> {
    pub fn mirror_type(&self) -> Option<MirrorType> {
        match self {
            Coerced::ScalarMap(_) => Some(MirrorType::Object),
            Coerced::Ordered(_) => Some(MirrorType::Array),
            Coerced::TypedOrdered(_) => Some(MirrorType::ObjectArray),
            Coerced::Opaque(_) => None,
        }
    }

    pub fn is_mirror(&self) -> bool {
        !matches!(self, Coerced::Opaque(_))
    }

    pub fn as_scalar_map(&self) -> Option<&ScalarMap<R>> {
        match self {
            Coerced::ScalarMap(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_ordered(&self) -> Option<&OrderedCollection<R>> {
        match self {
            Coerced::Ordered(collection) => Some(collection),
            _ => None,
        }
    }

    pub fn as_typed_ordered(&self) -> Option<&TypedOrderedCollection<R>> {
        match self {
            Coerced::TypedOrdered(collection) => Some(collection),
            _ => None,
        }
    }

    pub fn as_opaque(&self) -> Option<&Value> {
        match self {
            Coerced::Opaque(value) => Some(value),
            _ => None,
        }
    }

    /// Releases the subscriptions of a mirror; no-op for opaque values.
    pub fn dispose(&mut self) {
        match self {
            Coerced::ScalarMap(map) => map.dispose(),
            Coerced::Ordered(collection) => collection.dispose(),
            Coerced::TypedOrdered(collection) => collection.dispose(),
            Coerced::Opaque(_) => {}
        }
    }
}

impl<R: RemoteRef> ToJson for Coerced<R> {
    fn to_json(&self) -> Value {
        match self {
            Coerced::ScalarMap(map) => map.to_json(),
            Coerced::Ordered(collection) => collection.to_json(),
            Coerced::TypedOrdered(collection) => collection.to_json(),
            Coerced::Opaque(value) => value.clone(),
        }
    }
}

/// Coerces `snapshot` with default options.
pub fn coerce<R: RemoteRef>(snapshot: &Snapshot<R>) -> Coerced<R> {
    coerce_with(snapshot, &MirrorOptions::default())
}

/// Builds the mirror selected by the snapshot's discriminant, bound to the
/// snapshot's reference. Every call creates fresh state and subscriptions.
pub fn coerce_with<R: RemoteRef>(snapshot: &Snapshot<R>, options: &MirrorOptions) -> Coerced<R> {
    let reference = snapshot.reference().clone();
    match MirrorType::of(snapshot.value(), &options.type_key) {
        Some(MirrorType::Object) => Coerced::ScalarMap(ScalarMap::with_options(reference, options)),
        Some(MirrorType::Array) => Coerced::Ordered(OrderedCollection::with_options(reference, options)),
        Some(MirrorType::ObjectArray) => {
            Coerced::TypedOrdered(TypedOrderedCollection::with_options(reference, options))
        }
        None => {
            tracing::trace!(path = %reference.path(), "untagged value passed through");
            Coerced::Opaque(snapshot.value().clone())
        }
    }
}
