use serde::{Deserialize, Serialize};
use tree_mirror_store::EventKind;

use crate::{Hook, MirrorError};

/// Field name that holds a node's shape discriminant.
pub const DEFAULT_TYPE_KEY: &str = "_type";

/// Which hook a notification kind reaches once it passes the discriminant
/// filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookRouting {
    /// `changed` notifications reach `child_removed` and `removed`
    /// notifications reach `child_changed`; `added` and `value` go straight
    /// through.
    #[default]
    Crossed,
    /// Every notification reaches the hook of the same name.
    Direct,
}

impl HookRouting {
    pub fn hook_for(self, kind: EventKind) -> Hook {
        match (self, kind) {
            (_, EventKind::ChildAdded) => Hook::ChildAdded,
            (_, EventKind::Value) => Hook::ValueChanged,
            (HookRouting::Crossed, EventKind::ChildChanged) => Hook::ChildRemoved,
            (HookRouting::Crossed, EventKind::ChildRemoved) => Hook::ChildChanged,
            (HookRouting::Direct, EventKind::ChildChanged) => Hook::ChildChanged,
            (HookRouting::Direct, EventKind::ChildRemoved) => Hook::ChildRemoved,
        }
    }
}

/// Settings shared by a mirror and every child mirror it creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorOptions {
    pub type_key: String,
    pub routing: HookRouting,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            type_key: DEFAULT_TYPE_KEY.to_owned(),
            routing: HookRouting::default(),
        }
    }
}

impl MirrorOptions {
    pub fn with_type_key(mut self, type_key: impl Into<String>) -> Self {
        self.type_key = type_key.into();
        self
    }

    pub fn with_routing(mut self, routing: HookRouting) -> Self {
        self.routing = routing;
        self
    }

    /// Parses options from JSON; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, MirrorError> {
        let options: Self = serde_json::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    /// The discriminant is written as a single child, so it must be one
    /// non-empty path segment that dotted keys cannot address.
    pub fn validate(&self) -> Result<(), MirrorError> {
        if self.type_key.is_empty() || self.type_key.contains(['/', '.']) {
            return Err(MirrorError::InvalidTypeKey(self.type_key.clone()));
        }
        Ok(())
    }
}
