use serde_json::Value;

/// Wire representation of a mirrored node or a raw value.
pub trait ToJson {
    fn to_json(&self) -> Value;
}

impl ToJson for Value {
    fn to_json(&self) -> Value {
        self.clone()
    }
}
