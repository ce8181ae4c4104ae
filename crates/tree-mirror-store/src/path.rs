//! Slash-separated node paths over a `serde_json::Value` tree.

use serde_json::{Map, Value};

/// Splits `path` on `/`, dropping empty segments.
pub fn split(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_owned)
        .collect()
}

pub fn join(segments: &[String]) -> String {
    if segments.is_empty() {
        return "/".to_owned();
    }
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        out.push_str(segment);
    }
    out
}

pub fn is_prefix(prefix: &[String], path: &[String]) -> bool {
    prefix.len() <= path.len() && prefix.iter().zip(path).all(|(a, b)| a == b)
}

pub fn value_at<'a>(value: &'a Value, segments: &[String]) -> Option<&'a Value> {
    let mut cur = value;
    for segment in segments {
        cur = cur.as_object()?.get(segment)?;
    }
    Some(cur)
}

/// Writes `next` at `segments`, replacing any non-object ancestor with an
/// empty object.
pub fn insert(root: &mut Value, segments: &[String], next: Value) {
    let mut cur = root;
    for segment in segments {
        if !cur.is_object() {
            *cur = Value::Object(Map::new());
        }
        let Value::Object(map) = cur else {
            return;
        };
        cur = map.entry(segment.clone()).or_insert(Value::Null);
    }
    *cur = next;
}

/// Deletes the value at `segments` and prunes ancestors left empty.
pub fn remove(root: &mut Value, segments: &[String]) -> Option<Value> {
    let removed = remove_inner(root, segments);
    if root.as_object().is_some_and(Map::is_empty) {
        *root = Value::Null;
    }
    removed
}

fn remove_inner(node: &mut Value, segments: &[String]) -> Option<Value> {
    let Some((first, rest)) = segments.split_first() else {
        return Some(std::mem::replace(node, Value::Null));
    };
    let map = node.as_object_mut()?;
    if rest.is_empty() {
        return map.shift_remove(first);
    }
    let child = map.get_mut(first)?;
    let removed = remove_inner(child, rest);
    if child.is_null() || child.as_object().is_some_and(Map::is_empty) {
        map.shift_remove(first);
    }
    removed
}
