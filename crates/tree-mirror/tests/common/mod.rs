#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use tree_mirror::store::{MemoryRef, MemoryStore};
use tree_mirror::{coerce_with, Coerced, HookRouting, MirrorOptions};

pub type Log = Rc<RefCell<Vec<String>>>;

pub fn direct() -> MirrorOptions {
    MirrorOptions::default().with_routing(HookRouting::Direct)
}

/// Coerces the node at `path` and delivers the initial notifications.
pub fn mirror_at(store: &MemoryStore, path: &str, options: &MirrorOptions) -> Coerced<MemoryRef> {
    let mirror = coerce_with(&store.snapshot(path), options);
    store.flush().expect("initial flush");
    mirror
}

pub fn keys(index: &[String]) -> Vec<&str> {
    index.iter().map(String::as_str).collect()
}
