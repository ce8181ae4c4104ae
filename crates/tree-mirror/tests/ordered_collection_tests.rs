mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{direct, keys, mirror_at};
use serde_json::{json, Value};
use tree_mirror::store::{EventKind, MemoryRef, MemoryStore, RemoteRef};
use tree_mirror::{
    Coerced, MirrorOptions, MirrorType, OrderedCollection, ScalarMap, ToJson, TypedOrderedCollection,
};

fn records_store() -> MemoryStore {
    MemoryStore::with_value(json!({
        "list": {
            "_type": "objectArray",
            "k1": {"x": 1, "_type": "object"},
            "k2": {"x": 2, "_type": "object"},
        },
        "template": {"y": 9, "_type": "object"},
    }))
}

fn records(store: &MemoryStore, options: &MirrorOptions) -> TypedOrderedCollection<MemoryRef> {
    match mirror_at(store, "list", options) {
        Coerced::TypedOrdered(list) => list,
        other => panic!("expected a typed collection, got {other:?}"),
    }
}

fn array(store: &MemoryStore, path: &str, options: &MirrorOptions) -> OrderedCollection<MemoryRef> {
    match mirror_at(store, path, options) {
        Coerced::Ordered(list) => list,
        other => panic!("expected a collection, got {other:?}"),
    }
}

#[test]
fn typed_collection_mirrors_children_as_records() {
    let store = records_store();
    let list = records(&store, &MirrorOptions::default());

    assert_eq!(list.mirror_type(), MirrorType::ObjectArray);
    assert_eq!(keys(&list.index()), ["k1", "k2"]);
    assert_eq!(
        list.contents_json(),
        vec![
            json!({"x": 1, "_type": "object"}),
            json!({"x": 2, "_type": "object"}),
        ]
    );
    let first = list.get(0).unwrap();
    assert_eq!(first.as_scalar_map().unwrap().get("x"), Some(json!(1)));
    assert_eq!(list.to_json(), store.value_at("list"));
}

#[test]
fn removal_echo_drops_the_element() {
    let store = records_store();
    let list = records(&store, &direct());

    store.reference("list/k1").remove(None);
    store.flush().unwrap();

    assert_eq!(keys(&list.index()), ["k2"]);
    assert_eq!(list.contents_json(), vec![json!({"x": 2, "_type": "object"})]);
    assert_eq!(list.len(), 1);
}

#[test]
fn splice_waits_for_echoes() {
    let store = records_store();
    let list = records(&store, &direct());

    let pushed = list.replace_content(0, 1, &[json!({"y": 9})]);
    assert_eq!(pushed.len(), 1);
    let k3 = pushed[0].key().to_owned();
    assert_eq!(keys(&list.index()), ["k1", "k2"], "no synchronous mutation");
    assert_eq!(list.len(), 2);

    store.flush().unwrap();
    assert_eq!(keys(&list.index()), ["k2", k3.as_str()]);
    assert_eq!(
        list.contents_json(),
        vec![
            json!({"x": 2, "_type": "object"}),
            json!({"y": 9, "_type": "object"}),
        ]
    );
    assert_eq!(store.value_at(&format!("list/{k3}/_type")), json!("object"));
}

#[test]
fn record_change_is_left_to_the_record() {
    let store = records_store();
    let list = records(&store, &direct());
    let updates = Rc::new(Cell::new(0));
    {
        let element = list.get_by_key("k2").unwrap();
        let counter = Rc::clone(&updates);
        element
            .as_scalar_map()
            .unwrap()
            .on_event(EventKind::Value, move |_| counter.set(counter.get() + 1));
    }
    let listeners = store.listener_count();

    store.reference("list/k2/x").set(json!(5), None);
    store.flush().unwrap();

    // Same record instance: its observer fired and no subscription churned.
    assert_eq!(updates.get(), 1);
    assert_eq!(store.listener_count(), listeners);
    assert_eq!(list.position("k2"), Some(1));
    let element = list.get(1).unwrap();
    assert_eq!(element.as_scalar_map().unwrap().get("x"), Some(json!(5)));
}

#[test]
fn crossed_routing_removal_reaches_the_change_hook() {
    let store = records_store();
    let list = records(&store, &MirrorOptions::default());

    store.reference("list/k1").remove(None);
    store.flush().unwrap();

    // The record slot is left alone, so the key stays; its record is empty.
    assert_eq!(keys(&list.index()), ["k1", "k2"]);
    assert_eq!(
        list.contents_json(),
        vec![json!({"_type": "object"}), json!({"x": 2, "_type": "object"})]
    );
}

#[test]
fn crossed_routing_drops_an_element_whose_tag_is_written_after_it_lands() {
    let store = records_store();
    let list = records(&store, &MirrorOptions::default());

    // The new record writes its discriminant, the `changed` echo reaches the
    // removal hook.
    let untagged = list.push(&json!({"y": 9}));
    store.flush().unwrap();
    assert_eq!(list.position(untagged.key()), None);
    assert_eq!(store.value_at(&format!("list/{}", untagged.key())), json!({"y": 9, "_type": "object"}));

    // Pushing a record's wire form writes nothing new, so it stays.
    let template = ScalarMap::new(store.reference("template"));
    store.flush().unwrap();
    let tagged = list.push(&template);
    store.flush().unwrap();
    assert_eq!(list.position(tagged.key()), Some(2));
    assert_eq!(keys(&list.index()), ["k1", "k2", tagged.key()]);
}

#[test]
fn crossed_routing_drops_changed_scalars() {
    let store = MemoryStore::with_value(json!({"arr": {"_type": "array", "a": 1, "b": 2}}));
    let list = array(&store, "arr", &MirrorOptions::default());

    store.reference("arr/a").set(json!(10), None);
    store.flush().unwrap();
    assert_eq!(keys(&list.index()), ["b"]);

    // A later removal of the forgotten key reaches the change hook as an
    // unknown key.
    store.reference("arr/a").remove(None);
    store.flush().unwrap();
    assert_eq!(keys(&list.index()), ["b"]);
}

#[test]
fn dispatch_children_pick_their_own_shape() {
    let store = MemoryStore::with_value(json!({
        "arr": {
            "_type": "array",
            "n": 1,
            "rec": {"_type": "object", "v": 1},
            "sub": {"_type": "array", "x": true},
            "raw": {"v": 2},
        }
    }));
    let list = array(&store, "arr", &direct());

    assert_eq!(keys(&list.index()), ["n", "rec", "sub", "raw"]);
    let shapes: Vec<Option<MirrorType>> = (0..list.len())
        .map(|position| list.get(position).unwrap().mirror_type())
        .collect();
    assert_eq!(
        shapes,
        [None, Some(MirrorType::Object), Some(MirrorType::Array), None]
    );
    {
        let sub = list.get_by_key("sub").unwrap();
        assert_eq!(keys(&sub.as_ordered().unwrap().index()), ["x"]);
    }
    assert_eq!(list.to_json(), store.value_at("arr"));
}

#[test]
fn change_replaces_non_record_slots_in_place() {
    let store = MemoryStore::with_value(json!({"arr": {"_type": "array", "a": 1, "b": 2, "c": 3}}));
    let list = array(&store, "arr", &direct());

    store.reference("arr/b").set(json!({"_type": "object", "z": 0}), None);
    store.flush().unwrap();

    assert_eq!(keys(&list.index()), ["a", "b", "c"]);
    let element = list.get(1).unwrap();
    assert_eq!(element.mirror_type(), Some(MirrorType::Object));
    assert_eq!(element.to_json(), json!({"_type": "object", "z": 0}));
    drop(element);

    store.reference("arr/c").set(json!("three"), None);
    store.flush().unwrap();
    assert_eq!(list.get_by_key("c").unwrap().as_opaque(), Some(&json!("three")));
    assert_eq!(list.key_at(2).as_deref(), Some("c"));
}

#[test]
fn removal_preserves_relative_order() {
    let store = MemoryStore::with_value(json!({"arr": {"_type": "array", "a": 1, "b": 2, "c": 3, "d": 4}}));
    let list = array(&store, "arr", &direct());

    store.reference("arr/b").remove(None);
    store.reference("arr/d").remove(None);
    store.flush().unwrap();

    assert_eq!(keys(&list.index()), ["a", "c"]);
    assert_eq!(list.contents_json(), [json!(1), json!(3)]);
}

#[test]
fn conveniences_go_through_the_store() {
    let store = MemoryStore::with_value(json!({"arr": {"_type": "array", "a": 1, "b": 2}}));
    let list = array(&store, "arr", &direct());

    let pushed = list.push(&json!(3));
    assert_eq!(list.len(), 2);
    store.flush().unwrap();
    assert_eq!(keys(&list.index()), ["a", "b", pushed.key()]);

    list.remove_at(0);
    store.flush().unwrap();
    assert_eq!(keys(&list.index()), ["b", pushed.key()]);

    // Out-of-range positions are skipped.
    let none: Vec<MemoryRef> = list.replace_content::<Value>(7, 3, &[]);
    assert!(none.is_empty());
    assert_eq!(store.pending(), 0);

    list.clear();
    store.flush().unwrap();
    assert!(list.is_empty());
    assert_eq!(store.value_at("arr"), json!({"_type": "array"}));
}

#[test]
fn observers_receive_collection_events() {
    let store = MemoryStore::with_value(json!({"arr": {"_type": "array", "a": 1}}));
    let list = array(&store, "arr", &direct());
    let added = Rc::new(Cell::new(0));
    let counter = Rc::clone(&added);
    let id = list.on_event(EventKind::ChildAdded, move |_| counter.set(counter.get() + 1));

    list.push(&json!(2));
    store.flush().unwrap();
    assert_eq!(added.get(), 1);

    assert!(list.off_event(id));
    list.push(&json!(3));
    store.flush().unwrap();
    assert_eq!(added.get(), 1);
    assert_eq!(list.len(), 3);
}

#[test]
fn dispose_releases_every_subscription() {
    let store = records_store();
    let mut list = records(&store, &direct());
    assert_eq!(store.listener_count(), 12);

    list.dispose();
    assert!(!list.is_active());
    assert_eq!(store.listener_count(), 0);

    store.reference("list/k3").set(json!({"x": 3}), None);
    store.flush().unwrap();
    assert_eq!(keys(&list.index()), ["k1", "k2"]);
}

#[test]
fn dropping_a_collection_releases_its_elements() {
    let store = records_store();
    {
        let _list = records(&store, &direct());
        assert_eq!(store.listener_count(), 12);
    }
    assert_eq!(store.listener_count(), 0);
}

#[test]
fn removed_record_is_disposed() {
    let store = records_store();
    let list = records(&store, &direct());

    store.reference("list/k1").remove(None);
    store.flush().unwrap();
    assert_eq!(store.listener_count_at("list/k1"), 0);
    assert_eq!(store.listener_count(), 8);
    assert_eq!(list.len(), 1);
}
