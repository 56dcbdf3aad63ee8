use graphseq::{GraphEntity, GraphSeqError, RelType, VersionedGraph, set};
use serde_json::json;

fn setup(names: &[&str]) -> (VersionedGraph, i64, Vec<i64>) {
    let graph = VersionedGraph::open_in_memory().expect("graph");
    let (container, items) = graph
        .transaction(|txn| {
            let container = txn.instantiate_entity("Set", json!(null))?;
            let items = names
                .iter()
                .map(|name| txn.instantiate_entity("Tag", json!({ "name": name })))
                .collect::<Result<Vec<_>, _>>()?;
            Ok((container, items))
        })
        .expect("setup");
    (graph, container, items)
}

fn same_name(a: &GraphEntity, b: &GraphEntity) -> bool {
    a.data["name"] == b.data["name"]
}

#[test]
fn test_add_then_contains() {
    let (graph, set_id, items) = setup(&["red", "blue"]);
    assert!(!set::contains(&graph, set_id, items[0], RelType::Member, set::same_entity).unwrap());
    assert!(set::add(&graph, set_id, items[0], RelType::Member, set::same_entity).unwrap());
    assert!(set::contains(&graph, set_id, items[0], RelType::Member, set::same_entity).unwrap());
    assert!(!set::contains(&graph, set_id, items[1], RelType::Member, set::same_entity).unwrap());
}

#[test]
fn test_add_is_idempotent() {
    let (graph, set_id, items) = setup(&["red"]);
    assert!(set::add(&graph, set_id, items[0], RelType::Member, set::same_entity).unwrap());
    assert!(!set::add(&graph, set_id, items[0], RelType::Member, set::same_entity).unwrap());
    assert_eq!(set::members(&graph, set_id, RelType::Member).unwrap(), vec![items[0]]);
}

#[test]
fn test_add_never_links_members() {
    let (graph, set_id, items) = setup(&["red", "blue", "green"]);
    for &item in &items {
        set::add(&graph, set_id, item, RelType::Member, set::same_entity).unwrap();
    }
    let snapshot = graph.now().unwrap();
    for relation in snapshot.out_relations(set_id, RelType::Member).unwrap() {
        assert!(snapshot.out_relations(relation.id, RelType::Next).unwrap().is_empty());
    }
}

#[test]
fn test_remove_terminates_all_matches() {
    let (graph, set_id, items) = setup(&["red", "red", "blue"]);
    graph
        .transaction(|txn| {
            for &item in &items {
                txn.instantiate_relation(set_id, RelType::Member, item, json!(null))?;
            }
            Ok(())
        })
        .unwrap();
    let removed = set::remove(&graph, set_id, items[0], RelType::Member, same_name).unwrap();
    assert_eq!(removed, 2);
    assert_eq!(set::members(&graph, set_id, RelType::Member).unwrap(), vec![items[2]]);
}

#[test]
fn test_toggle_flips_membership() {
    let (graph, set_id, items) = setup(&["red"]);
    assert!(set::toggle(&graph, set_id, items[0], RelType::Member, set::same_entity).unwrap());
    assert!(set::contains(&graph, set_id, items[0], RelType::Member, set::same_entity).unwrap());
    assert!(!set::toggle(&graph, set_id, items[0], RelType::Member, set::same_entity).unwrap());
    assert!(!set::contains(&graph, set_id, items[0], RelType::Member, set::same_entity).unwrap());
}

#[test]
fn test_custom_equality_matches_by_payload() {
    let (graph, set_id, items) = setup(&["red", "red"]);
    set::add(&graph, set_id, items[0], RelType::Member, same_name).unwrap();
    assert!(set::contains(&graph, set_id, items[1], RelType::Member, same_name).unwrap());
    assert!(!set::add(&graph, set_id, items[1], RelType::Member, same_name).unwrap());
    assert!(!set::contains(&graph, set_id, items[1], RelType::Member, set::same_entity).unwrap());
}

#[test]
fn test_clear_empties_set() {
    let (graph, set_id, items) = setup(&["a", "b"]);
    for &item in &items {
        set::add(&graph, set_id, item, RelType::Member, set::same_entity).unwrap();
    }
    assert_eq!(set::clear(&graph, set_id, RelType::Member).unwrap(), 2);
    assert!(set::members(&graph, set_id, RelType::Member).unwrap().is_empty());
}

#[test]
fn test_contains_at_old_snapshot() {
    let (graph, set_id, items) = setup(&["a"]);
    let empty = graph.now().unwrap();
    set::add(&graph, set_id, items[0], RelType::Member, set::same_entity).unwrap();
    assert!(!set::contains_at(&empty, set_id, items[0], RelType::Member, set::same_entity).unwrap());
}

#[test]
fn test_unknown_item_is_not_found() {
    let (graph, set_id, _) = setup(&[]);
    let err = set::add(&graph, set_id, 777, RelType::Member, set::same_entity).expect_err("missing");
    assert!(matches!(err, GraphSeqError::NotFound(_)));
}

#[test]
fn test_terminated_item_is_compared_not_missing() {
    let (graph, set_id, items) = setup(&["red", "blue"]);
    set::add(&graph, set_id, items[0], RelType::Member, set::same_entity).unwrap();
    graph.transaction(|txn| txn.terminate(items[0])).unwrap();

    assert!(!set::contains(&graph, set_id, items[0], RelType::Member, set::same_entity).unwrap());
    assert_eq!(set::remove(&graph, set_id, items[0], RelType::Member, set::same_entity).unwrap(), 0);
    assert!(set::members(&graph, set_id, RelType::Member).unwrap().is_empty());
}

#[test]
fn test_terminated_item_matches_live_member_by_payload() {
    let (graph, set_id, items) = setup(&["red", "red"]);
    set::add(&graph, set_id, items[1], RelType::Member, same_name).unwrap();
    graph.transaction(|txn| txn.terminate(items[0])).unwrap();

    assert!(set::contains(&graph, set_id, items[0], RelType::Member, same_name).unwrap());
    assert_eq!(set::remove(&graph, set_id, items[0], RelType::Member, same_name).unwrap(), 1);
    assert!(set::members(&graph, set_id, RelType::Member).unwrap().is_empty());
}
