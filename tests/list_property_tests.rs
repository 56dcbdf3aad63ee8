use graphseq::{RelType, VersionedGraph, list};
use proptest::prelude::*;
use serde_json::json;

fn setup(count: usize) -> (VersionedGraph, i64, Vec<i64>) {
    let graph = VersionedGraph::open_in_memory().expect("graph");
    let (container, items) = graph
        .transaction(|txn| {
            let container = txn.instantiate_entity("List", json!(null))?;
            let items = (0..count)
                .map(|i| txn.instantiate_entity("Item", json!(i)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok((container, items))
        })
        .expect("setup");
    (graph, container, items)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn fill_round_trips_any_order(order in Just((0..12usize).collect::<Vec<_>>()).prop_shuffle(), take in 0usize..12) {
        let (graph, container, items) = setup(12);
        let wanted: Vec<i64> = order.iter().take(take).map(|&i| items[i]).collect();
        list::fill(&graph, container, &wanted, RelType::Member).unwrap();
        let view = list::materialize(&graph, container, RelType::Member, false).unwrap();
        prop_assert_eq!(view.targets(), wanted.clone());
        for (i, expected) in wanted.iter().enumerate() {
            prop_assert_eq!(list::nth(&graph, container, i, RelType::Member).unwrap().target, *expected);
        }
    }

    #[test]
    fn pop_keeps_relative_order(len in 1usize..10, pick in 0usize..10) {
        let (graph, container, items) = setup(len);
        let relations = list::fill(&graph, container, &items, RelType::Member).unwrap();
        let victim = pick % len;
        list::pop(&graph, relations[victim].id).unwrap();
        let mut expected = items.clone();
        expected.remove(victim);
        let view = list::materialize(&graph, container, RelType::Member, false).unwrap();
        prop_assert!(view.is_ordered());
        prop_assert_eq!(view.targets(), expected);
    }

    #[test]
    fn pushes_wrap_existing_items(len in 0usize..8) {
        let (graph, container, items) = setup(len + 2);
        let (ends, middle) = items.split_at(2);
        list::fill(&graph, container, middle, RelType::Member).unwrap();
        list::push_front(&graph, container, ends[0], RelType::Member).unwrap();
        list::push_back(&graph, container, ends[1], RelType::Member).unwrap();
        let mut expected = vec![ends[0]];
        expected.extend_from_slice(middle);
        expected.push(ends[1]);
        let view = list::materialize(&graph, container, RelType::Member, false).unwrap();
        prop_assert_eq!(view.targets(), expected);
    }
}
