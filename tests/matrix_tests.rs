use graphseq::{GraphSeqError, RelType, VersionedGraph, list, matrix};
use serde_json::{Value, json};

fn two_by_two(graph: &VersionedGraph) -> i64 {
    matrix::create(graph, &[json!("r0"), json!("r1")], &[json!("c0"), json!("c1")], true)
        .expect("matrix")
}

#[test]
fn test_fill_then_cell_values() {
    let graph = VersionedGraph::open_in_memory().expect("graph");
    let m = two_by_two(&graph);
    matrix::fill(&graph, m, &[vec![json!(1), json!(2)], vec![json!(3), json!(4)]]).expect("fill");
    assert_eq!(matrix::cell_value(&graph, m, 0, 0).unwrap(), Some(json!(1)));
    assert_eq!(matrix::cell_value(&graph, m, 0, 1).unwrap(), Some(json!(2)));
    assert_eq!(matrix::cell_value(&graph, m, 1, 0).unwrap(), Some(json!(3)));
    assert_eq!(matrix::cell_value(&graph, m, 1, 1).unwrap(), Some(json!(4)));
}

#[test]
fn test_create_is_single_transaction() {
    let graph = VersionedGraph::open_in_memory().expect("graph");
    two_by_two(&graph);
    assert_eq!(graph.current_epoch().unwrap(), 1);
}

#[test]
fn test_unfilled_cells_are_none() {
    let graph = VersionedGraph::open_in_memory().expect("graph");
    let m = two_by_two(&graph);
    assert_eq!(matrix::cell_value(&graph, m, 1, 1).unwrap(), None);
}

#[test]
fn test_refill_replaces_values() {
    let graph = VersionedGraph::open_in_memory().expect("graph");
    let m = two_by_two(&graph);
    matrix::fill(&graph, m, &[vec![json!(1), json!(2)], vec![json!(3), json!(4)]]).unwrap();
    matrix::fill(&graph, m, &[vec![json!("a"), json!("b")], vec![json!("c"), json!("d")]])
        .unwrap();
    let values = matrix::values_as_lists(&graph, m).unwrap();
    assert_eq!(
        values,
        vec![
            vec![Some(json!("a")), Some(json!("b"))],
            vec![Some(json!("c")), Some(json!("d"))],
        ]
    );
    let row = matrix::row(&graph, m, 0).unwrap();
    assert_eq!(graph.now().unwrap().count_out(row, RelType::Value).unwrap(), 2);
}

#[test]
fn test_rows_and_columns_are_independent_lists() {
    let graph = VersionedGraph::open_in_memory().expect("graph");
    let m = matrix::create(&graph, &[json!(0), json!(1), json!(2)], &[json!("only")], false)
        .unwrap();
    assert_eq!(matrix::rows_as_list(&graph, m).unwrap().len(), 3);
    assert_eq!(matrix::cols_as_list(&graph, m).unwrap().len(), 1);
    let rows = matrix::rows_as_list(&graph, m).unwrap();
    assert_eq!(rows[2].target, matrix::row(&graph, m, 2).unwrap());
}

#[test]
fn test_labels_follow_positions() {
    let graph = VersionedGraph::open_in_memory().expect("graph");
    let m = two_by_two(&graph);
    assert_eq!(matrix::row_label(&graph, m, 1).unwrap(), Some(json!("r1")));
    assert_eq!(matrix::column_label(&graph, m, 0).unwrap(), Some(json!("c0")));

    let unlabeled = matrix::create(&graph, &[json!("r")], &[json!("c")], false).unwrap();
    assert_eq!(matrix::row_label(&graph, unlabeled, 0).unwrap(), None);
}

#[test]
fn test_dimension_mismatch_writes_nothing() {
    let graph = VersionedGraph::open_in_memory().expect("graph");
    let m = two_by_two(&graph);
    let epoch = graph.current_epoch().unwrap();
    let err = matrix::fill(&graph, m, &[vec![json!(1), json!(2)]]).expect_err("rows");
    assert!(matches!(
        err,
        GraphSeqError::Dimension {
            expected_rows: 2,
            expected_cols: 2,
            rows: 1,
            ..
        }
    ));
    let err = matrix::fill(&graph, m, &[vec![json!(1)], vec![json!(3), json!(4)]])
        .expect_err("cols");
    assert!(matches!(err, GraphSeqError::Dimension { cols: 1, .. }));
    assert_eq!(graph.current_epoch().unwrap(), epoch);
    assert_eq!(matrix::cell_value(&graph, m, 1, 1).unwrap(), None);
}

#[test]
fn test_duplicate_value_is_integrity_error() {
    let graph = VersionedGraph::open_in_memory().expect("graph");
    let m = two_by_two(&graph);
    matrix::fill(&graph, m, &[vec![json!(1), json!(2)], vec![json!(3), json!(4)]]).unwrap();
    let row = matrix::row(&graph, m, 0).unwrap();
    let col = matrix::column(&graph, m, 0).unwrap();
    graph
        .transaction(|txn| txn.instantiate_relation(row, RelType::Value, col, json!(99)))
        .unwrap();
    let err = matrix::cell_value(&graph, m, 0, 0).expect_err("duplicate");
    assert!(matches!(err, GraphSeqError::Integrity(_)));
}

#[test]
fn test_out_of_range_cell_is_index_error() {
    let graph = VersionedGraph::open_in_memory().expect("graph");
    let m = two_by_two(&graph);
    let err = matrix::cell_value(&graph, m, 2, 0).expect_err("range");
    assert!(matches!(err, GraphSeqError::Index { index: 2, .. }));
}

#[test]
fn test_popping_a_row_keeps_remaining_cells() {
    let graph = VersionedGraph::open_in_memory().expect("graph");
    let m = two_by_two(&graph);
    matrix::fill(&graph, m, &[vec![json!(1), json!(2)], vec![json!(3), json!(4)]]).unwrap();
    let first = list::nth(&graph, m, 0, RelType::Row).unwrap();
    list::pop(&graph, first.id).unwrap();
    let values: Vec<Vec<Option<Value>>> = matrix::values_as_lists(&graph, m).unwrap();
    assert_eq!(values, vec![vec![Some(json!(3)), Some(json!(4))]]);
}
