//! Matrices: two independent chains of wrapper entities (rows and columns)
//! hanging off one container, and `Value` relations from a row wrapper to a
//! column wrapper carrying each cell.
//!
//! Wrapping every position in its own entity keeps labels and cells attached
//! to the row or column itself, so reordering the chains never moves them.

use serde_json::Value;

use crate::{
    errors::GraphSeqError,
    graph::{GraphRelation, RelType, Snapshot, Transaction, VersionedGraph},
    list,
    ops::SeqExt,
};

pub const MATRIX_KIND: &str = "Matrix";
pub const ROW_KIND: &str = "Row";
pub const COLUMN_KIND: &str = "Column";
pub const VALUE_KIND: &str = "Value";

/// Creates a matrix with one row per entry of `rows` and one column per entry
/// of `cols`. With `add_labels`, each wrapper gets a `Label` relation to a
/// value holder carrying the corresponding label.
pub fn create(
    graph: &VersionedGraph,
    rows: &[Value],
    cols: &[Value],
    add_labels: bool,
) -> Result<i64, GraphSeqError> {
    graph.transaction(|txn| {
        let matrix = txn.instantiate_entity(MATRIX_KIND, Value::Null)?;
        add_axis(txn, matrix, RelType::Row, ROW_KIND, rows, add_labels)?;
        add_axis(txn, matrix, RelType::Column, COLUMN_KIND, cols, add_labels)?;
        Ok(matrix)
    })
}

pub fn rows_as_list(
    graph: &VersionedGraph,
    matrix: i64,
) -> Result<Vec<GraphRelation>, GraphSeqError> {
    Ok(list::materialize(graph, matrix, RelType::Row, false)?.into_relations())
}

pub fn cols_as_list(
    graph: &VersionedGraph,
    matrix: i64,
) -> Result<Vec<GraphRelation>, GraphSeqError> {
    Ok(list::materialize(graph, matrix, RelType::Column, false)?.into_relations())
}

/// Row wrapper entity at position `i`.
pub fn row(graph: &VersionedGraph, matrix: i64, i: usize) -> Result<i64, GraphSeqError> {
    Ok(list::nth(graph, matrix, i, RelType::Row)?.target)
}

/// Column wrapper entity at position `j`.
pub fn column(graph: &VersionedGraph, matrix: i64, j: usize) -> Result<i64, GraphSeqError> {
    Ok(list::nth(graph, matrix, j, RelType::Column)?.target)
}

pub fn row_label(
    graph: &VersionedGraph,
    matrix: i64,
    i: usize,
) -> Result<Option<Value>, GraphSeqError> {
    let snapshot = graph.now()?;
    let wrapper = list::nth_at(&snapshot, matrix, i, RelType::Row)?.target;
    label_of(&snapshot, wrapper)
}

pub fn column_label(
    graph: &VersionedGraph,
    matrix: i64,
    j: usize,
) -> Result<Option<Value>, GraphSeqError> {
    let snapshot = graph.now()?;
    let wrapper = list::nth_at(&snapshot, matrix, j, RelType::Column)?.target;
    label_of(&snapshot, wrapper)
}

/// Payload of cell `(i, j)`, `None` if it was never filled.
pub fn cell_value(
    graph: &VersionedGraph,
    matrix: i64,
    i: usize,
    j: usize,
) -> Result<Option<Value>, GraphSeqError> {
    let snapshot = graph.now()?;
    let row = list::nth_at(&snapshot, matrix, i, RelType::Row)?.target;
    let col = list::nth_at(&snapshot, matrix, j, RelType::Column)?.target;
    cell_at(&snapshot, row, col)
}

/// Every cell, row-major, read from one snapshot.
pub fn values_as_lists(
    graph: &VersionedGraph,
    matrix: i64,
) -> Result<Vec<Vec<Option<Value>>>, GraphSeqError> {
    let snapshot = graph.now()?;
    let rows = list::materialize_at(&snapshot, matrix, RelType::Row, false)?.targets();
    let cols = list::materialize_at(&snapshot, matrix, RelType::Column, false)?.targets();
    rows.iter()
        .map(|&row| {
            cols.iter()
                .map(|&col| cell_at(&snapshot, row, col))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect()
}

/// Overwrites every cell; `values[i][j]` lands in row `i`, column `j`.
pub fn fill(
    graph: &VersionedGraph,
    matrix: i64,
    values: &[Vec<Value>],
) -> Result<(), GraphSeqError> {
    graph.transaction(|txn| {
        let snapshot = txn.snapshot();
        let rows = list::materialize_at(&snapshot, matrix, RelType::Row, false)?.targets();
        let cols = list::materialize_at(&snapshot, matrix, RelType::Column, false)?.targets();
        if values.len() != rows.len() || values.iter().any(|row| row.len() != cols.len()) {
            return Err(GraphSeqError::Dimension {
                expected_rows: rows.len(),
                expected_cols: cols.len(),
                rows: values.len(),
                cols: values
                    .iter()
                    .map(Vec::len)
                    .find(|&len| len != cols.len())
                    .unwrap_or(cols.len()),
            });
        }
        for (&row, row_values) in rows.iter().zip(values) {
            for stale in snapshot.out_relations(row, RelType::Value)? {
                txn.terminate(stale.id)?;
            }
            for (&col, value) in cols.iter().zip(row_values) {
                txn.instantiate_relation(row, RelType::Value, col, value.clone())?;
            }
        }
        Ok(())
    })
}

fn add_axis(
    txn: &Transaction<'_>,
    matrix: i64,
    rel_type: RelType,
    kind: &str,
    labels: &[Value],
    add_labels: bool,
) -> Result<(), GraphSeqError> {
    let mut memberships = Vec::with_capacity(labels.len());
    for label in labels {
        let wrapper = txn.instantiate_entity(kind, Value::Null)?;
        if add_labels {
            let holder = txn.instantiate_entity(VALUE_KIND, label.clone())?;
            txn.instantiate_relation(wrapper, RelType::Label, holder, Value::Null)?;
        }
        memberships.push(txn.instantiate_relation(matrix, rel_type, wrapper, Value::Null)?);
    }
    list::link_in_order(txn, &memberships)
}

fn cell_at(snapshot: &Snapshot<'_>, row: i64, col: i64) -> Result<Option<Value>, GraphSeqError> {
    let cell = snapshot
        .connections(row, RelType::Value, col)?
        .at_most_one()
        .map_err(|_| {
            GraphSeqError::integrity(format!(
                "more than one value between row {row} and column {col}"
            ))
        })?;
    Ok(cell.map(|relation| relation.data))
}

fn label_of(snapshot: &Snapshot<'_>, wrapper: i64) -> Result<Option<Value>, GraphSeqError> {
    let label = snapshot
        .out_relations(wrapper, RelType::Label)?
        .at_most_one()
        .map_err(|_| GraphSeqError::integrity(format!("more than one label on {wrapper}")))?;
    match label {
        Some(relation) => Ok(Some(snapshot.entity(relation.target)?.data)),
        None => Ok(None),
    }
}
