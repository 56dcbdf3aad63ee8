//! Unordered membership over the same relations lists use, without `Next`
//! links. Check-and-act operations decide against one snapshot inside their
//! transaction; they do not arbitrate between concurrent writers.

use serde_json::Value;

use crate::{
    errors::GraphSeqError,
    graph::{GraphEntity, GraphRelation, RelType, Snapshot, Transaction, VersionedGraph},
    list::{self, ensure_membership},
};

/// Identity comparison, the usual set equality.
pub fn same_entity(a: &GraphEntity, b: &GraphEntity) -> bool {
    a.id == b.id
}

pub fn contains<P>(
    graph: &VersionedGraph,
    container: i64,
    item: i64,
    rel_type: RelType,
    eq: P,
) -> Result<bool, GraphSeqError>
where
    P: Fn(&GraphEntity, &GraphEntity) -> bool,
{
    contains_at(&graph.now()?, container, item, rel_type, eq)
}

pub fn contains_at<P>(
    snapshot: &Snapshot<'_>,
    container: i64,
    item: i64,
    rel_type: RelType,
    eq: P,
) -> Result<bool, GraphSeqError>
where
    P: Fn(&GraphEntity, &GraphEntity) -> bool,
{
    ensure_membership(rel_type)?;
    Ok(!matches_at(snapshot, container, item, rel_type, &eq)?.is_empty())
}

/// Adds `item` unless a member already matches it. Returns whether a
/// membership was created.
pub fn add<P>(
    graph: &VersionedGraph,
    container: i64,
    item: i64,
    rel_type: RelType,
    eq: P,
) -> Result<bool, GraphSeqError>
where
    P: Fn(&GraphEntity, &GraphEntity) -> bool,
{
    ensure_membership(rel_type)?;
    graph.transaction(|txn| {
        let matches = matches_at(&txn.snapshot(), container, item, rel_type, &eq)?;
        if !matches.is_empty() {
            return Ok(false);
        }
        txn.instantiate_relation(container, rel_type, item, Value::Null)?;
        Ok(true)
    })
}

/// Terminates every membership matching `item`; returns how many.
pub fn remove<P>(
    graph: &VersionedGraph,
    container: i64,
    item: i64,
    rel_type: RelType,
    eq: P,
) -> Result<usize, GraphSeqError>
where
    P: Fn(&GraphEntity, &GraphEntity) -> bool,
{
    ensure_membership(rel_type)?;
    graph.transaction(|txn| {
        let matches = matches_at(&txn.snapshot(), container, item, rel_type, &eq)?;
        terminate_all(txn, &matches)
    })
}

/// Removes `item` if a member matches it, adds it otherwise. Returns whether
/// the item is a member afterwards.
pub fn toggle<P>(
    graph: &VersionedGraph,
    container: i64,
    item: i64,
    rel_type: RelType,
    eq: P,
) -> Result<bool, GraphSeqError>
where
    P: Fn(&GraphEntity, &GraphEntity) -> bool,
{
    ensure_membership(rel_type)?;
    graph.transaction(|txn| {
        let matches = matches_at(&txn.snapshot(), container, item, rel_type, &eq)?;
        if matches.is_empty() {
            txn.instantiate_relation(container, rel_type, item, Value::Null)?;
            Ok(true)
        } else {
            terminate_all(txn, &matches)?;
            Ok(false)
        }
    })
}

pub fn clear(
    graph: &VersionedGraph,
    container: i64,
    rel_type: RelType,
) -> Result<usize, GraphSeqError> {
    list::clear(graph, container, rel_type)
}

pub fn members(
    graph: &VersionedGraph,
    container: i64,
    rel_type: RelType,
) -> Result<Vec<i64>, GraphSeqError> {
    ensure_membership(rel_type)?;
    Ok(graph
        .now()?
        .out_relations(container, rel_type)?
        .iter()
        .map(GraphRelation::target)
        .collect())
}

fn matches_at<P>(
    snapshot: &Snapshot<'_>,
    container: i64,
    item: i64,
    rel_type: RelType,
    eq: &P,
) -> Result<Vec<GraphRelation>, GraphSeqError>
where
    P: Fn(&GraphEntity, &GraphEntity) -> bool,
{
    // The item itself may already be terminated; it can still be compared.
    let item = snapshot.entity_record(item)?;
    let mut found = Vec::new();
    for relation in snapshot.out_relations(container, rel_type)? {
        let candidate = snapshot.entity_record(relation.target)?;
        if eq(&candidate, &item) {
            found.push(relation);
        }
    }
    Ok(found)
}

fn terminate_all(
    txn: &Transaction<'_>,
    relations: &[GraphRelation],
) -> Result<usize, GraphSeqError> {
    for relation in relations {
        txn.terminate(relation.id)?;
    }
    Ok(relations.len())
}
