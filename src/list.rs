//! Ordered lists anchored on a container entity.
//!
//! A list is the set of membership relations `container -[rel_type]-> item`
//! ordered by `Next` relations running from one membership relation to the
//! following one. Reads bind to a single [`Snapshot`]; every mutation runs in
//! one transaction.

use serde_json::Value;
use tracing::warn;

use crate::{
    chain::{ChainArena, ChainEnd},
    errors::GraphSeqError,
    graph::{GraphRelation, RelType, Snapshot, Transaction, VersionedGraph},
    ops::SeqExt,
};

/// Result of [`materialize`]: the chain in order, or, when the caller allowed
/// it and the chain is broken, the memberships in no particular order.
#[derive(Clone, Debug, PartialEq)]
pub enum ListView {
    Ordered(Vec<GraphRelation>),
    Unordered(Vec<GraphRelation>),
}

impl ListView {
    pub fn is_ordered(&self) -> bool {
        matches!(self, ListView::Ordered(_))
    }

    pub fn relations(&self) -> &[GraphRelation] {
        match self {
            ListView::Ordered(relations) | ListView::Unordered(relations) => relations,
        }
    }

    pub fn into_relations(self) -> Vec<GraphRelation> {
        match self {
            ListView::Ordered(relations) | ListView::Unordered(relations) => relations,
        }
    }

    pub fn targets(&self) -> Vec<i64> {
        self.relations().iter().map(GraphRelation::target).collect()
    }

    pub fn len(&self) -> usize {
        self.relations().len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations().is_empty()
    }
}

pub fn head(
    graph: &VersionedGraph,
    container: i64,
    rel_type: RelType,
) -> Result<Option<ChainEnd>, GraphSeqError> {
    head_at(&graph.now()?, container, rel_type)
}

pub fn head_at(
    snapshot: &Snapshot<'_>,
    container: i64,
    rel_type: RelType,
) -> Result<Option<ChainEnd>, GraphSeqError> {
    ensure_membership(rel_type)?;
    ChainArena::load(snapshot, container, rel_type)?.head()
}

pub fn tail(
    graph: &VersionedGraph,
    container: i64,
    rel_type: RelType,
) -> Result<Option<ChainEnd>, GraphSeqError> {
    tail_at(&graph.now()?, container, rel_type)
}

pub fn tail_at(
    snapshot: &Snapshot<'_>,
    container: i64,
    rel_type: RelType,
) -> Result<Option<ChainEnd>, GraphSeqError> {
    ensure_membership(rel_type)?;
    ChainArena::load(snapshot, container, rel_type)?.tail()
}

pub fn nth(
    graph: &VersionedGraph,
    container: i64,
    index: usize,
    rel_type: RelType,
) -> Result<GraphRelation, GraphSeqError> {
    nth_at(&graph.now()?, container, index, rel_type)
}

pub fn nth_at(
    snapshot: &Snapshot<'_>,
    container: i64,
    index: usize,
    rel_type: RelType,
) -> Result<GraphRelation, GraphSeqError> {
    ensure_membership(rel_type)?;
    let arena = ChainArena::load(snapshot, container, rel_type)?;
    arena.nth(index).cloned()
}

/// Number of memberships, linked or not.
pub fn len(
    graph: &VersionedGraph,
    container: i64,
    rel_type: RelType,
) -> Result<usize, GraphSeqError> {
    ensure_membership(rel_type)?;
    graph.now()?.count_out(container, rel_type)
}

pub fn materialize(
    graph: &VersionedGraph,
    container: i64,
    rel_type: RelType,
    allow_fallback: bool,
) -> Result<ListView, GraphSeqError> {
    materialize_at(&graph.now()?, container, rel_type, allow_fallback)
}

/// Walks the chain head to tail. Any structural defect counts as a walk that
/// misses relations: it is a [`GraphSeqError::BrokenChain`] unless
/// `allow_fallback` asks for the unordered memberships instead.
pub fn materialize_at(
    snapshot: &Snapshot<'_>,
    container: i64,
    rel_type: RelType,
    allow_fallback: bool,
) -> Result<ListView, GraphSeqError> {
    ensure_membership(rel_type)?;
    let arena = ChainArena::load(snapshot, container, rel_type)?;
    if arena.is_complete() {
        return Ok(ListView::Ordered(arena.walk().into_iter().cloned().collect()));
    }
    let walked = arena.walk().len();
    let total = arena.len();
    if !allow_fallback {
        return Err(GraphSeqError::BrokenChain {
            container,
            rel_type,
            walked,
            total,
        });
    }
    warn!(
        container,
        %rel_type,
        walked,
        total,
        defects = arena.defects().len(),
        "chain does not link every member, returning them unordered"
    );
    Ok(ListView::Unordered(
        arena.nodes().iter().map(|node| node.relation.clone()).collect(),
    ))
}

/// Terminates every `rel_type` membership of `container`; returns how many.
pub fn clear(
    graph: &VersionedGraph,
    container: i64,
    rel_type: RelType,
) -> Result<usize, GraphSeqError> {
    ensure_membership(rel_type)?;
    graph.transaction(|txn| clear_in(txn, container, rel_type))
}

/// Replaces the list content with `items`, in order.
pub fn fill(
    graph: &VersionedGraph,
    container: i64,
    items: &[i64],
    rel_type: RelType,
) -> Result<Vec<GraphRelation>, GraphSeqError> {
    ensure_membership(rel_type)?;
    graph.transaction(|txn| {
        clear_in(txn, container, rel_type)?;
        let relations = items
            .iter()
            .map(|&item| txn.instantiate_relation(container, rel_type, item, Value::Null))
            .collect::<Result<Vec<_>, _>>()?;
        link_in_order(txn, &relations)?;
        Ok(relations)
    })
}

pub fn push_front(
    graph: &VersionedGraph,
    container: i64,
    item: i64,
    rel_type: RelType,
) -> Result<GraphRelation, GraphSeqError> {
    ensure_membership(rel_type)?;
    graph.transaction(|txn| {
        let head = head_at(&txn.snapshot(), container, rel_type)?;
        let relation = txn.instantiate_relation(container, rel_type, item, Value::Null)?;
        if let Some(head) = head {
            txn.instantiate_relation(relation.id, RelType::Next, head.relation.id, Value::Null)?;
        }
        Ok(relation)
    })
}

pub fn push_back(
    graph: &VersionedGraph,
    container: i64,
    item: i64,
    rel_type: RelType,
) -> Result<GraphRelation, GraphSeqError> {
    ensure_membership(rel_type)?;
    graph.transaction(|txn| {
        let tail = tail_at(&txn.snapshot(), container, rel_type)?;
        let relation = txn.instantiate_relation(container, rel_type, item, Value::Null)?;
        if let Some(tail) = tail {
            txn.instantiate_relation(tail.relation.id, RelType::Next, relation.id, Value::Null)?;
        }
        Ok(relation)
    })
}

/// Removes one membership relation, joining its neighbours so the chain stays
/// contiguous. Returns the relation as it was before termination.
pub fn pop(graph: &VersionedGraph, relation: i64) -> Result<GraphRelation, GraphSeqError> {
    graph.transaction(|txn| {
        let snapshot = txn.snapshot();
        let popped = snapshot.relation(relation)?;
        if !popped.rel_type.is_membership() {
            return Err(GraphSeqError::invalid_input(format!(
                "relation {relation} is a {} relation, not a membership",
                popped.rel_type
            )));
        }
        let invalid = |reason: &str| {
            GraphSeqError::invalid_chain(
                popped.source,
                popped.rel_type,
                format!("{reason} of relation {relation}"),
            )
        };
        let following = snapshot
            .out_relations(relation, RelType::Next)?
            .at_most_one()
            .map_err(|_| invalid("more than one successor"))?;
        let preceding = snapshot
            .in_relations(relation, RelType::Next)?
            .at_most_one()
            .map_err(|_| invalid("more than one predecessor"))?;
        if preceding.as_ref().is_some_and(|link| link.source == relation) {
            return Err(invalid("self link"));
        }
        txn.terminate(relation)?;
        if let (Some(preceding), Some(following)) = (preceding, following) {
            txn.instantiate_relation(
                preceding.source,
                RelType::Next,
                following.target,
                Value::Null,
            )?;
        }
        Ok(popped)
    })
}

pub(crate) fn clear_in(
    txn: &Transaction<'_>,
    container: i64,
    rel_type: RelType,
) -> Result<usize, GraphSeqError> {
    let members = txn.snapshot().out_relations(container, rel_type)?;
    for member in &members {
        txn.terminate(member.id)?;
    }
    Ok(members.len())
}

/// Creates a `Next` relation between each consecutive pair of `relations`.
pub(crate) fn link_in_order(
    txn: &Transaction<'_>,
    relations: &[GraphRelation],
) -> Result<(), GraphSeqError> {
    for pair in relations.windows(2) {
        txn.instantiate_relation(pair[0].id, RelType::Next, pair[1].id, Value::Null)?;
    }
    Ok(())
}

pub(crate) fn ensure_membership(rel_type: RelType) -> Result<(), GraphSeqError> {
    if !rel_type.is_membership() {
        return Err(GraphSeqError::invalid_input(format!(
            "{rel_type} cannot anchor a collection"
        )));
    }
    Ok(())
}
