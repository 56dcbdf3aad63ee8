//! Index-linked view of a `Next` chain.
//!
//! The store keeps order as `Next` relations running between membership
//! relations. [`ChainArena`] reads those once from a [`Snapshot`] into a
//! doubly-linked list addressed by slot index, with head and tail candidates
//! resolved up front, so positional queries run without further I/O.
//! Structural problems are recorded while linking instead of failing the
//! build; each query decides whether they matter.

use std::{fmt, sync::Arc};

use ahash::AHashMap;
use serde::Serialize;
use tracing::trace;

use crate::{
    cache::ChainKey,
    errors::GraphSeqError,
    graph::{GraphRelation, RelType, Snapshot},
};

/// Slot the positional shortcuts start from: the lowest-id membership.
const ARBITRARY_START: usize = 0;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ChainDefect {
    /// A relation links to itself.
    SelfLink { relation: i64 },
    /// A relation has more than one outgoing `Next`.
    Fork { relation: i64 },
    /// A relation has more than one incoming `Next`.
    Merge { relation: i64 },
    /// A `Next` crosses into or out of the container's memberships.
    ForeignLink { from: i64, to: i64 },
}

impl fmt::Display for ChainDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainDefect::SelfLink { relation } => write!(f, "relation {relation} links to itself"),
            ChainDefect::Fork { relation } => {
                write!(f, "relation {relation} has more than one successor")
            }
            ChainDefect::Merge { relation } => {
                write!(f, "relation {relation} has more than one predecessor")
            }
            ChainDefect::ForeignLink { from, to } => {
                write!(f, "link {from} -> {to} crosses the container boundary")
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct ChainNode {
    pub relation: GraphRelation,
    prev: Option<usize>,
    next: Option<usize>,
}

impl ChainNode {
    pub fn prev(&self) -> Option<usize> {
        self.prev
    }

    pub fn next(&self) -> Option<usize> {
        self.next
    }
}

/// An end of the chain plus the number of steps it took to reach it from the
/// arbitrary start.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainEnd {
    pub relation: GraphRelation,
    pub distance: usize,
}

#[derive(Clone, Copy)]
enum Walk {
    Back,
    Forward,
}

#[derive(Debug)]
pub struct ChainArena {
    container: i64,
    rel_type: RelType,
    epoch: i64,
    nodes: Vec<ChainNode>,
    heads: Vec<usize>,
    tails: Vec<usize>,
    links: usize,
    defects: Vec<ChainDefect>,
}

impl ChainArena {
    /// Reads the `rel_type` chain of `container` at `snapshot`, reusing a
    /// cached arena for the same epoch when the graph allows it.
    pub fn load(
        snapshot: &Snapshot<'_>,
        container: i64,
        rel_type: RelType,
    ) -> Result<Arc<ChainArena>, GraphSeqError> {
        let key = ChainKey {
            container,
            rel_type,
            epoch: snapshot.epoch(),
        };
        let cache = snapshot.graph().chain_cache();
        if let Some(hit) = cache.and_then(|cache| cache.get(&key)) {
            return Ok(hit);
        }
        let members = snapshot.out_relations(container, rel_type)?;
        let links = snapshot.chain_links(container, rel_type)?;
        let arena = Arc::new(Self::from_parts(
            container,
            rel_type,
            snapshot.epoch(),
            members,
            &links,
        ));
        trace!(
            container,
            %rel_type,
            epoch = snapshot.epoch(),
            members = arena.len(),
            links = arena.links,
            "chain arena built"
        );
        if let Some(cache) = cache {
            cache.insert(key, Arc::clone(&arena));
        }
        Ok(arena)
    }

    /// Links `members` with `links` given as `(from, to)` relation ids.
    pub fn from_parts(
        container: i64,
        rel_type: RelType,
        epoch: i64,
        members: Vec<GraphRelation>,
        links: &[(i64, i64)],
    ) -> Self {
        let mut nodes: Vec<ChainNode> = members
            .into_iter()
            .map(|relation| ChainNode {
                relation,
                prev: None,
                next: None,
            })
            .collect();
        nodes.sort_by_key(|node| node.relation.id);
        let slot_of: AHashMap<i64, usize> = nodes
            .iter()
            .enumerate()
            .map(|(slot, node)| (node.relation.id, slot))
            .collect();

        let mut defects = Vec::new();
        let mut linked = 0;
        for &(from, to) in links {
            let (a, b) = match (slot_of.get(&from), slot_of.get(&to)) {
                (Some(&a), Some(&b)) => (a, b),
                (None, None) => continue,
                _ => {
                    defects.push(ChainDefect::ForeignLink { from, to });
                    continue;
                }
            };
            if a == b {
                defects.push(ChainDefect::SelfLink { relation: from });
                continue;
            }
            if nodes[a].next.is_some() {
                defects.push(ChainDefect::Fork { relation: from });
                continue;
            }
            if nodes[b].prev.is_some() {
                defects.push(ChainDefect::Merge { relation: to });
                continue;
            }
            nodes[a].next = Some(b);
            nodes[b].prev = Some(a);
            linked += 1;
        }

        let heads = (0..nodes.len()).filter(|&s| nodes[s].prev.is_none()).collect();
        let tails = (0..nodes.len()).filter(|&s| nodes[s].next.is_none()).collect();
        Self {
            container,
            rel_type,
            epoch,
            nodes,
            heads,
            tails,
            links: linked,
            defects,
        }
    }

    pub fn container(&self) -> i64 {
        self.container
    }

    pub fn rel_type(&self) -> RelType {
        self.rel_type
    }

    pub fn epoch(&self) -> i64 {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[ChainNode] {
        &self.nodes
    }

    pub fn head_candidates(&self) -> usize {
        self.heads.len()
    }

    pub fn tail_candidates(&self) -> usize {
        self.tails.len()
    }

    pub fn link_count(&self) -> usize {
        self.links
    }

    pub fn defects(&self) -> &[ChainDefect] {
        &self.defects
    }

    pub fn head(&self) -> Result<Option<ChainEnd>, GraphSeqError> {
        self.end(Walk::Back)
    }

    pub fn tail(&self) -> Result<Option<ChainEnd>, GraphSeqError> {
        self.end(Walk::Forward)
    }

    /// Relation at `index`, counting from the head.
    pub fn nth(&self, index: usize) -> Result<&GraphRelation, GraphSeqError> {
        let Some((head, distance)) = self.end_slot(Walk::Back)? else {
            return Err(GraphSeqError::Index { index, len: 0 });
        };
        // The arbitrary start sits `distance` steps after the head.
        let (mut slot, mut position) = if distance <= index {
            (ARBITRARY_START, distance)
        } else {
            (head, 0)
        };
        while position < index {
            match self.nodes[slot].next {
                Some(next) => {
                    slot = next;
                    position += 1;
                }
                None => {
                    return Err(GraphSeqError::Index {
                        index,
                        len: position + 1,
                    });
                }
            }
        }
        Ok(&self.nodes[slot].relation)
    }

    /// Slots reached by walking forward from the first head candidate.
    pub fn walk(&self) -> Vec<&GraphRelation> {
        let Some(&start) = self.heads.first() else {
            return Vec::new();
        };
        let mut walked = Vec::with_capacity(self.nodes.len());
        let mut slot = Some(start);
        while let Some(current) = slot {
            if walked.len() == self.nodes.len() {
                break;
            }
            walked.push(&self.nodes[current].relation);
            slot = self.nodes[current].next;
        }
        walked
    }

    /// True when exactly one head reaches every membership without defects.
    pub fn is_complete(&self) -> bool {
        self.defects.is_empty() && self.heads.len() <= 1 && self.walk().len() == self.len()
    }

    fn end(&self, walk: Walk) -> Result<Option<ChainEnd>, GraphSeqError> {
        Ok(self.end_slot(walk)?.map(|(slot, distance)| ChainEnd {
            relation: self.nodes[slot].relation.clone(),
            distance,
        }))
    }

    fn end_slot(&self, walk: Walk) -> Result<Option<(usize, usize)>, GraphSeqError> {
        if let Some(defect) = self.defects.first() {
            return Err(self.invalid(defect.to_string()));
        }
        if self.nodes.is_empty() {
            return Ok(None);
        }
        let (candidates, label) = match walk {
            Walk::Back => (&self.heads, "head"),
            Walk::Forward => (&self.tails, "tail"),
        };
        match candidates.len() {
            0 => return Err(self.invalid(format!("no {label} candidate, the chain is cyclic"))),
            1 => {}
            n => return Err(self.invalid(format!("{n} {label} candidates"))),
        }
        let mut slot = ARBITRARY_START;
        let mut distance = 0;
        loop {
            let step = match walk {
                Walk::Back => self.nodes[slot].prev,
                Walk::Forward => self.nodes[slot].next,
            };
            let Some(step) = step else {
                return Ok(Some((slot, distance)));
            };
            if distance == self.nodes.len() {
                return Err(self.invalid("walk does not terminate, the chain is cyclic"));
            }
            slot = step;
            distance += 1;
        }
    }

    fn invalid<T: Into<String>>(&self, reason: T) -> GraphSeqError {
        GraphSeqError::invalid_chain(self.container, self.rel_type, reason)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn member(id: i64) -> GraphRelation {
        GraphRelation {
            id,
            source: 1,
            target: 100 + id,
            rel_type: RelType::Member,
            data: json!(null),
            created_tx: 1,
            terminated_tx: None,
        }
    }

    fn arena(ids: &[i64], links: &[(i64, i64)]) -> ChainArena {
        let members = ids.iter().copied().map(member).collect();
        ChainArena::from_parts(1, RelType::Member, 1, members, links)
    }

    #[test]
    fn head_distance_counts_steps_from_lowest_id() {
        // order 30 -> 10 -> 20
        let chain = arena(&[10, 20, 30], &[(30, 10), (10, 20)]);
        let head = chain.head().unwrap().unwrap();
        assert_eq!(head.relation.id, 30);
        assert_eq!(head.distance, 1);
        let tail = chain.tail().unwrap().unwrap();
        assert_eq!(tail.relation.id, 20);
        assert_eq!(tail.distance, 1);
    }

    #[test]
    fn nth_uses_either_start() {
        let chain = arena(&[10, 20, 30], &[(30, 10), (10, 20)]);
        let order: Vec<i64> = (0..3).map(|i| chain.nth(i).unwrap().id).collect();
        assert_eq!(order, vec![30, 10, 20]);
        assert!(matches!(
            chain.nth(3),
            Err(GraphSeqError::Index { index: 3, len: 3 })
        ));
    }

    #[test]
    fn fork_and_merge_are_defects() {
        let fork = arena(&[1, 2, 3], &[(1, 2), (1, 3)]);
        assert_eq!(fork.defects(), &[ChainDefect::Fork { relation: 1 }]);
        assert!(matches!(fork.head(), Err(GraphSeqError::InvalidChain { .. })));

        let merge = arena(&[1, 2, 3], &[(1, 3), (2, 3)]);
        assert_eq!(merge.defects(), &[ChainDefect::Merge { relation: 3 }]);
        assert!(merge.tail().is_err());
    }

    #[test]
    fn links_across_the_container_are_foreign() {
        let outgoing = arena(&[1, 2], &[(1, 2), (2, 99)]);
        assert_eq!(
            outgoing.defects(),
            &[ChainDefect::ForeignLink { from: 2, to: 99 }]
        );
        assert!(!outgoing.is_complete());

        let incoming = arena(&[1, 2], &[(98, 2), (1, 2)]);
        assert_eq!(
            incoming.defects(),
            &[ChainDefect::ForeignLink { from: 98, to: 2 }]
        );
        assert!(matches!(incoming.head(), Err(GraphSeqError::InvalidChain { .. })));
    }

    #[test]
    fn orphan_cycle_is_incomplete() {
        // 1 -> 2 is the chain, 3 <-> 4 loops on its own
        let chain = arena(&[1, 2, 3, 4], &[(1, 2), (3, 4), (4, 3)]);
        assert_eq!(chain.head_candidates(), 1);
        assert_eq!(chain.walk().len(), 2);
        assert!(!chain.is_complete());
    }

    #[test]
    fn pure_cycle_has_no_head() {
        let chain = arena(&[1, 2], &[(1, 2), (2, 1)]);
        assert!(matches!(chain.head(), Err(GraphSeqError::InvalidChain { .. })));
        assert!(chain.walk().is_empty());
    }

    #[test]
    fn empty_arena_has_no_ends() {
        let chain = arena(&[], &[]);
        assert!(chain.head().unwrap().is_none());
        assert!(chain.tail().unwrap().is_none());
        assert!(chain.is_complete());
        assert!(matches!(
            chain.nth(0),
            Err(GraphSeqError::Index { index: 0, len: 0 })
        ));
    }
}
