use std::fmt;

use rusqlite::{Params, params};

use crate::errors::GraphSeqError;

use super::{
    ENTITY_COLUMNS, GraphEntity, GraphRelation, RELATION_COLUMNS, RelType, VersionedGraph,
    optional_row, row_to_entity, row_to_relation,
};

/// Read view of a [`VersionedGraph`] frozen at one epoch.
///
/// Every traversal through the same snapshot observes the same state, no
/// matter what is committed afterwards. A snapshot bound to an open
/// transaction's epoch is the exception: it also sees that transaction's
/// later writes until it commits.
#[derive(Clone, Copy)]
pub struct Snapshot<'g> {
    graph: &'g VersionedGraph,
    epoch: i64,
}

impl fmt::Debug for Snapshot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot").field("epoch", &self.epoch).finish()
    }
}

impl<'g> Snapshot<'g> {
    pub(crate) fn new(graph: &'g VersionedGraph, epoch: i64) -> Self {
        Self { graph, epoch }
    }

    pub fn epoch(&self) -> i64 {
        self.epoch
    }

    pub fn graph(&self) -> &'g VersionedGraph {
        self.graph
    }

    pub fn entity(&self, id: i64) -> Result<GraphEntity, GraphSeqError> {
        let sql = format!(
            "SELECT {ENTITY_COLUMNS} FROM graph_entities WHERE id=?1 \
             AND created_tx <= ?2 AND (terminated_tx IS NULL OR terminated_tx > ?2)"
        );
        let found = optional_row(
            self.graph
                .connection()
                .prepare_cached(&sql)
                .and_then(|mut stmt| stmt.query_row(params![id, self.epoch], row_to_entity)),
        )?;
        found
            .map(|entity| entity.as_of(self.epoch))
            .ok_or_else(|| GraphSeqError::not_found(format!("entity {id} at epoch {}", self.epoch)))
    }

    /// Entity row created at or before this epoch, whether or not it is still
    /// alive. A termination after this epoch is hidden as in [`Self::entity`].
    pub fn entity_record(&self, id: i64) -> Result<GraphEntity, GraphSeqError> {
        let sql = format!(
            "SELECT {ENTITY_COLUMNS} FROM graph_entities WHERE id=?1 AND created_tx <= ?2"
        );
        let found = optional_row(
            self.graph
                .connection()
                .prepare_cached(&sql)
                .and_then(|mut stmt| stmt.query_row(params![id, self.epoch], row_to_entity)),
        )?;
        found
            .map(|entity| entity.as_of(self.epoch))
            .ok_or_else(|| GraphSeqError::not_found(format!("entity {id} at epoch {}", self.epoch)))
    }

    pub fn relation(&self, id: i64) -> Result<GraphRelation, GraphSeqError> {
        let sql = format!(
            "SELECT {RELATION_COLUMNS} FROM graph_relations WHERE id=?1 \
             AND created_tx <= ?2 AND (terminated_tx IS NULL OR terminated_tx > ?2)"
        );
        let found = optional_row(
            self.graph
                .connection()
                .prepare_cached(&sql)
                .and_then(|mut stmt| stmt.query_row(params![id, self.epoch], row_to_relation)),
        )?;
        found.map(|relation| relation.as_of(self.epoch)).ok_or_else(|| {
            GraphSeqError::not_found(format!("relation {id} at epoch {}", self.epoch))
        })
    }

    /// Whether `id` names an entity or relation alive at this epoch.
    pub fn is_visible(&self, id: i64) -> Result<bool, GraphSeqError> {
        let found: Option<i64> = optional_row(
            self.graph
                .connection()
                .prepare_cached(
                    "SELECT 1 FROM graph_entities WHERE id=?1 \
                       AND created_tx <= ?2 AND (terminated_tx IS NULL OR terminated_tx > ?2) \
                     UNION ALL \
                     SELECT 1 FROM graph_relations WHERE id=?1 \
                       AND created_tx <= ?2 AND (terminated_tx IS NULL OR terminated_tx > ?2) \
                     LIMIT 1",
                )
                .and_then(|mut stmt| stmt.query_row(params![id, self.epoch], |row| row.get(0))),
        )?;
        Ok(found.is_some())
    }

    pub fn out_relations(
        &self,
        source: i64,
        rel_type: RelType,
    ) -> Result<Vec<GraphRelation>, GraphSeqError> {
        let sql = format!(
            "SELECT {RELATION_COLUMNS} FROM graph_relations \
             WHERE source_id=?1 AND rel_type=?2 \
             AND created_tx <= ?3 AND (terminated_tx IS NULL OR terminated_tx > ?3) ORDER BY id"
        );
        self.collect_relations(&sql, params![source, rel_type.as_str(), self.epoch])
    }

    pub fn in_relations(
        &self,
        target: i64,
        rel_type: RelType,
    ) -> Result<Vec<GraphRelation>, GraphSeqError> {
        let sql = format!(
            "SELECT {RELATION_COLUMNS} FROM graph_relations \
             WHERE target_id=?1 AND rel_type=?2 \
             AND created_tx <= ?3 AND (terminated_tx IS NULL OR terminated_tx > ?3) ORDER BY id"
        );
        self.collect_relations(&sql, params![target, rel_type.as_str(), self.epoch])
    }

    /// Relations of `rel_type` running directly from `source` to `target`.
    pub fn connections(
        &self,
        source: i64,
        rel_type: RelType,
        target: i64,
    ) -> Result<Vec<GraphRelation>, GraphSeqError> {
        let sql = format!(
            "SELECT {RELATION_COLUMNS} FROM graph_relations \
             WHERE source_id=?1 AND rel_type=?2 AND target_id=?3 \
             AND created_tx <= ?4 AND (terminated_tx IS NULL OR terminated_tx > ?4) ORDER BY id"
        );
        self.collect_relations(&sql, params![source, rel_type.as_str(), target, self.epoch])
    }

    pub fn count_out(&self, source: i64, rel_type: RelType) -> Result<usize, GraphSeqError> {
        let count: i64 = self
            .graph
            .connection()
            .prepare_cached(
                "SELECT COUNT(*) FROM graph_relations WHERE source_id=?1 AND rel_type=?2 \
                 AND created_tx <= ?3 AND (terminated_tx IS NULL OR terminated_tx > ?3)",
            )
            .and_then(|mut stmt| {
                stmt.query_row(params![source, rel_type.as_str(), self.epoch], |row| {
                    row.get(0)
                })
            })
            .map_err(|e| GraphSeqError::query(e.to_string()))?;
        Ok(count as usize)
    }

    /// `Next` links (as `(from, to)` relation ids) with either end on one of
    /// the `rel_type` memberships of `container`.
    pub(crate) fn chain_links(
        &self,
        container: i64,
        rel_type: RelType,
    ) -> Result<Vec<(i64, i64)>, GraphSeqError> {
        let conn = self.graph.connection();
        let mut stmt = conn
            .prepare_cached(
                "WITH m AS (SELECT id FROM graph_relations \
                   WHERE source_id=?1 AND rel_type=?2 \
                   AND created_tx <= ?4 AND (terminated_tx IS NULL OR terminated_tx > ?4)) \
                 SELECT n.source_id, n.target_id FROM graph_relations n \
                 WHERE n.rel_type=?3 \
                 AND n.created_tx <= ?4 AND (n.terminated_tx IS NULL OR n.terminated_tx > ?4) \
                 AND (n.source_id IN (SELECT id FROM m) OR n.target_id IN (SELECT id FROM m)) \
                 ORDER BY n.id",
            )
            .map_err(|e| GraphSeqError::query(e.to_string()))?;
        let rows = stmt
            .query_map(
                params![container, rel_type.as_str(), RelType::Next.as_str(), self.epoch],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|e| GraphSeqError::query(e.to_string()))?;
        let mut links = Vec::new();
        for link in rows {
            links.push(link.map_err(|e| GraphSeqError::query(e.to_string()))?);
        }
        Ok(links)
    }

    fn collect_relations<P: Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<GraphRelation>, GraphSeqError> {
        let conn = self.graph.connection();
        let mut stmt = conn
            .prepare_cached(sql)
            .map_err(|e| GraphSeqError::query(e.to_string()))?;
        let rows = stmt
            .query_map(params, row_to_relation)
            .map_err(|e| GraphSeqError::query(e.to_string()))?;
        let mut relations = Vec::new();
        for relation in rows {
            let relation = relation.map_err(|e| GraphSeqError::query(e.to_string()))?;
            relations.push(relation.as_of(self.epoch));
        }
        Ok(relations)
    }
}
