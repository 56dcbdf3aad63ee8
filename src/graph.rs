mod snapshot;
mod types;

use std::{cell::Cell, path::Path};

use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, trace, warn};

use crate::{
    cache::ChainCache, config::GraphConfig, errors::GraphSeqError, schema::ensure_schema,
};

pub use snapshot::Snapshot;
pub use types::{GraphEntity, GraphRelation, RelType};

pub(crate) use types::{
    ENTITY_COLUMNS, RELATION_COLUMNS, row_to_entity, row_to_relation, validate_kind,
};

/// A versioned graph on SQLite. Entities and relations are never deleted,
/// only terminated at an epoch, so any committed epoch can still be read.
pub struct VersionedGraph {
    conn: Connection,
    config: GraphConfig,
    chain_cache: ChainCache,
    open_tx: Cell<Option<i64>>,
}

impl VersionedGraph {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GraphSeqError> {
        Self::open_with_config(path, GraphConfig::default())
    }

    pub fn open_with_config<P: AsRef<Path>>(
        path: P,
        config: GraphConfig,
    ) -> Result<Self, GraphSeqError> {
        let conn =
            Connection::open(path).map_err(|e| GraphSeqError::connection(e.to_string()))?;
        if config.wal {
            let mode: String = conn
                .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
                .map_err(|e| GraphSeqError::connection(e.to_string()))?;
            debug!(%mode, "journal mode set");
        }
        ensure_schema(&conn)?;
        Ok(Self::from_connection(conn, config))
    }

    pub fn open_in_memory() -> Result<Self, GraphSeqError> {
        Self::open_in_memory_with_config(GraphConfig::default())
    }

    pub fn open_in_memory_with_config(config: GraphConfig) -> Result<Self, GraphSeqError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| GraphSeqError::connection(e.to_string()))?;
        ensure_schema(&conn)?;
        Ok(Self::from_connection(conn, config))
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Latest committed epoch, 0 for an empty store. Inside a transaction the
    /// open epoch is not counted.
    pub fn current_epoch(&self) -> Result<i64, GraphSeqError> {
        let bound = self.open_tx.get().unwrap_or(i64::MAX);
        self.conn
            .query_row(
                "SELECT COALESCE(MAX(id), 0) FROM graph_transactions WHERE id < ?1",
                params![bound],
                |row| row.get(0),
            )
            .map_err(|e| GraphSeqError::query(e.to_string()))
    }

    /// Snapshot of the graph as of this call. Inside a transaction it is bound
    /// to the open epoch, so the transaction's own writes are visible.
    pub fn now(&self) -> Result<Snapshot<'_>, GraphSeqError> {
        let epoch = match self.open_tx.get() {
            Some(epoch) => epoch,
            None => self.current_epoch()?,
        };
        Ok(Snapshot::new(self, epoch))
    }

    pub fn snapshot_at(&self, epoch: i64) -> Result<Snapshot<'_>, GraphSeqError> {
        let head = match self.open_tx.get() {
            Some(epoch) => epoch,
            None => self.current_epoch()?,
        };
        if epoch < 0 || epoch > head {
            return Err(GraphSeqError::invalid_input(format!(
                "epoch {epoch} outside 0..={head}"
            )));
        }
        Ok(Snapshot::new(self, epoch))
    }

    pub fn in_transaction(&self) -> bool {
        self.open_tx.get().is_some()
    }

    /// Runs `f` inside a write transaction and commits if it returns `Ok`.
    ///
    /// An `Err` rolls every write back and is returned unchanged. Calling
    /// `transaction` from inside `f` joins the outer transaction.
    pub fn transaction<T, F>(&self, f: F) -> Result<T, GraphSeqError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, GraphSeqError>,
    {
        if let Some(epoch) = self.open_tx.get() {
            return f(&Transaction { graph: self, epoch });
        }
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| GraphSeqError::query(format!("transaction begin: {e}")))?;
        tx.execute("INSERT INTO graph_transactions DEFAULT VALUES", [])
            .map_err(|e| GraphSeqError::query(format!("transaction epoch: {e}")))?;
        let epoch = tx.last_insert_rowid();

        let result = {
            let _scope = OpenScope::enter(self, epoch);
            f(&Transaction { graph: self, epoch })
        };

        match result {
            Ok(value) => {
                tx.commit()
                    .map_err(|e| GraphSeqError::query(format!("transaction commit: {e}")))?;
                debug!(epoch, "transaction committed");
                Ok(value)
            }
            Err(err) => {
                match tx.rollback() {
                    Ok(()) => debug!(epoch, error = %err, "transaction rolled back"),
                    Err(rollback) => warn!(
                        epoch,
                        error = %err,
                        rollback_error = %rollback,
                        "transaction rollback failed"
                    ),
                }
                Err(err)
            }
        }
    }
}

impl VersionedGraph {
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn chain_cache(&self) -> Option<&ChainCache> {
        self.config.cache_chains.then_some(&self.chain_cache)
    }

    pub(crate) fn invalidate_caches(&self) {
        self.chain_cache.clear();
    }

    fn from_connection(conn: Connection, config: GraphConfig) -> Self {
        conn.set_prepared_statement_cache_capacity(config.statement_cache_capacity);
        Self {
            conn,
            config,
            chain_cache: ChainCache::new(),
            open_tx: Cell::new(None),
        }
    }
}

/// Marks the graph as inside a transaction until dropped, also on unwind.
struct OpenScope<'g> {
    graph: &'g VersionedGraph,
}

impl<'g> OpenScope<'g> {
    fn enter(graph: &'g VersionedGraph, epoch: i64) -> Self {
        graph.open_tx.set(Some(epoch));
        Self { graph }
    }
}

impl Drop for OpenScope<'_> {
    fn drop(&mut self) {
        self.graph.open_tx.set(None);
        self.graph.invalidate_caches();
    }
}

/// Write handle passed to [`VersionedGraph::transaction`] closures.
pub struct Transaction<'g> {
    graph: &'g VersionedGraph,
    epoch: i64,
}

impl<'g> Transaction<'g> {
    pub fn epoch(&self) -> i64 {
        self.epoch
    }

    pub fn graph(&self) -> &'g VersionedGraph {
        self.graph
    }

    /// Snapshot at the open epoch, including this transaction's writes so far.
    pub fn snapshot(&self) -> Snapshot<'g> {
        Snapshot::new(self.graph, self.epoch)
    }

    pub fn instantiate_entity(
        &self,
        kind: &str,
        data: serde_json::Value,
    ) -> Result<i64, GraphSeqError> {
        validate_kind(kind)?;
        let data = serde_json::to_string(&data)
            .map_err(|e| GraphSeqError::invalid_input(e.to_string()))?;
        let id = self.allocate_id("entity")?;
        self.graph
            .connection()
            .prepare_cached(
                "INSERT INTO graph_entities(id, kind, data, created_tx) VALUES(?1, ?2, ?3, ?4)",
            )
            .and_then(|mut stmt| stmt.execute(params![id, kind, data, self.epoch]))
            .map_err(|e| GraphSeqError::query(e.to_string()))?;
        self.graph.invalidate_caches();
        trace!(id, kind, epoch = self.epoch, "entity instantiated");
        Ok(id)
    }

    /// Creates `source -[rel_type]-> target`. Either endpoint may itself be a
    /// relation; both must be visible at the open epoch.
    pub fn instantiate_relation(
        &self,
        source: i64,
        rel_type: RelType,
        target: i64,
        data: serde_json::Value,
    ) -> Result<GraphRelation, GraphSeqError> {
        let snapshot = self.snapshot();
        for endpoint in [source, target] {
            if !snapshot.is_visible(endpoint)? {
                return Err(GraphSeqError::not_found(format!(
                    "relation endpoint {endpoint} at epoch {}",
                    self.epoch
                )));
            }
        }
        let encoded = serde_json::to_string(&data)
            .map_err(|e| GraphSeqError::invalid_input(e.to_string()))?;
        let id = self.allocate_id("relation")?;
        self.graph
            .connection()
            .prepare_cached(
                "INSERT INTO graph_relations(id, source_id, target_id, rel_type, data, created_tx) \
                 VALUES(?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .and_then(|mut stmt| {
                stmt.execute(params![
                    id,
                    source,
                    target,
                    rel_type.as_str(),
                    encoded,
                    self.epoch
                ])
            })
            .map_err(|e| GraphSeqError::query(e.to_string()))?;
        self.graph.invalidate_caches();
        trace!(id, source, target, %rel_type, epoch = self.epoch, "relation instantiated");
        Ok(GraphRelation {
            id,
            source,
            target,
            rel_type,
            data,
            created_tx: self.epoch,
            terminated_tx: None,
        })
    }

    /// Ends `id` at the open epoch together with every relation attached to
    /// it, transitively.
    pub fn terminate(&self, id: i64) -> Result<(), GraphSeqError> {
        if !self.snapshot().is_visible(id)? {
            return Err(GraphSeqError::not_found(format!(
                "{id} at epoch {}",
                self.epoch
            )));
        }
        let conn = self.graph.connection();
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            for sql in [
                "UPDATE graph_entities SET terminated_tx=?2 WHERE id=?1 AND terminated_tx IS NULL",
                "UPDATE graph_relations SET terminated_tx=?2 WHERE id=?1 AND terminated_tx IS NULL",
            ] {
                conn.prepare_cached(sql)
                    .and_then(|mut stmt| stmt.execute(params![current, self.epoch]))
                    .map_err(|e| GraphSeqError::query(e.to_string()))?;
            }
            let mut stmt = conn
                .prepare_cached(
                    "SELECT id FROM graph_relations \
                     WHERE (source_id=?1 OR target_id=?1) AND terminated_tx IS NULL ORDER BY id",
                )
                .map_err(|e| GraphSeqError::query(e.to_string()))?;
            let rows = stmt
                .query_map(params![current], |row| row.get::<_, i64>(0))
                .map_err(|e| GraphSeqError::query(e.to_string()))?;
            for attached in rows {
                pending.push(attached.map_err(|e| GraphSeqError::query(e.to_string()))?);
            }
        }
        self.graph.invalidate_caches();
        trace!(id, epoch = self.epoch, "terminated");
        Ok(())
    }

    fn allocate_id(&self, atom: &str) -> Result<i64, GraphSeqError> {
        let conn = self.graph.connection();
        conn.prepare_cached("INSERT INTO graph_ids(atom) VALUES(?1)")
            .and_then(|mut stmt| stmt.execute(params![atom]))
            .map_err(|e| GraphSeqError::query(e.to_string()))?;
        Ok(conn.last_insert_rowid())
    }
}

pub(crate) fn optional_row<T>(
    result: Result<T, rusqlite::Error>,
) -> Result<Option<T>, GraphSeqError> {
    result
        .optional()
        .map_err(|e| GraphSeqError::query(e.to_string()))
}
