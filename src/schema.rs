use rusqlite::Connection;

use crate::errors::GraphSeqError;

pub fn ensure_schema(conn: &Connection) -> Result<(), GraphSeqError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS graph_ids (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            atom      TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS graph_transactions (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            opened_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );
        CREATE TABLE IF NOT EXISTS graph_entities (
            id            INTEGER PRIMARY KEY,
            kind          TEXT NOT NULL,
            data          TEXT NOT NULL,
            created_tx    INTEGER NOT NULL,
            terminated_tx INTEGER
        );
        CREATE TABLE IF NOT EXISTS graph_relations (
            id            INTEGER PRIMARY KEY,
            source_id     INTEGER NOT NULL,
            target_id     INTEGER NOT NULL,
            rel_type      TEXT NOT NULL,
            data          TEXT NOT NULL,
            created_tx    INTEGER NOT NULL,
            terminated_tx INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_relations_source ON graph_relations(source_id, rel_type);
        CREATE INDEX IF NOT EXISTS idx_relations_target ON graph_relations(target_id, rel_type);
        CREATE INDEX IF NOT EXISTS idx_relations_type ON graph_relations(rel_type);
        "#,
    )
    .map_err(|e| GraphSeqError::schema(e.to_string()))?;
    Ok(())
}
