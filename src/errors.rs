use thiserror::Error;

use crate::graph::RelType;

#[derive(Debug, Error)]
pub enum GraphSeqError {
    #[error("connection error: {0}")]
    ConnectionError(String),
    #[error("schema error: {0}")]
    SchemaError(String),
    #[error("query error: {0}")]
    QueryError(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("expected {expected}, found {found} items")]
    Cardinality { expected: &'static str, found: usize },
    #[error("invalid {rel_type} chain on {container}: {reason}")]
    InvalidChain {
        container: i64,
        rel_type: RelType,
        reason: String,
    },
    #[error("broken {rel_type} chain on {container}: walked {walked} of {total} relations")]
    BrokenChain {
        container: i64,
        rel_type: RelType,
        walked: usize,
        total: usize,
    },
    #[error("index {index} out of range for chain of length {len}")]
    Index { index: usize, len: usize },
    #[error(
        "matrix is {expected_rows}x{expected_cols} but values are {rows}x{cols}"
    )]
    Dimension {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },
    #[error("integrity error: {0}")]
    Integrity(String),
}

impl GraphSeqError {
    pub fn connection<T: Into<String>>(msg: T) -> Self {
        GraphSeqError::ConnectionError(msg.into())
    }

    pub fn schema<T: Into<String>>(msg: T) -> Self {
        GraphSeqError::SchemaError(msg.into())
    }

    pub fn query<T: Into<String>>(msg: T) -> Self {
        GraphSeqError::QueryError(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        GraphSeqError::NotFound(msg.into())
    }

    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        GraphSeqError::InvalidInput(msg.into())
    }

    pub fn integrity<T: Into<String>>(msg: T) -> Self {
        GraphSeqError::Integrity(msg.into())
    }

    pub fn invalid_chain<T: Into<String>>(container: i64, rel_type: RelType, reason: T) -> Self {
        GraphSeqError::InvalidChain {
            container,
            rel_type,
            reason: reason.into(),
        }
    }
}
