//! Ordered lists, sets and matrices built from relations on a versioned
//! SQLite graph.
//! Run Criterion benchmarks with `cargo bench` to inspect reports under `target/criterion`.

pub mod cache;
pub mod chain;
pub mod config;
pub mod errors;
pub mod graph;
pub mod integrity;
pub mod list;
pub mod matrix;
pub mod ops;
pub mod schema;
pub mod set;

pub use crate::chain::{ChainArena, ChainDefect, ChainEnd};
pub use crate::config::GraphConfig;
pub use crate::errors::GraphSeqError;
pub use crate::graph::{GraphEntity, GraphRelation, RelType, Snapshot, Transaction, VersionedGraph};
pub use crate::integrity::{ChainIntegrityError, ChainReport};
pub use crate::list::ListView;
pub use crate::ops::SeqExt;
