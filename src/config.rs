//! Configuration for opening a [`VersionedGraph`](crate::VersionedGraph).
//!
//! The defaults suit small in-process collections: chain arenas are memoised
//! per snapshot, prepared statements are cached, and the journal mode is left
//! to SQLite.

/// Options consumed by [`VersionedGraph::open_with_config`](crate::VersionedGraph::open_with_config).
///
/// # Examples
///
/// ```rust
/// use graphseq::GraphConfig;
///
/// let cfg = GraphConfig::default().without_chain_cache();
/// assert!(!cfg.cache_chains);
/// assert_eq!(cfg.statement_cache_capacity, 128);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphConfig {
    /// Memoise built chain arenas per `(container, relation type, epoch)`.
    ///
    /// **Default:** `true`
    ///
    /// The cache is cleared on every write and at every transaction boundary,
    /// so disabling it only trades speed for fewer allocations.
    pub cache_chains: bool,

    /// Capacity of rusqlite's prepared statement cache.
    ///
    /// **Default:** `128`
    pub statement_cache_capacity: usize,

    /// Switch file-backed stores to `journal_mode=WAL`.
    ///
    /// **Default:** `false`. Ignored for in-memory stores.
    pub wal: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            cache_chains: true,
            statement_cache_capacity: 128,
            wal: false,
        }
    }
}

impl GraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_chain_cache(mut self) -> Self {
        self.cache_chains = false;
        self
    }

    pub fn with_wal(mut self) -> Self {
        self.wal = true;
        self
    }

    pub fn with_statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.statement_cache_capacity = capacity;
        self
    }
}
