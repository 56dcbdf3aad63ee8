use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::{chain::ChainArena, graph::RelType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChainKey {
    pub container: i64,
    pub rel_type: RelType,
    pub epoch: i64,
}

/// Built chain arenas, keyed by the snapshot they were read from.
#[derive(Default)]
pub struct ChainCache {
    inner: RwLock<AHashMap<ChainKey, Arc<ChainArena>>>,
}

impl ChainCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(AHashMap::new()),
        }
    }

    pub fn get(&self, key: &ChainKey) -> Option<Arc<ChainArena>> {
        self.inner.read().get(key).cloned()
    }

    pub fn insert(&self, key: ChainKey, arena: Arc<ChainArena>) {
        self.inner.write().insert(key, arena);
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }
}
