use parking_lot::RwLock;

use oxmatch_core::r#match::Match;

use crate::{MatchTable, TableConfig, TableResult};

/// A [MatchTable] behind a reader-writer lock, shared between the packet path and
/// the control path.
///
/// Lookups and walks take the read lock; anything that changes the entry set or a
/// payload takes the write lock. Locks are held only for the duration of one call.
pub struct SharedMatchTable<D> {
    inner: RwLock<MatchTable<D>>,
}

impl<D> Default for SharedMatchTable<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> SharedMatchTable<D> {
    pub fn new() -> Self {
        Self::from(MatchTable::new())
    }

    pub fn with_config(config: TableConfig) -> Self {
        Self::from(MatchTable::with_config(config))
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn insert(&self, m: Match, priority: u16, payload: D) -> TableResult<()> {
        self.inner.write().insert(m, priority, payload)
    }

    pub fn update(&self, m: &Match, priority: u16, payload: D) -> TableResult<D> {
        self.inner.write().update(m, priority, payload)
    }

    pub fn delete_strict(&self, m: &Match, priority: u16) -> Option<D> {
        self.inner.write().delete_strict(m, priority)
    }

    pub fn delete_matching(&self, query: &Match) -> Vec<(Match, u16, D)> {
        self.inner.write().delete_matching(query)
    }

    pub fn overlaps(&self, m: &Match, priority: u16) -> bool {
        self.inner.read().overlaps(m, priority)
    }

    pub fn for_each<F>(&self, visit: F)
    where
        F: FnMut(&Match, u16, &D),
    {
        self.inner.read().for_each(visit)
    }

    pub fn map<F>(&self, query: &Match, visit: F)
    where
        F: FnMut(&Match, u16, &D),
    {
        self.inner.read().map(query, visit)
    }

    pub fn clear(&self) {
        self.inner.write().clear()
    }

    /// Runs `f` with shared access to the table.
    pub fn with_read<R>(&self, f: impl FnOnce(&MatchTable<D>) -> R) -> R {
        f(&self.inner.read())
    }

    /// Runs `f` with exclusive access to the table.
    pub fn with_write<R>(&self, f: impl FnOnce(&mut MatchTable<D>) -> R) -> R {
        f(&mut self.inner.write())
    }

    pub fn into_inner(self) -> MatchTable<D> {
        self.inner.into_inner()
    }

    pub fn finalize<F>(self, release: F)
    where
        F: FnMut(Match, u16, D),
    {
        self.into_inner().finalize(release)
    }
}

impl<D: Clone> SharedMatchTable<D> {
    pub fn lookup(&self, query: &Match) -> Option<D> {
        self.inner.read().lookup(query).cloned()
    }

    pub fn lookup_strict(&self, m: &Match, priority: u16) -> Option<D> {
        self.inner.read().lookup_strict(m, priority).cloned()
    }
}

impl<D> From<MatchTable<D>> for SharedMatchTable<D> {
    fn from(table: MatchTable<D>) -> Self {
        SharedMatchTable {
            inner: RwLock::new(table),
        }
    }
}
