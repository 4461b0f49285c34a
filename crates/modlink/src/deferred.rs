//! Deferred entry points blocked on chunk readiness.

use crate::chunk::{ChunkId, ChunkRegistry};
use crate::module::ModuleId;

/// An entry-point execution request together with the chunks it waits on.
///
/// Chunks are referenced by id, never by pointer, so a delivery never needs
/// to enumerate queue entries it does not own. The entry stays queued until
/// every listed chunk is loaded and is removed exactly once, in the drain
/// where its last dependency resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredEntry {
    /// The module to instantiate once all dependencies are loaded.
    pub module: ModuleId,
    /// Chunk ids that must be loaded before the entry may run.
    pub depends_on: Vec<ChunkId>,
}

impl DeferredEntry {
    /// Create an entry with no chunk dependencies.
    pub fn new(module: impl Into<ModuleId>) -> Self {
        Self {
            module: module.into(),
            depends_on: Vec::new(),
        }
    }

    /// Add a chunk the entry must wait for.
    pub fn after(mut self, chunk: impl Into<ChunkId>) -> Self {
        self.depends_on.push(chunk.into());
        self
    }

    /// Whether every dependency chunk is loaded.
    pub(crate) fn is_ready(&self, chunks: &ChunkRegistry) -> bool {
        self.depends_on.iter().all(|c| chunks.is_loaded(c))
    }
}

/// Queue storage for deferred entries. The scan policy lives in the
/// runtime's drain.
#[derive(Debug, Default)]
pub(crate) struct DeferredQueue {
    entries: Vec<DeferredEntry>,
}

impl DeferredQueue {
    pub(crate) fn extend(&mut self, entries: impl IntoIterator<Item = DeferredEntry>) {
        self.entries.extend(entries);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn entry(&self, index: usize) -> &DeferredEntry {
        &self.entries[index]
    }

    /// Remove the entry at `index`, preserving the order of the rest.
    pub(crate) fn remove(&mut self, index: usize) -> DeferredEntry {
        self.entries.remove(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readiness_requires_all_chunks() {
        let mut chunks = ChunkRegistry::new();
        let entry = DeferredEntry::new("./src/js/font.js")
            .after("font")
            .after("vendors");

        assert!(!entry.is_ready(&chunks));

        chunks.mark_loaded(&ChunkId::from("font"));
        assert!(!entry.is_ready(&chunks));

        chunks.mark_loaded(&ChunkId::from("vendors"));
        assert!(entry.is_ready(&chunks));
    }

    #[test]
    fn test_entry_without_deps_is_ready() {
        let chunks = ChunkRegistry::new();
        let entry = DeferredEntry::new("./src/js/index.js");
        assert!(entry.is_ready(&chunks));
    }
}
