//! Chunk identity and the monotonic chunk registry.
//!
//! A chunk is a bundle of modules delivered and marked ready as one unit.
//! The registry tracks per-chunk readiness and holds the wake signals of
//! callers waiting for a pending chunk.

use std::fmt;

use rustc_hash::FxHashMap;

/// Identifier of a chunk, unique within a runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(String);

impl ChunkId {
    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ChunkId {
    fn from(s: &str) -> ChunkId {
        ChunkId(s.to_string())
    }
}

impl From<String> for ChunkId {
    fn from(s: String) -> ChunkId {
        ChunkId(s)
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A suspended task waiting for a chunk. Fired exactly once, in delivery
/// order, when the chunk transitions to loaded.
pub type Waiter = Box<dyn FnOnce()>;

/// Observed lifecycle state of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    /// Never seen by the runtime.
    Unloaded,
    /// Delivery promised but not yet confirmed.
    Pending,
    /// Delivery confirmed. Terminal.
    Loaded,
}

enum Slot {
    Pending(Vec<Waiter>),
    Loaded,
}

/// Tracks per-chunk readiness.
///
/// States only move forward: `unloaded -> pending -> loaded`, or directly
/// `unloaded -> loaded` for speculative deliveries nobody asked for.
#[derive(Default)]
pub struct ChunkRegistry {
    slots: FxHashMap<ChunkId, Slot>,
}

impl ChunkRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The observed state of a chunk.
    pub fn state(&self, id: &ChunkId) -> ChunkState {
        match self.slots.get(id) {
            None => ChunkState::Unloaded,
            Some(Slot::Pending(_)) => ChunkState::Pending,
            Some(Slot::Loaded) => ChunkState::Loaded,
        }
    }

    /// Whether a chunk has been confirmed loaded.
    pub fn is_loaded(&self, id: &ChunkId) -> bool {
        matches!(self.slots.get(id), Some(Slot::Loaded))
    }

    /// Register interest in a chunk.
    ///
    /// An unloaded chunk becomes pending with the waiter queued; a pending
    /// chunk queues the waiter behind earlier ones; a loaded chunk fires
    /// the waiter immediately.
    pub fn request(&mut self, id: &ChunkId, waiter: Waiter) {
        match self.slots.get_mut(id) {
            None => {
                self.slots.insert(id.clone(), Slot::Pending(vec![waiter]));
            }
            Some(Slot::Pending(waiters)) => waiters.push(waiter),
            Some(Slot::Loaded) => waiter(),
        }
    }

    /// Confirm a chunk as loaded and hand back its wake list.
    ///
    /// Idempotent: a chunk that is already loaded stays loaded and yields
    /// an empty wake list, so duplicate deliveries never re-fire waiters.
    pub fn mark_loaded(&mut self, id: &ChunkId) -> Vec<Waiter> {
        match self.slots.insert(id.clone(), Slot::Loaded) {
            Some(Slot::Pending(waiters)) => waiters,
            _ => Vec::new(),
        }
    }

    /// Number of chunks the registry has seen.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the registry has seen no chunks.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl fmt::Debug for ChunkRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_map();
        for (id, slot) in &self.slots {
            let state = match slot {
                Slot::Pending(waiters) => format!("pending({} waiting)", waiters.len()),
                Slot::Loaded => "loaded".to_string(),
            };
            dbg.entry(&id.as_str(), &state);
        }
        dbg.finish()
    }
}
