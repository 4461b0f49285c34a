//! The runtime context.
//!
//! One `Runtime` owns the module table, the instantiation cache, the chunk
//! registry, and the deferred execution queue. Everything is driven through
//! two entry points: `on_delivery`, the single ingress for chunk payloads,
//! and `require`, the instantiation path module bodies call back into.
//!
//! Execution is single-threaded, synchronous, and re-entrant: a module body
//! running under `require` may itself require further modules or hand the
//! runtime another delivery. Correctness of nested instantiation relies on
//! the cache inserting the in-progress record before the body runs, not on
//! any lock.

use std::rc::Rc;

use crate::chunk::{ChunkId, ChunkRegistry, ChunkState};
use crate::deferred::{DeferredEntry, DeferredQueue};
use crate::error::LinkError;
use crate::interop;
use crate::module::{CacheStats, ModuleBody, ModuleCache, ModuleId, ModuleRecord, ModuleTable};
use crate::value::{ObjectKind, Value};

/// An atomic delivery: chunk ids now satisfied, module bodies arriving with
/// them, and entry points that become runnable.
#[derive(Clone, Default)]
pub struct Delivery {
    chunks: Vec<ChunkId>,
    modules: Vec<(ModuleId, ModuleBody)>,
    entries: Vec<DeferredEntry>,
}

impl Delivery {
    /// Create an empty delivery.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a chunk as satisfied by this delivery.
    pub fn chunk(mut self, id: impl Into<ChunkId>) -> Self {
        self.chunks.push(id.into());
        self
    }

    /// Attach a module body to this delivery.
    pub fn module<F>(mut self, id: impl Into<ModuleId>, body: F) -> Self
    where
        F: Fn(&ModuleRecord, &mut Runtime) -> Result<(), LinkError> + 'static,
    {
        self.modules.push((id.into(), Rc::new(body)));
        self
    }

    /// Attach an already-built body handle, e.g. one held in a
    /// [`BodyMap`](crate::module::BodyMap).
    pub fn module_body(mut self, id: impl Into<ModuleId>, body: ModuleBody) -> Self {
        self.modules.push((id.into(), body));
        self
    }

    /// Declare an entry point that becomes runnable with this delivery.
    pub fn entry(mut self, entry: DeferredEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Chunk ids satisfied by this delivery.
    pub fn chunks(&self) -> &[ChunkId] {
        &self.chunks
    }

    /// Ids of the module bodies arriving with this delivery.
    pub fn module_ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.modules.iter().map(|(id, _)| id)
    }

    /// Entries declared runnable by this delivery.
    pub fn entries(&self) -> &[DeferredEntry] {
        &self.entries
    }

    pub(crate) fn from_parts(
        chunks: Vec<ChunkId>,
        modules: Vec<(ModuleId, ModuleBody)>,
        entries: Vec<DeferredEntry>,
    ) -> Self {
        Self {
            chunks,
            modules,
            entries,
        }
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("chunks", &self.chunks)
            .field("modules", &self.module_ids().collect::<Vec<_>>())
            .field("entries", &self.entries)
            .finish()
    }
}

/// The module-linking runtime.
///
/// Explicit context object: all state lives here, so independent runtimes
/// can coexist in one process (and in tests).
#[derive(Default)]
pub struct Runtime {
    table: ModuleTable,
    cache: ModuleCache,
    chunks: ChunkRegistry,
    deferred: DeferredQueue,
    entry_module: Option<ModuleId>,
    main_output: Option<Value>,
    observer: Option<Box<dyn Fn(&Delivery)>>,
}

impl Runtime {
    /// Create an empty runtime.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a module by id, instantiating it if necessary.
    ///
    /// A body runs exactly once per process; later calls return the cached
    /// export value. Requiring a module whose body is currently executing
    /// returns its partially-populated container, which is what terminates
    /// circular dependencies.
    ///
    /// Requesting an id absent from the table is a fatal bookkeeping error.
    pub fn require(&mut self, id: &ModuleId) -> Result<Value, LinkError> {
        if let Some(record) = self.cache.lookup(id) {
            return Ok(record.exports());
        }
        let body = self
            .table
            .get(id)
            .ok_or_else(|| LinkError::ModuleNotFound(id.clone()))?;
        let record = self.cache.begin(id.clone());
        body(&record, self)?;
        record.finish();
        Ok(record.exports())
    }

    /// Flip a module's export container to the namespace convention.
    ///
    /// No-op when the body already replaced its exports with a non-object.
    pub fn mark_module(&self, record: &ModuleRecord) {
        if let Value::Object(obj) = record.exports() {
            obj.set_kind(ObjectKind::Module);
        }
    }

    /// Normalize a value into a namespace object according to the
    /// [`interop`] mode flags.
    pub fn to_namespace(&mut self, value: Value, flags: u8) -> Result<Value, LinkError> {
        let value = if flags & interop::RESOLVE_ID != 0 {
            let id = match &value {
                Value::Str(s) => ModuleId::from(s.as_str()),
                other => return Err(LinkError::NotAModuleId(other.type_name().to_string())),
            };
            self.require(&id)?
        } else {
            value
        };
        if flags & interop::RAW != 0 {
            return Ok(value);
        }
        if flags & interop::PASSTHROUGH != 0 {
            if let Value::Object(obj) = &value {
                if obj.kind() == ObjectKind::Module {
                    return Ok(value);
                }
            }
        }
        interop::synthesize(&value, flags & interop::MERGE != 0)
    }

    /// Uniform default accessor over both export conventions.
    pub fn default_export(&self, value: &Value) -> Value {
        interop::default_export(value)
    }

    /// Register interest in a chunk; the waiter fires once when the chunk
    /// loads, or immediately if it already has.
    pub fn request_chunk(&mut self, chunk: &ChunkId, waiter: impl FnOnce() + 'static) {
        self.chunks.request(chunk, Box::new(waiter));
    }

    /// Observed state of a chunk.
    pub fn chunk_state(&self, chunk: &ChunkId) -> ChunkState {
        self.chunks.state(chunk)
    }

    /// Install a hook invoked once per delivery, after the module merge and
    /// before waiters fire. Mirrors forwarding deliveries to an enclosing
    /// runtime.
    pub fn set_delivery_observer(&mut self, observer: impl Fn(&Delivery) + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// The single ingress point for chunk payloads.
    ///
    /// Applies the delivery as one uninterruptible step: flips chunk
    /// states (collecting wake lists), merges module bodies (last write
    /// wins), fires the collected waiters in delivery order, queues the
    /// delivery's entries, and drains.
    pub fn on_delivery(&mut self, delivery: Delivery) -> Result<Option<Value>, LinkError> {
        let mut waiters = Vec::new();
        for chunk in &delivery.chunks {
            waiters.extend(self.chunks.mark_loaded(chunk));
        }
        self.table.merge(delivery.modules.iter().cloned());
        if let Some(observer) = &self.observer {
            observer(&delivery);
        }
        for waiter in waiters {
            waiter();
        }
        self.deferred.extend(delivery.entries);
        self.drain()
    }

    /// Run every queued entry whose chunk dependencies are all loaded.
    ///
    /// The scan is bounded by the queue length observed on entry; entries
    /// appended while an entry executes wait for the next drain. Returns
    /// the export value of the last entry executed, or the previous result
    /// when nothing ran this scan.
    pub fn drain(&mut self) -> Result<Option<Value>, LinkError> {
        let mut budget = self.deferred.len();
        let mut index = 0;
        while budget > 0 && index < self.deferred.len() {
            budget -= 1;
            if self.deferred.entry(index).is_ready(&self.chunks) {
                let entry = self.deferred.remove(index);
                self.entry_module = Some(entry.module.clone());
                let exports = self.require(&entry.module)?;
                self.main_output = Some(exports);
            } else {
                index += 1;
            }
        }
        Ok(self.main_output.clone())
    }

    /// Id of the most recently executed entry module.
    pub fn entry_module(&self) -> Option<&ModuleId> {
        self.entry_module.as_ref()
    }

    /// Number of entries still blocked in the deferred queue.
    pub fn pending_entries(&self) -> usize {
        self.deferred.len()
    }

    /// Whether a body is registered for `id`.
    pub fn has_module(&self, id: &ModuleId) -> bool {
        self.table.contains(id)
    }

    /// Number of bodies in the module table.
    pub fn module_count(&self) -> usize {
        self.table.len()
    }

    /// Whether a module has a cache record (loaded or in progress).
    pub fn is_instantiated(&self, id: &ModuleId) -> bool {
        self.cache.contains(id)
    }

    /// Instantiation-cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// Startup replay for deliveries that raced runtime initialization.
///
/// Deliveries staged before launch go through the normal delivery path, in
/// order; afterwards the build pipeline's initial entries are queued and
/// drained once.
#[derive(Default)]
pub struct Bootstrap {
    staged: Vec<Delivery>,
}

impl Bootstrap {
    /// Create an empty bootstrap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a delivery made before the runtime existed.
    pub fn stage(mut self, delivery: Delivery) -> Self {
        self.staged.push(delivery);
        self
    }

    /// Replay staged deliveries, queue the initial entries, and drain.
    ///
    /// Returns the live runtime together with the drain result.
    pub fn launch(
        self,
        entries: impl IntoIterator<Item = DeferredEntry>,
    ) -> Result<(Runtime, Option<Value>), LinkError> {
        let mut runtime = Runtime::new();
        for delivery in self.staged {
            runtime.on_delivery(delivery)?;
        }
        runtime.deferred.extend(entries);
        let output = runtime.drain()?;
        Ok((runtime, output))
    }
}
