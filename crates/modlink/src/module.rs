//! Module identity, bodies, the module table, and the instantiation cache.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::LinkError;
use crate::runtime::Runtime;
use crate::value::{Object, Value};

/// Process-unique module identifier. Opaque to the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(String);

impl ModuleId {
    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModuleId {
    fn from(s: &str) -> ModuleId {
        ModuleId(s.to_string())
    }
}

impl From<String> for ModuleId {
    fn from(s: String) -> ModuleId {
        ModuleId(s)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A compiled module body.
///
/// Invoked at most once per process, with the module's record (the mutable
/// export container) and the runtime handle used to request dependencies.
/// The body mutates the container in place and returns nothing.
pub type ModuleBody = Rc<dyn Fn(&ModuleRecord, &mut Runtime) -> Result<(), LinkError>>;

/// Native bodies registered ahead of a manifest-described delivery.
pub type BodyMap = FxHashMap<ModuleId, ModuleBody>;

/// A module's cache slot: identity, load state, and export value.
///
/// The record is inserted into the cache *before* its body executes, so a
/// module that transitively requires itself observes the current, possibly
/// partially-populated container instead of recursing forever.
pub struct ModuleRecord {
    id: ModuleId,
    loaded: Cell<bool>,
    container: Rc<Object>,
    exports: RefCell<Value>,
}

impl ModuleRecord {
    pub(crate) fn new(id: ModuleId) -> Self {
        let container = Rc::new(Object::new());
        Self {
            id,
            loaded: Cell::new(false),
            exports: RefCell::new(Value::Object(Rc::clone(&container))),
            container,
        }
    }

    /// The module's id.
    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    /// Whether the body has finished executing.
    pub fn is_loaded(&self) -> bool {
        self.loaded.get()
    }

    /// The current export value. For an object container this is a shared
    /// handle; mutations through the record remain visible to every holder.
    pub fn exports(&self) -> Value {
        self.exports.borrow().clone()
    }

    /// Add a named export to the container (default-export style).
    pub fn export(&self, key: &str, value: impl Into<Value>) -> Result<(), LinkError> {
        match &*self.exports.borrow() {
            Value::Object(obj) => obj.set(key, value.into()),
            _ => Err(LinkError::NotAContainer(self.id.clone())),
        }
    }

    /// Replace the whole export value (legacy style).
    ///
    /// Only permitted while the body is still executing.
    pub fn replace_exports(&self, value: impl Into<Value>) -> Result<(), LinkError> {
        if self.loaded.get() {
            return Err(LinkError::Frozen(self.id.clone()));
        }
        *self.exports.borrow_mut() = value.into();
        Ok(())
    }

    /// Seal the record's own container and mark the module loaded. Called
    /// by the runtime once the body returns.
    ///
    /// Only the container this record created is sealed. A body that
    /// replaced its exports with some other module's live container must
    /// not freeze that module mid-instantiation.
    pub(crate) fn finish(&self) {
        self.container.seal();
        self.loaded.set(true);
    }
}

impl fmt::Debug for ModuleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRecord")
            .field("id", &self.id)
            .field("loaded", &self.loaded.get())
            .field("exports", &*self.exports.borrow())
            .finish()
    }
}

/// Flat mapping from module id to body, merged progressively as chunks
/// arrive. Re-delivery of an id overwrites: last write wins.
#[derive(Default)]
pub struct ModuleTable {
    bodies: BodyMap,
}

impl ModuleTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single body.
    pub fn insert(&mut self, id: ModuleId, body: ModuleBody) {
        self.bodies.insert(id, body);
    }

    /// Merge a delivery's bodies into the table.
    pub fn merge(&mut self, modules: impl IntoIterator<Item = (ModuleId, ModuleBody)>) {
        for (id, body) in modules {
            self.bodies.insert(id, body);
        }
    }

    /// Look up a body, cloning its handle.
    pub fn get(&self, id: &ModuleId) -> Option<ModuleBody> {
        self.bodies.get(id).map(Rc::clone)
    }

    /// Whether a body is registered for `id`.
    pub fn contains(&self, id: &ModuleId) -> bool {
        self.bodies.contains_key(id)
    }

    /// Number of registered bodies.
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

impl fmt::Debug for ModuleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleTable")
            .field("modules", &self.bodies.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Process-scoped instantiation cache.
///
/// Memoizes module records so each body executes at most once regardless of
/// how many dependents request it. Records live for the whole process; the
/// cache never evicts.
#[derive(Debug, Default)]
pub struct ModuleCache {
    records: FxHashMap<ModuleId, Rc<ModuleRecord>>,
    hits: usize,
    misses: usize,
}

impl ModuleCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a record, counting the hit or miss.
    ///
    /// In-progress records count as hits; that is what makes circular
    /// requires terminate.
    pub fn lookup(&mut self, id: &ModuleId) -> Option<Rc<ModuleRecord>> {
        match self.records.get(id) {
            Some(record) => {
                self.hits += 1;
                Some(Rc::clone(record))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert a fresh in-progress record. Must happen before the body runs.
    pub(crate) fn begin(&mut self, id: ModuleId) -> Rc<ModuleRecord> {
        let record = Rc::new(ModuleRecord::new(id.clone()));
        self.records.insert(id, Rc::clone(&record));
        record
    }

    /// Whether a record exists for `id` (loaded or in progress).
    pub fn contains(&self, id: &ModuleId) -> bool {
        self.records.contains_key(id)
    }

    /// Number of cached records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.records.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    /// Number of cached records.
    pub entries: usize,
    /// Number of lookups that found a record.
    pub hits: usize,
    /// Number of lookups that found nothing.
    pub misses: usize,
}

impl CacheStats {
    /// Cache hit ratio (0.0 to 1.0).
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_body() -> ModuleBody {
        Rc::new(|_record, _rt| Ok(()))
    }

    #[test]
    fn test_record_export_and_finish() {
        let record = ModuleRecord::new(ModuleId::from("m"));
        record.export("answer", 42).unwrap();

        let exports = record.exports();
        let obj = exports.as_object().unwrap();
        assert_eq!(obj.get("answer"), Some(Value::Number(42.0)));
        assert!(!record.is_loaded());

        record.finish();
        assert!(record.is_loaded());
        assert!(obj.is_sealed());
        assert!(matches!(
            record.export("late", 1),
            Err(LinkError::Sealed(_))
        ));
    }

    #[test]
    fn test_record_replace_exports() {
        let record = ModuleRecord::new(ModuleId::from("legacy"));
        record.replace_exports("whole value").unwrap();
        assert_eq!(record.exports(), Value::Str("whole value".to_string()));

        record.finish();
        assert!(matches!(
            record.replace_exports("again"),
            Err(LinkError::Frozen(_))
        ));
    }

    #[test]
    fn test_export_onto_replaced_value_fails() {
        let record = ModuleRecord::new(ModuleId::from("legacy"));
        record.replace_exports("not an object").unwrap();
        assert!(matches!(
            record.export("key", 1),
            Err(LinkError::NotAContainer(_))
        ));
    }

    #[test]
    fn test_table_last_write_wins() {
        let mut table = ModuleTable::new();
        let id = ModuleId::from("m");
        let first = noop_body();
        let second = noop_body();

        table.insert(id.clone(), Rc::clone(&first));
        table.merge(vec![(id.clone(), Rc::clone(&second))]);

        assert_eq!(table.len(), 1);
        let stored = table.get(&id).unwrap();
        assert!(Rc::ptr_eq(&stored, &second));
        assert!(!Rc::ptr_eq(&stored, &first));
    }

    #[test]
    fn test_cache_counts_hits_and_misses() {
        let mut cache = ModuleCache::new();
        let id = ModuleId::from("m");

        assert!(cache.lookup(&id).is_none());
        cache.begin(id.clone());
        assert!(cache.lookup(&id).is_some());
        assert!(cache.lookup(&id).is_some());

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_ratio() - 0.666).abs() < 0.01);
    }

    #[test]
    fn test_in_progress_record_is_a_hit() {
        let mut cache = ModuleCache::new();
        let id = ModuleId::from("cyclic");
        let record = cache.begin(id.clone());
        assert!(!record.is_loaded());

        let found = cache.lookup(&id).unwrap();
        assert!(Rc::ptr_eq(&found, &record));
    }
}
