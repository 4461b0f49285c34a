//! Dynamic values exchanged between module bodies.
//!
//! Export containers, namespace objects, and plain data share one `Value`
//! representation. Objects are reference values: cloning a `Value` clones
//! the handle, not the property map, so every consumer of a module sees the
//! same container.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::error::LinkError;

/// Discriminant separating plain objects from normalized module namespaces.
///
/// The runtime never inspects property shapes to decide whether a value is
/// a namespace; this tag is the only source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// An ordinary property bag.
    Plain,
    /// A normalized module namespace (default-export convention).
    Module,
}

/// A string-keyed property bag with interior mutability.
///
/// An `Object` lives in two phases. While the owning module body runs it is
/// the mutable export container; once the body returns the runtime seals it
/// and it becomes the frozen export value. Recursive access from a circular
/// dependency reads the current snapshot of the still-unsealed container.
///
/// Property order is insertion order.
pub struct Object {
    props: RefCell<Vec<(String, Value)>>,
    kind: Cell<ObjectKind>,
    sealed: Cell<bool>,
}

impl Object {
    /// Create an empty, unsealed plain object.
    pub fn new() -> Self {
        Self::with_kind(ObjectKind::Plain)
    }

    /// Create an empty, unsealed object of the given kind.
    pub fn with_kind(kind: ObjectKind) -> Self {
        Self {
            props: RefCell::new(Vec::new()),
            kind: Cell::new(kind),
            sealed: Cell::new(false),
        }
    }

    /// The object's discriminant.
    pub fn kind(&self) -> ObjectKind {
        self.kind.get()
    }

    pub(crate) fn set_kind(&self, kind: ObjectKind) {
        self.kind.set(kind);
    }

    /// Look up an own property, cloning its value handle.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.props
            .borrow()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Own-property check; inherited or ambient keys never exist here.
    pub fn has_own(&self, key: &str) -> bool {
        self.props.borrow().iter().any(|(k, _)| k == key)
    }

    /// Insert or overwrite a property. Fails once the object is sealed.
    pub fn set(&self, key: &str, value: Value) -> Result<(), LinkError> {
        if self.sealed.get() {
            return Err(LinkError::Sealed(key.to_string()));
        }
        let mut props = self.props.borrow_mut();
        match props.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = value,
            None => props.push((key.to_string(), value)),
        }
        Ok(())
    }

    /// Insert a property only if the key is absent.
    ///
    /// Returns `Ok(true)` when the property was added, `Ok(false)` when the
    /// key already existed.
    pub fn define(&self, key: &str, value: Value) -> Result<bool, LinkError> {
        if self.sealed.get() {
            return Err(LinkError::Sealed(key.to_string()));
        }
        if self.has_own(key) {
            return Ok(false);
        }
        self.props.borrow_mut().push((key.to_string(), value));
        Ok(true)
    }

    /// Own-property keys, in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.props.borrow().iter().map(|(k, _)| k.clone()).collect()
    }

    /// Number of own properties.
    pub fn len(&self) -> usize {
        self.props.borrow().len()
    }

    /// Whether the object has no properties.
    pub fn is_empty(&self) -> bool {
        self.props.borrow().is_empty()
    }

    /// Freeze the property map. Sealing is permanent.
    pub fn seal(&self) {
        self.sealed.set(true);
    }

    /// Whether the property map is frozen.
    pub fn is_sealed(&self) -> bool {
        self.sealed.get()
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let props = self.props.borrow();
        let mut dbg = f.debug_struct(match self.kind.get() {
            ObjectKind::Plain => "Object",
            ObjectKind::Module => "Namespace",
        });
        for (k, v) in props.iter() {
            dbg.field(k, v);
        }
        dbg.finish()
    }
}

/// A dynamic value produced or consumed by module bodies.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value.
    Undefined,
    /// Boolean.
    Bool(bool),
    /// Double-precision number.
    Number(f64),
    /// Owned string.
    Str(String),
    /// Shared object handle.
    Object(Rc<Object>),
}

impl Value {
    /// Create a fresh, empty plain object value.
    pub fn object() -> Value {
        Value::Object(Rc::new(Object::new()))
    }

    /// Borrow the object handle, if this value is an object.
    pub fn as_object(&self) -> Option<&Rc<Object>> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Borrow the string contents, if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this value is `Undefined`.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Identity comparison: true only for two handles to the same object.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Short name of the value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Object(_) => "object",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Number(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Value {
        Value::Number(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::Str(v)
    }
}

impl From<Rc<Object>> for Value {
    fn from(v: Rc<Object>) -> Value {
        Value::Object(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let obj = Object::new();
        obj.set("a", Value::from(1)).unwrap();
        obj.set("b", Value::from("two")).unwrap();

        assert_eq!(obj.get("a"), Some(Value::Number(1.0)));
        assert_eq!(obj.get("b"), Some(Value::Str("two".to_string())));
        assert_eq!(obj.get("c"), None);
        assert_eq!(obj.keys(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_set_overwrites() {
        let obj = Object::new();
        obj.set("a", Value::from(1)).unwrap();
        obj.set("a", Value::from(2)).unwrap();

        assert_eq!(obj.get("a"), Some(Value::Number(2.0)));
        assert_eq!(obj.len(), 1);
    }

    #[test]
    fn test_define_skips_existing() {
        let obj = Object::new();
        assert!(obj.define("a", Value::from(1)).unwrap());
        assert!(!obj.define("a", Value::from(2)).unwrap());
        assert_eq!(obj.get("a"), Some(Value::Number(1.0)));
    }

    #[test]
    fn test_sealed_rejects_writes() {
        let obj = Object::new();
        obj.set("a", Value::from(1)).unwrap();
        obj.seal();

        assert!(matches!(
            obj.set("b", Value::from(2)),
            Err(LinkError::Sealed(_))
        ));
        assert!(matches!(
            obj.define("b", Value::from(2)),
            Err(LinkError::Sealed(_))
        ));
        // Reads still work.
        assert_eq!(obj.get("a"), Some(Value::Number(1.0)));
    }

    #[test]
    fn test_object_identity() {
        let a = Value::object();
        let b = a.clone();
        let c = Value::object();

        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_clone_shares_properties() {
        let a = Value::object();
        let b = a.clone();

        a.as_object().unwrap().set("x", Value::from(9)).unwrap();
        assert_eq!(b.as_object().unwrap().get("x"), Some(Value::Number(9.0)));
    }
}
