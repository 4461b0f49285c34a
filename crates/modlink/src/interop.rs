//! Namespace interop: reconciling default-export and legacy modules.
//!
//! Two export conventions flow through the runtime. Default-export modules
//! mark their container as a namespace and publish under named keys, with
//! `default` carrying the main export. Legacy modules replace the whole
//! export value. The operations here let consumers treat both identically.

use std::rc::Rc;

use crate::error::LinkError;
use crate::value::{Object, ObjectKind, Value};

/// Treat the incoming value as a module id and resolve it through the
/// cache first.
pub const RESOLVE_ID: u8 = 0b0001;

/// Copy the enumerable own keys of the value onto the namespace, each
/// captured by value at synthesis time.
pub const MERGE: u8 = 0b0010;

/// Pass a value that is already a normalized namespace through unchanged.
pub const PASSTHROUGH: u8 = 0b0100;

/// Short-circuit and return the resolved value itself, skipping namespace
/// synthesis.
pub const RAW: u8 = 0b1000;

/// Synthesize a namespace around `value`.
///
/// The namespace always carries `default`; with `merge` set, the own keys
/// of an object value are copied next to it. Strings are never
/// key-enumerated. The result is sealed: no key is ever added afterwards,
/// and later mutation of the source does not show through.
pub(crate) fn synthesize(value: &Value, merge: bool) -> Result<Value, LinkError> {
    let ns = Object::with_kind(ObjectKind::Module);
    ns.define("default", value.clone())?;
    if merge {
        if let Value::Object(src) = value {
            for key in src.keys() {
                if src.has_own(&key) {
                    let captured = src.get(&key).unwrap_or(Value::Undefined);
                    ns.define(&key, captured)?;
                }
            }
        }
    }
    ns.seal();
    Ok(Value::Object(Rc::new(ns)))
}

/// Normalize the default-vs-whole-module ambiguity.
///
/// A namespace yields its `default` property; any other export value is
/// itself the default. Lets consumers written against either convention
/// read one uniform accessor.
pub fn default_export(value: &Value) -> Value {
    match value {
        Value::Object(obj) if obj.kind() == ObjectKind::Module => {
            obj.get("default").unwrap_or(Value::Undefined)
        }
        other => other.clone(),
    }
}
