//! Integration tests for namespace interop across export conventions.

use modlink::interop::{MERGE, PASSTHROUGH, RAW, RESOLVE_ID};
use modlink::{Delivery, LinkError, ModuleId, ObjectKind, Runtime, Value};

fn runtime_with_fixtures() -> Runtime {
    let mut rt = Runtime::new();
    rt.on_delivery(
        Delivery::new()
            .chunk("fixtures")
            .module("harmony", |record, rt| {
                rt.mark_module(record);
                record.export("default", "harmony default")?;
                record.export("named", 5)
            })
            .module("legacy", |record, _rt| {
                record.replace_exports("legacy whole value")
            }),
    )
    .unwrap();
    rt
}

#[test]
fn test_passthrough_returns_namespace_reference_equal() {
    let mut rt = runtime_with_fixtures();
    let exports = rt.require(&ModuleId::from("harmony")).unwrap();

    let ns = rt
        .to_namespace(exports.clone(), PASSTHROUGH | MERGE)
        .unwrap();
    assert!(ns.ptr_eq(&exports));
}

#[test]
fn test_plain_string_merges_to_default_only() {
    let mut rt = Runtime::new();
    let ns = rt
        .to_namespace(Value::from("hello"), PASSTHROUGH | MERGE)
        .unwrap();

    let obj = ns.as_object().unwrap();
    assert_eq!(obj.kind(), ObjectKind::Module);
    assert_eq!(obj.get("default"), Some(Value::Str("hello".to_string())));
    assert_eq!(obj.len(), 1);
}

#[test]
fn test_resolve_id_flag_requires_through_the_cache() {
    let mut rt = runtime_with_fixtures();
    let ns = rt
        .to_namespace(Value::from("legacy"), RESOLVE_ID | MERGE)
        .unwrap();

    let obj = ns.as_object().unwrap();
    assert_eq!(
        obj.get("default"),
        Some(Value::Str("legacy whole value".to_string()))
    );
}

#[test]
fn test_raw_flag_short_circuits() {
    let mut rt = runtime_with_fixtures();
    let direct = rt.require(&ModuleId::from("harmony")).unwrap();
    let raw = rt
        .to_namespace(Value::from("harmony"), RESOLVE_ID | RAW)
        .unwrap();
    assert!(raw.ptr_eq(&direct));
}

#[test]
fn test_merge_copies_named_exports_of_plain_object() {
    let mut rt = Runtime::new();
    let src = Value::object();
    {
        let obj = src.as_object().unwrap();
        obj.set("a", Value::from(1)).unwrap();
        obj.set("b", Value::from(2)).unwrap();
    }

    let ns = rt.to_namespace(src.clone(), PASSTHROUGH | MERGE).unwrap();
    let obj = ns.as_object().unwrap();

    // A plain object is not a namespace, so it gets wrapped, not passed.
    assert!(!ns.ptr_eq(&src));
    assert_eq!(obj.get("default"), Some(src));
    assert_eq!(obj.get("a"), Some(Value::Number(1.0)));
    assert_eq!(obj.get("b"), Some(Value::Number(2.0)));
}

#[test]
fn test_synthesized_namespace_is_immutable() {
    let mut rt = Runtime::new();
    let ns = rt.to_namespace(Value::from(1), 0).unwrap();
    let obj = ns.as_object().unwrap();

    assert!(obj.is_sealed());
    assert!(matches!(
        obj.set("extra", Value::from(2)),
        Err(LinkError::Sealed(_))
    ));
}

#[test]
fn test_default_export_over_both_conventions() {
    let mut rt = runtime_with_fixtures();

    let harmony = rt.require(&ModuleId::from("harmony")).unwrap();
    assert_eq!(
        rt.default_export(&harmony),
        Value::Str("harmony default".to_string())
    );

    let legacy = rt.require(&ModuleId::from("legacy")).unwrap();
    assert_eq!(
        rt.default_export(&legacy),
        Value::Str("legacy whole value".to_string())
    );
}

#[test]
fn test_exports_container_seals_after_instantiation() {
    let mut rt = runtime_with_fixtures();
    let exports = rt.require(&ModuleId::from("harmony")).unwrap();
    let obj = exports.as_object().unwrap();

    assert!(obj.is_sealed());
    assert!(matches!(
        obj.set("late", Value::from(9)),
        Err(LinkError::Sealed(_))
    ));
    // Reads keep working.
    assert_eq!(obj.get("named"), Some(Value::Number(5.0)));
}
