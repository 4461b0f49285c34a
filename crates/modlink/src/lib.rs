//! Modlink: a chunked module-loading runtime.
//!
//! Modlink lazily links a flat table of independently compiled module
//! bodies, resolves inter-module dependencies by opaque id, and defers
//! entry-point execution until every chunk an entry waits on has been
//! delivered. Two module-interop conventions (default-export style and
//! legacy whole-value style) are reconciled through a uniform namespace
//! object.
//!
//! The runtime does not transform sources, resolve paths, or fetch chunks;
//! a delivery mechanism pushes payloads in through
//! [`Runtime::on_delivery`], and deliveries that raced startup replay
//! through [`Bootstrap`].
//!
//! # Example
//!
//! ```rust,ignore
//! use modlink::{Bootstrap, DeferredEntry, Delivery, Value};
//!
//! let boot = Bootstrap::new().stage(
//!     Delivery::new()
//!         .chunk("main")
//!         .module("greeting", |record, _rt| {
//!             record.export("text", "hello")
//!         })
//!         .module("app", |record, rt| {
//!             let greeting = rt.require(&"greeting".into())?;
//!             record.replace_exports(greeting)
//!         }),
//! );
//! let (runtime, output) = boot.launch([DeferredEntry::new("app")])?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod chunk;
pub mod deferred;
pub mod error;
pub mod interop;
pub mod manifest;
pub mod module;
pub mod runtime;
pub mod value;

pub use chunk::{ChunkId, ChunkRegistry, ChunkState, Waiter};
pub use deferred::DeferredEntry;
pub use error::LinkError;
pub use interop::default_export;
pub use manifest::{ChunkManifest, EntryManifest, ManifestError};
pub use module::{
    BodyMap, CacheStats, ModuleBody, ModuleCache, ModuleId, ModuleRecord, ModuleTable,
};
pub use runtime::{Bootstrap, Delivery, Runtime};
pub use value::{Object, ObjectKind, Value};
