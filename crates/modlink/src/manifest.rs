//! Bundler-emitted chunk manifests.
//!
//! A manifest is the JSON side of a delivery: which chunks it satisfies,
//! which module ids arrive with it, and which entries become runnable.
//! Native bodies are registered separately (a [`BodyMap`]) and bound to the
//! declared ids in one atomic step; a manifest that cannot be fully bound
//! is rejected whole, nothing is applied.

use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chunk::ChunkId;
use crate::deferred::DeferredEntry;
use crate::module::{BodyMap, ModuleId};
use crate::runtime::Delivery;

/// Errors raised at the manifest boundary.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The manifest is not valid JSON or is missing required fields.
    #[error("malformed manifest: {0}")]
    Parse(#[from] serde_json::Error),

    /// A declared module id has no registered body.
    #[error("manifest declares module {0} but no body is registered")]
    MissingBody(ModuleId),
}

/// One deferred entry as declared by the bundler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntryManifest {
    /// Entry-point module id.
    pub module: String,
    /// Chunk ids the entry waits on.
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// A delivery described without its native bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChunkManifest {
    /// Chunk ids satisfied by the delivery.
    pub chunks: Vec<String>,
    /// Module ids whose bodies arrive with the delivery.
    pub modules: Vec<String>,
    /// Entries that become runnable.
    #[serde(default)]
    pub entries: Vec<EntryManifest>,
}

impl ChunkManifest {
    /// Parse a manifest from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a manifest file.
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Bind the declared module ids to registered bodies, producing a
    /// delivery ready for [`Runtime::on_delivery`].
    ///
    /// Every declared id is resolved before anything is built, so a
    /// missing body rejects the whole manifest.
    ///
    /// [`Runtime::on_delivery`]: crate::runtime::Runtime::on_delivery
    pub fn into_delivery(self, bodies: &BodyMap) -> Result<Delivery, ManifestError> {
        let mut bound = Vec::with_capacity(self.modules.len());
        for name in &self.modules {
            let id = ModuleId::from(name.as_str());
            match bodies.get(&id) {
                Some(body) => bound.push((id, Rc::clone(body))),
                None => return Err(ManifestError::MissingBody(id)),
            }
        }

        let chunks = self.chunks.into_iter().map(ChunkId::from).collect();
        let entries = self
            .entries
            .into_iter()
            .map(|e| DeferredEntry {
                module: ModuleId::from(e.module),
                depends_on: e.depends_on.into_iter().map(ChunkId::from).collect(),
            })
            .collect();

        Ok(Delivery::from_parts(chunks, bound, entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let manifest = ChunkManifest::from_json(
            r#"{
                "chunks": ["font"],
                "modules": ["./src/js/font.js"],
                "entries": [
                    { "module": "./src/js/font.js", "depends_on": ["vendors"] }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.chunks, vec!["font"]);
        assert_eq!(manifest.modules, vec!["./src/js/font.js"]);
        assert_eq!(manifest.entries[0].depends_on, vec!["vendors"]);
    }

    #[test]
    fn test_entries_default_to_empty() {
        let manifest =
            ChunkManifest::from_json(r#"{ "chunks": ["a"], "modules": [] }"#).unwrap();
        assert!(manifest.entries.is_empty());
    }

    #[test]
    fn test_missing_field_rejected() {
        let err = ChunkManifest::from_json(r#"{ "chunks": ["a"] }"#).unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ChunkManifest::from_json(
            r#"{ "chunks": [], "modules": [], "extra": true }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
    }
}
