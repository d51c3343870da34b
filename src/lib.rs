//! Shared library for the apicatalog tool.
//!
//! Maps AsyncAPI documents onto a metadata catalog's asset graph and back.
//! The walkers in [`asyncapi`] only depend on the [`CatalogStore`] trait, so
//! the same code runs against the remote catalog ([`HttpCatalog`]) and the
//! in-memory store used for dry runs and tests ([`MemoryCatalog`]).

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

pub mod asyncapi;
pub mod catalog;
pub mod config;
pub mod deref;
pub mod document;
pub mod openapi;
pub mod registry;
pub mod side_channel;

pub use asyncapi::{CleanupSummary, ImportSummary, clean_document, export_document, import_document};
pub use catalog::{
    AssetKind, BasicType, CatalogStore, Entity, EntityId, HttpCatalog, MemoryCatalog, StoreError,
    TypeId, TypeRecord,
};
pub use config::{CatalogConfig, CatalogEndpoint, Overrides};
pub use deref::expand_components;
pub use document::{DocumentFormat, SpecKind, decode_document, encode_document, root_name_from_path};
pub use openapi::{clean_openapi, import_openapi};
pub use registry::TypeRegistry;

/// Read and decode a JSON or YAML document from disk.
pub fn load_document(path: &Path) -> Result<Map<String, Value>> {
    let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    decode_document(&data).with_context(|| format!("Failed to decode {}", path.display()))
}

/// Encode `document` and write it to `path`.
pub fn write_document(path: &Path, document: &Value, format: DocumentFormat) -> Result<()> {
    let encoded = encode_document(document, format)?;
    fs::write(path, encoded).with_context(|| format!("Failed to write {}", path.display()))
}
