//! Inline `#/components/...` references.
//!
//! Used by `export --dereference` to produce a self-contained document.
//! Definitions are resolved against the document as it was before expansion
//! and cached per path. A reference met again while its own definition is
//! still being expanded is left as a `$ref`, which keeps mutually referencing
//! components finite.

use crate::catalog::COMPONENTS_PREFIX;
use crate::document::{ref_path, resolve_pointer};
use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Top-level sections whose references are expanded.
const SECTIONS: [&str; 3] = ["components", "channels", "servers"];

/// Replace every component `$ref` under `components`, `channels` and
/// `servers` with its definition. Returns the number of references replaced.
pub fn expand_components(document: &mut Map<String, Value>) -> Result<usize> {
    let mut expander = Expander {
        original: Value::Object(document.clone()),
        resolved: BTreeMap::new(),
        in_progress: BTreeSet::new(),
        replaced: 0,
    };
    for section in SECTIONS {
        let Some(value) = document.get(section) else {
            continue;
        };
        let expanded = expander
            .expand(value)
            .with_context(|| format!("Failed to dereference {section}"))?;
        document.insert(section.to_string(), expanded);
    }
    info!(references = expander.replaced, "expanded component references");
    Ok(expander.replaced)
}

struct Expander {
    original: Value,
    resolved: BTreeMap<String, Value>,
    in_progress: BTreeSet<String>,
    replaced: usize,
}

impl Expander {
    fn expand(&mut self, value: &Value) -> Result<Value> {
        if let Some(path) = ref_path(value) {
            return self.definition(path);
        }
        match value {
            Value::Object(map) => {
                let mut out = Map::new();
                for (key, entry) in map {
                    out.insert(key.clone(), self.expand(entry)?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.expand(item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    fn definition(&mut self, path: &str) -> Result<Value> {
        if !path.starts_with(COMPONENTS_PREFIX) {
            bail!("Cannot dereference {path}: only {COMPONENTS_PREFIX} references are supported");
        }
        if let Some(resolved) = self.resolved.get(path) {
            self.replaced += 1;
            return Ok(resolved.clone());
        }
        if self.in_progress.contains(path) {
            debug!(path, "circular reference; leaving $ref in place");
            let mut node = Map::new();
            node.insert("$ref".to_string(), Value::String(path.to_string()));
            return Ok(Value::Object(node));
        }
        let target = resolve_pointer(&self.original, path)
            .cloned()
            .with_context(|| format!("Unresolved reference {path}"))?;

        self.in_progress.insert(path.to_string());
        let expanded = self.expand(&target);
        self.in_progress.remove(path);
        let expanded = expanded?;

        self.resolved.insert(path.to_string(), expanded.clone());
        self.replaced += 1;
        Ok(expanded)
    }
}
