//! OpenAPI documents are recognized but not mapped into the catalog yet.
//! Import only lists the paths it would handle; cleanup is a no-op.

use crate::document::type_name;
use anyhow::{Result, bail};
use serde_json::{Map, Value};
use tracing::{info, warn};

/// One path of an OpenAPI document and the operation keys under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSummary {
    pub path: String,
    pub operations: Vec<String>,
}

/// List the document's paths. Nothing is written to the catalog.
pub fn import_openapi(document: &Map<String, Value>) -> Result<Vec<PathSummary>> {
    let Some(Value::Object(paths)) = document.get("paths") else {
        bail!("paths are not defined in the OpenAPI document");
    };
    let mut summaries = Vec::with_capacity(paths.len());
    for (path, item) in paths {
        let operations: Vec<String> = match item {
            Value::Object(ops) => ops.keys().cloned().collect(),
            other => {
                warn!(path = %path, found = type_name(other), "path item is not an object");
                Vec::new()
            }
        };
        info!(path = %path, operations = %operations.join(" "), "import path");
        summaries.push(PathSummary {
            path: path.clone(),
            operations,
        });
    }
    Ok(summaries)
}

pub fn clean_openapi(_document: &Map<String, Value>) {
    warn!("cleanup of OpenAPI documents is not implemented");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lists_paths_and_operations() {
        let Value::Object(document) = json!({
            "openapi": "3.0.0",
            "paths": {
                "/pets": {"get": {}, "post": {}},
                "/pets/{id}": {"delete": {}}
            }
        }) else {
            unreachable!()
        };
        let paths = import_openapi(&document).unwrap();
        assert_eq!(
            paths,
            vec![
                PathSummary {
                    path: "/pets".to_string(),
                    operations: vec!["get".to_string(), "post".to_string()],
                },
                PathSummary {
                    path: "/pets/{id}".to_string(),
                    operations: vec!["delete".to_string()],
                },
            ]
        );
    }

    #[test]
    fn missing_paths_is_an_error() {
        let Value::Object(document) = json!({"openapi": "3.0.0"}) else {
            unreachable!()
        };
        let err = import_openapi(&document).unwrap_err();
        assert!(err.to_string().contains("paths are not defined"));
    }
}
