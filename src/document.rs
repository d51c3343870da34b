//! Document boundary: decoding input files, encoding output, and the small
//! pointer helpers the walkers share.
//!
//! Documents are decoded once into `serde_json::Value`, which is the tagged
//! variant the walkers match on. Object keys iterate in lexicographic order,
//! so walks (and therefore catalog ids) are deterministic.

use crate::catalog::COMPONENTS_PREFIX;
use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

/// Output encodings supported by export.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DocumentFormat {
    #[default]
    Json,
    #[value(alias = "yml")]
    Yaml,
}

impl DocumentFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Json => "json",
            DocumentFormat::Yaml => "yaml",
        }
    }
}

/// Which API description language a decoded document uses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpecKind {
    AsyncApi(String),
    OpenApi(String),
    Unknown,
}

impl SpecKind {
    pub fn detect(document: &Map<String, Value>) -> Self {
        if let Some(version) = document.get("asyncapi") {
            return SpecKind::AsyncApi(scalar_text(version));
        }
        if let Some(version) = document.get("openapi") {
            return SpecKind::OpenApi(scalar_text(version));
        }
        SpecKind::Unknown
    }
}

impl fmt::Display for SpecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecKind::AsyncApi(version) => write!(f, "asyncapi {version}"),
            SpecKind::OpenApi(version) => write!(f, "openapi {version}"),
            SpecKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Decode a document as JSON, falling back to YAML. The top level must be an
/// object.
pub fn decode_document(data: &[u8]) -> Result<Map<String, Value>> {
    let value: Value = match serde_json::from_slice(data) {
        Ok(value) => value,
        Err(_) => serde_yaml::from_slice(data).context("Document is neither valid JSON nor YAML")?,
    };
    match value {
        Value::Object(map) => Ok(map),
        other => bail!("Document root must be an object, got {}", type_name(&other)),
    }
}

/// Encode a document as pretty JSON (four-space indent) or YAML.
pub fn encode_document(document: &Value, format: DocumentFormat) -> Result<Vec<u8>> {
    match format {
        DocumentFormat::Json => {
            let mut out = Vec::new();
            let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
            let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
            document
                .serialize(&mut serializer)
                .context("Failed to encode document as JSON")?;
            out.push(b'\n');
            Ok(out)
        }
        DocumentFormat::Yaml => serde_yaml::to_string(document)
            .map(String::into_bytes)
            .context("Failed to encode document as YAML"),
    }
}

/// Default root entity name for an input file: its file name up to the first
/// `.` (`slack_events_api.v2.json` becomes `slack_events_api`).
pub fn root_name_from_path(path: &Path) -> Result<String> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("Invalid input file name: {}", path.display()))?;
    let stem = file_name.split('.').next().unwrap_or_default();
    if stem.is_empty() {
        bail!(
            "Cannot derive a root name from {}; pass --root",
            path.display()
        );
    }
    Ok(stem.to_string())
}

/// Look up a `#/a/b` pointer inside a document.
pub fn resolve_pointer<'a>(document: &'a Value, reference: &str) -> Option<&'a Value> {
    let pointer = reference.strip_prefix('#')?;
    if pointer.is_empty() {
        return Some(document);
    }
    document.pointer(pointer).filter(|value| !value.is_null())
}

/// The `$ref` string of a node, when it has one.
pub fn ref_path(node: &Value) -> Option<&str> {
    node.as_object()?.get("$ref")?.as_str()
}

/// The `$ref` string of a node when it points into `#/components/`.
pub fn component_ref(node: &Value) -> Option<&str> {
    ref_path(node).filter(|path| path.starts_with(COMPONENTS_PREFIX))
}

/// Short JSON type name for diagnostics.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn decodes_json_and_yaml() {
        let json_doc = decode_document(br#"{"asyncapi":"2.0.0","info":{"version":"1.0.0"}}"#).unwrap();
        assert_eq!(SpecKind::detect(&json_doc), SpecKind::AsyncApi("2.0.0".to_string()));

        let yaml_doc = decode_document(b"openapi: 3.0.1\npaths:\n  /pets: {}\n").unwrap();
        assert_eq!(SpecKind::detect(&yaml_doc), SpecKind::OpenApi("3.0.1".to_string()));
        assert!(yaml_doc["paths"].is_object());

        assert_eq!(SpecKind::detect(&Map::new()), SpecKind::Unknown);
    }

    #[test]
    fn rejects_non_object_documents() {
        let err = decode_document(b"[1, 2, 3]").unwrap_err();
        assert!(err.to_string().contains("must be an object"));
        assert!(decode_document(b"{ not: [valid").is_err());
    }

    #[test]
    fn encodes_with_four_space_indent() {
        let encoded = encode_document(&json!({"a": {"b": 1}}), DocumentFormat::Json).unwrap();
        assert_eq!(
            String::from_utf8(encoded).unwrap(),
            "{\n    \"a\": {\n        \"b\": 1\n    }\n}\n"
        );
        let yaml = encode_document(&json!({"a": [1]}), DocumentFormat::Yaml).unwrap();
        let back: Value = serde_yaml::from_slice(&yaml).unwrap();
        assert_eq!(back, json!({"a": [1]}));
    }

    #[test]
    fn derives_root_names_from_file_names() {
        assert_eq!(
            root_name_from_path(&PathBuf::from("test-data/slack_events_api.json")).unwrap(),
            "slack_events_api"
        );
        assert_eq!(
            root_name_from_path(&PathBuf::from("streetlights.v2.yaml")).unwrap(),
            "streetlights"
        );
        assert!(root_name_from_path(&PathBuf::from(".hidden")).is_err());
    }

    #[test]
    fn resolves_pointers_and_refs() {
        let doc = json!({
            "components": {"schemas": {"Foo": {"type": "string"}, "a/b": {"type": "integer"}}},
            "channels": {"x": {"$ref": "#/components/channels/x"}}
        });
        assert_eq!(
            resolve_pointer(&doc, "#/components/schemas/Foo"),
            Some(&json!({"type": "string"}))
        );
        assert_eq!(
            resolve_pointer(&doc, "#/components/schemas/a~1b"),
            Some(&json!({"type": "integer"}))
        );
        assert_eq!(resolve_pointer(&doc, "#/components/schemas/Bar"), None);
        assert_eq!(resolve_pointer(&doc, "other.yaml#/x"), None);

        assert_eq!(
            component_ref(&doc["channels"]["x"]),
            Some("#/components/channels/x")
        );
        assert_eq!(component_ref(&json!({"$ref": "#/definitions/x"})), None);
        assert_eq!(ref_path(&json!({"$ref": "#/definitions/x"})), Some("#/definitions/x"));
        assert_eq!(ref_path(&json!("plain")), None);
    }

    #[test]
    fn parses_formats() {
        use clap::ValueEnum;
        assert_eq!(DocumentFormat::from_str("yml", true).unwrap(), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_str("JSON", true).unwrap(), DocumentFormat::Json);
        assert_eq!(DocumentFormat::Json.extension(), "json");
        assert!(DocumentFormat::from_str("xml", true).is_err());
    }
}
