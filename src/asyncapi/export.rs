//! Export walker: entity graph back to an AsyncAPI document.
//!
//! Mirrors the import walker using the same construct layouts. Children are
//! read in id order, which is creation order, so arrays come back in their
//! original order.

use super::{ComponentCategory, Construct, Field, Layout, field_for, find_root};
use crate::catalog::{BasicType, CatalogStore, Entity, TypeRecord};
use crate::registry::TypeRegistry;
use crate::side_channel;
use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Rebuild the document stored under the root entity named `root`.
pub fn export_document<S: CatalogStore + ?Sized>(store: &S, root: &str) -> Result<Value> {
    let root_entity = find_root(store, root)
        .with_context(|| format!("Failed to look up root entity '{root}'"))?
        .with_context(|| format!("No root entity named '{root}' in the catalog"))?;
    let mut exporter = Exporter {
        store,
        registry: TypeRegistry::new(),
        visited: 0,
    };
    let document = exporter.export(Construct::Document, &root_entity, false)?;
    info!(root, entities = exporter.visited, "exported document");
    Ok(document)
}

struct Exporter<'s, S: CatalogStore + ?Sized> {
    store: &'s S,
    registry: TypeRegistry,
    visited: usize,
}

impl<S: CatalogStore + ?Sized> Exporter<'_, S> {
    /// Export one entity as `construct`. `definition` is true only for the
    /// members of a components category, which are expanded even though they
    /// carry a component record.
    fn export(&mut self, construct: Construct, entity: &Entity, definition: bool) -> Result<Value> {
        self.visited += 1;
        let record = self.record(entity)?;
        if let Some(record) = record.as_ref().filter(|r| r.is_component()) {
            if !definition {
                return Ok(reference(&record.name));
            }
        }

        let layout = construct.layout();
        let structured = matches!(
            layout,
            Layout::Object { .. } | Layout::Map { .. } | Layout::List { .. }
        );
        if structured {
            if let Some(value) = verbatim(entity) {
                return Ok(value);
            }
        }

        match layout {
            Layout::Object { described, fields } => {
                self.object(construct, entity, record.as_ref(), described, fields)
            }
            Layout::Map { member } => {
                let members_are_definitions = matches!(construct, Construct::Category(_));
                let mut map = Map::new();
                for child in self.children(entity)? {
                    let value = self.export(member, &child, members_are_definitions)?;
                    map.insert(child.name, value);
                }
                Ok(Value::Object(map))
            }
            Layout::List { item, item_label } => {
                let mut items = Vec::new();
                for child in self.children(entity)? {
                    if child.label != item_label {
                        warn!(parent = %entity.name, label = %child.label, expected = item_label, "unexpected list item; skipping");
                        continue;
                    }
                    items.push(self.export(item, &child, false)?);
                }
                Ok(Value::Array(items))
            }
            Layout::Simple => {
                let is_string = record
                    .as_ref()
                    .is_some_and(|r| r.name == BasicType::String.as_str());
                if is_string {
                    Ok(Value::String(entity.side_channel.clone()))
                } else {
                    Ok(decoded_or_text(&entity.side_channel))
                }
            }
            Layout::Opaque => Ok(decoded_or_text(&entity.side_channel)),
            Layout::Scope => Ok(side_channel::decode_value(&entity.side_channel)
                .unwrap_or_else(|| Value::String(entity.description.clone()))),
            Layout::RequiredScope => Ok(side_channel::decode_value(&entity.side_channel)
                .unwrap_or_else(|| Value::String(entity.name.clone()))),
        }
    }

    fn object(
        &mut self,
        construct: Construct,
        entity: &Entity,
        record: Option<&TypeRecord>,
        described: bool,
        fields: &'static [Field],
    ) -> Result<Value> {
        let mut map = side_channel::decode(&entity.side_channel);
        if described {
            if let Some(description) = entity.description() {
                map.insert("description".to_string(), Value::String(description.to_string()));
            }
        }
        match construct {
            Construct::Schema => {
                if let Some(record) = record.filter(|r| !r.is_component()) {
                    map.insert("type".to_string(), Value::String(record.name.clone()));
                }
            }
            Construct::Tag => {
                if entity.kind.is_property() && !map.contains_key("name") {
                    map.insert("name".to_string(), Value::String(entity.name.clone()));
                }
            }
            _ => {}
        }

        let mut properties = Map::new();
        for child in self.children(entity)? {
            if construct == Construct::Schema && child.kind.is_property() {
                let value = self.export(Construct::Schema, &child, false)?;
                properties.insert(child.name, value);
                continue;
            }
            let child_construct = match construct {
                Construct::Components => {
                    ComponentCategory::from_key(&child.label).map(Construct::Category)
                }
                _ => field_for(fields, &child.label).map(|field| field.construct),
            };
            let Some(child_construct) = child_construct else {
                warn!(parent = %entity.name, label = %child.label, "unrecognized child label; skipping");
                continue;
            };
            let value = self.export(child_construct, &child, false)?;
            map.insert(child.label, value);
        }
        if !properties.is_empty() {
            map.insert("properties".to_string(), Value::Object(properties));
        }
        Ok(Value::Object(map))
    }

    fn children(&self, entity: &Entity) -> Result<Vec<Entity>> {
        let Some(id) = entity.id else {
            bail!("Entity '{}' has no id", entity.name);
        };
        let mut children = self
            .store
            .find_children(id)
            .with_context(|| format!("Failed to list children of '{}'", entity.name))?;
        children.sort_by_key(|child| child.id);
        debug!(parent = %entity.name, count = children.len(), "read children");
        Ok(children)
    }

    fn record(&mut self, entity: &Entity) -> Result<Option<TypeRecord>> {
        let Some(type_ref) = entity.type_ref else {
            return Ok(None);
        };
        let record = self
            .registry
            .record(self.store, type_ref)
            .with_context(|| format!("Failed to read type record {type_ref} of '{}'", entity.name))?;
        Ok(Some(record.clone()))
    }
}

fn reference(path: &str) -> Value {
    let mut map = Map::new();
    map.insert("$ref".to_string(), Value::String(path.to_string()));
    Value::Object(map)
}

/// The stored value of an entity imported with the wrong shape for its
/// construct. Regular side channels are empty or a JSON object.
fn verbatim(entity: &Entity) -> Option<Value> {
    side_channel::decode_value(&entity.side_channel).filter(|value| !value.is_object())
}

/// A JSON side channel, or the raw text when it does not parse.
fn decoded_or_text(side: &str) -> Value {
    side_channel::decode_value(side).unwrap_or_else(|| Value::String(side.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asyncapi::import_document;
    use crate::catalog::MemoryCatalog;
    use serde_json::json;

    fn round_trip(value: Value) -> Value {
        let Value::Object(document) = value else {
            panic!("fixture must be an object");
        };
        let mut store = MemoryCatalog::new();
        import_document(&mut store, "doc", &document).unwrap();
        export_document(&store, "doc").unwrap()
    }

    #[test]
    fn missing_root_is_an_error() {
        let store = MemoryCatalog::new();
        let err = export_document(&store, "absent").unwrap_err();
        assert!(err.to_string().contains("No root entity named 'absent'"));
    }

    #[test]
    fn scalars_keep_their_json_types() {
        let document = json!({"id": "urn:x", "asyncapi": "2.0.0", "info": {"version": 2, "x-flag": null}});
        assert_eq!(round_trip(document.clone()), document);
    }

    #[test]
    fn typed_channel_exports_as_ref_only() {
        let mut store = MemoryCatalog::new();
        let record = store.create_type_record("#/components/channels/X", true).unwrap();
        let root = store.create_entity(&Entity::labelled("doc", "document")).unwrap();
        let channels = store
            .create_entity(&Entity::element("channels").with_parent(root))
            .unwrap();
        let channel = store
            .create_entity(
                &Entity::element("x")
                    .with_parent(channels)
                    .with_type(Some(record))
                    .with_description(Some("ignored"))
                    .with_side_channel(r#"{"x-extra":1}"#.to_string()),
            )
            .unwrap();
        store
            .create_entity(&Entity::element("subscribe").with_parent(channel))
            .unwrap();

        let document = export_document(&store, "doc").unwrap();
        assert_eq!(
            document,
            json!({"channels": {"x": {"$ref": "#/components/channels/X"}}})
        );
    }

    #[test]
    fn unknown_labels_are_skipped() {
        let mut store = MemoryCatalog::new();
        let root = store.create_entity(&Entity::labelled("doc", "document")).unwrap();
        let info = store
            .create_entity(&Entity::element("info").with_parent(root))
            .unwrap();
        store
            .create_entity(&Entity::element("mystery").with_parent(info))
            .unwrap();
        store
            .create_entity(
                &Entity::element("version")
                    .with_parent(info)
                    .with_side_channel("1.0.0".to_string()),
            )
            .unwrap();
        assert_eq!(
            export_document(&store, "doc").unwrap(),
            json!({"info": {"version": "1.0.0"}})
        );
    }

    #[test]
    fn security_and_flows_round_trip() {
        let document = json!({
            "asyncapi": "2.0.0",
            "servers": {"prod": {
                "url": "mqtt://broker",
                "protocol": "mqtt",
                "security": [{"oauth": ["read", "write"]}, {"apiKey": []}]
            }},
            "components": {"securitySchemes": {
                "oauth": {"type": "oauth2", "description": "OAuth", "flows": {
                    "clientCredentials": {
                        "tokenUrl": "https://example.com/token",
                        "scopes": {"read": "Read access", "write": ""}
                    }
                }},
                "apiKey": {"type": "apiKey", "in": "user"}
            }}
        });
        assert_eq!(round_trip(document.clone()), document);
    }

    #[test]
    fn misshapen_values_round_trip() {
        let document = json!({
            "asyncapi": "2.0.0",
            "channels": {"a": "not an object", "b": {"publish": {"traits": {"not": "a list"}}}},
            "components": {
                "schemas": {"S": {"type": "object", "properties": {"any": true, "none": null, "b": {"type": "string"}}}},
                "messages": null,
                "parameters": {"p": 7}
            }
        });
        assert_eq!(round_trip(document.clone()), document);
    }

    #[test]
    fn unnamed_tags_gain_no_name() {
        let document = json!({
            "tags": [{"description": "no name"}, {"name": "0"}, {"name": "", "description": "empty"}]
        });
        assert_eq!(round_trip(document.clone()), document);
    }

    #[test]
    fn traits_and_tags_keep_order() {
        let document = json!({
            "channels": {"user/signedup": {"publish": {
                "operationId": "onSignup",
                "tags": [{"name": "z-last"}, {"name": "a-first", "description": "first"}],
                "traits": [{"$ref": "#/components/operationTraits/kafka"}, {"bindings": {"kafka": {"clientId": "x"}}}],
                "message": {"traits": [{"$ref": "#/components/messageTraits/common"}], "payload": {"type": "string"}}
            }}},
            "components": {
                "operationTraits": {"kafka": {"bindings": {"kafka": {"groupId": "g"}}}},
                "messageTraits": {"common": {"headers": {"type": "object", "properties": {"id": {"type": "integer"}}}}}
            }
        });
        assert_eq!(round_trip(document.clone()), document);
    }
}
