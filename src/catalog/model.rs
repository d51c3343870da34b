//! Entities and type records as the walkers see them.
//!
//! These are store-neutral: the HTTP client maps them onto the catalog wire
//! format and the in-memory store keeps them as-is. Builders consume `self` so
//! walkers can assemble an entity in one expression before handing it to the
//! store.

use crate::catalog::identity::{AssetKind, EntityId, TypeId};
use serde::{Deserialize, Serialize};

/// Canonical paths of reusable definitions start with this prefix.
pub const COMPONENTS_PREFIX: &str = "#/components/";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
/// One node of the catalog graph.
///
/// `label` drives export dispatch; `name` carries the document key (or the
/// array index for list items). `side_channel` holds whatever the walker did
/// not model, JSON-encoded.
pub struct Entity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub kind: AssetKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_ref: Option<TypeId>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub side_channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<EntityId>,
}

impl Entity {
    /// Structural node whose name and label are both `name`.
    pub fn element(name: &str) -> Self {
        Self::labelled(name, name)
    }

    /// Structural node with distinct name and label (array items, contacts).
    pub fn labelled(name: &str, label: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            label: label.to_string(),
            kind: AssetKind::Element,
            description: String::new(),
            type_ref: None,
            side_channel: String::new(),
            parent: None,
        }
    }

    /// Leaf-ish node keyed by a user-chosen name (schema property, tag, scope).
    pub fn property(name: &str) -> Self {
        Self {
            kind: AssetKind::Property,
            ..Self::element(name)
        }
    }

    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_description(mut self, description: Option<&str>) -> Self {
        self.description = description.unwrap_or_default().to_string();
        self
    }

    pub fn with_type(mut self, type_ref: Option<TypeId>) -> Self {
        self.type_ref = type_ref;
        self
    }

    pub fn with_side_channel(mut self, side_channel: String) -> Self {
        self.side_channel = side_channel;
        self
    }

    /// Optional description, `None` when empty.
    pub fn description(&self) -> Option<&str> {
        if self.description.is_empty() {
            None
        } else {
            Some(&self.description)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
/// Deduplicated type entry: a primitive name or a component's canonical path.
pub struct TypeRecord {
    pub id: TypeId,
    pub name: String,
    #[serde(default)]
    pub complex: bool,
}

impl TypeRecord {
    /// True when the record names a reusable definition under `#/components/`.
    pub fn is_component(&self) -> bool {
        self.name.starts_with(COMPONENTS_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_fill_fields() {
        let entity = Entity::property("a")
            .with_parent(EntityId(9))
            .with_description(Some("first"))
            .with_type(Some(TypeId(2)))
            .with_side_channel("{\"minimum\":0}".to_string());
        assert_eq!(entity.name, "a");
        assert_eq!(entity.label, "a");
        assert!(entity.kind.is_property());
        assert_eq!(entity.parent, Some(EntityId(9)));
        assert_eq!(entity.description(), Some("first"));
        assert_eq!(entity.type_ref, Some(TypeId(2)));

        let item = Entity::labelled("0", "trait").with_description(None);
        assert_eq!(item.name, "0");
        assert_eq!(item.label, "trait");
        assert_eq!(item.description(), None);
    }

    #[test]
    fn component_records_are_detected_by_prefix() {
        let component = TypeRecord {
            id: TypeId(1),
            name: "#/components/messages/Ping".to_string(),
            complex: true,
        };
        let basic = TypeRecord {
            id: TypeId(2),
            name: "string".to_string(),
            complex: false,
        };
        let other = TypeRecord {
            id: TypeId(3),
            name: "#/definitions/Ping".to_string(),
            complex: true,
        };
        assert!(component.is_component());
        assert!(!basic.is_component());
        assert!(!other.is_component());
    }
}
