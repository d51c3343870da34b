//! Import walker: AsyncAPI document to entity graph.
//!
//! Depth-first, parent before child. Every object construct creates one
//! entity whose side channel holds the fields it does not model; modeled
//! fields become children walked according to their [`Construct`] layout.
//! `$ref`s into `#/components/` short-circuit at use sites: the entity is
//! typed with the referenced component record and nothing below it is
//! walked. The member bodies under `components` are the authoritative
//! definitions and are walked in full.

use super::{ComponentCategory, Construct, Layout, ROOT_LABEL, modeled_fields};
use crate::catalog::{
    AssetKind, BasicType, COMPONENTS_PREFIX, CatalogStore, Entity, EntityId, TypeId,
};
use crate::document::{component_ref, ref_path, type_name};
use crate::registry::TypeRegistry;
use crate::side_channel;
use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// What an import run created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub root: String,
    pub root_id: EntityId,
    pub entities: usize,
    pub type_records: usize,
}

/// Import `document` under a new root entity named `root`.
///
/// Only store failures abort the run; entities created before the failure
/// stay in the store. A value whose shape does not fit its construct (a
/// channel that is not an object, a category that is not a map) is logged
/// and kept verbatim so export returns it unchanged.
pub fn import_document<S: CatalogStore + ?Sized>(
    store: &mut S,
    root: &str,
    document: &Map<String, Value>,
) -> Result<ImportSummary> {
    let registry = TypeRegistry::with_basic_types(store);
    let mut importer = Importer {
        store,
        registry,
        created: 0,
    };
    let root_id = importer.object_body(Construct::Document, Slot::root(root), document, Site::Inline)?;
    let summary = ImportSummary {
        root: root.to_string(),
        root_id,
        entities: importer.created,
        type_records: importer.registry.len(),
    };
    info!(
        root,
        root_id = %root_id,
        entities = summary.entities,
        type_records = summary.type_records,
        "imported document"
    );
    Ok(summary)
}

/// Where a construct sits: at a use site, or as the body of a component
/// member (carrying the member's own record).
#[derive(Clone, Copy, Debug)]
enum Site {
    Inline,
    Definition(Option<TypeId>),
}

/// Identity of the entity about to be created for a construct.
#[derive(Clone, Debug)]
struct Slot {
    parent: Option<EntityId>,
    name: String,
    label: String,
    kind: AssetKind,
    path: String,
}

impl Slot {
    fn root(name: &str) -> Self {
        Self {
            parent: None,
            name: name.to_string(),
            label: ROOT_LABEL.to_string(),
            kind: AssetKind::Element,
            path: "#".to_string(),
        }
    }

    fn child(&self, parent: EntityId, name: &str, label: &str, kind: AssetKind) -> Self {
        Self {
            parent: Some(parent),
            name: name.to_string(),
            label: label.to_string(),
            kind,
            path: format!("{}/{}", self.path, name),
        }
    }

    fn entity(&self) -> Entity {
        let mut entity = Entity::labelled(&self.name, &self.label);
        entity.kind = self.kind.clone();
        entity.parent = self.parent;
        entity
    }
}

struct Importer<'s, S: CatalogStore + ?Sized> {
    store: &'s mut S,
    registry: TypeRegistry,
    created: usize,
}

impl<S: CatalogStore + ?Sized> Importer<'_, S> {
    fn walk(&mut self, construct: Construct, slot: Slot, node: &Value, site: Site) -> Result<()> {
        if construct == Construct::Components {
            return self.components(slot, node);
        }
        match construct.layout() {
            Layout::Object { .. } => self.object(construct, slot, node, site),
            Layout::Map { member } => self.members(member, slot, node),
            Layout::List { item, item_label } => self.items(item, item_label, slot, node),
            Layout::Simple => self.simple(slot, node),
            Layout::Opaque => {
                let entity = slot.entity().with_side_channel(side_channel::encode_value(node));
                self.create(entity, &slot.path).map(|_| ())
            }
            Layout::Scope => self.scope(slot, node),
            Layout::RequiredScope => self.required_scope(slot, node),
        }
    }

    fn create(&mut self, entity: Entity, path: &str) -> Result<EntityId> {
        let id = self
            .store
            .create_entity(&entity)
            .with_context(|| format!("Failed to create entity for {path}"))?;
        self.created += 1;
        debug!(path, %id, label = %entity.label, "created entity");
        Ok(id)
    }

    fn resolve_basic(&mut self, basic: BasicType) -> Option<TypeId> {
        self.registry.resolve(&mut *self.store, basic.as_str(), false)
    }

    fn object(&mut self, construct: Construct, slot: Slot, node: &Value, site: Site) -> Result<()> {
        if let (Site::Inline, Some(path)) = (site, component_ref(node)) {
            if construct.accepts_ref() && self.reference(&slot, node, path)? {
                return Ok(());
            }
        }
        if let Some(path) = ref_path(node).filter(|_| matches!(site, Site::Inline)) {
            if !path.starts_with(COMPONENTS_PREFIX) {
                warn!(at = %slot.path, reference = path, "only #/components/ references are resolved; keeping $ref verbatim");
            }
        }
        let Value::Object(map) = node else {
            let type_ref = match site {
                Site::Definition(type_ref) => type_ref,
                Site::Inline => None,
            };
            return self.verbatim(slot, node, type_ref);
        };
        self.object_body(construct, slot, map, site).map(|_| ())
    }

    /// A value of the wrong shape for its construct, stored whole. Export
    /// recognizes it by a side channel that is JSON but not an object.
    fn verbatim(&mut self, slot: Slot, node: &Value, type_ref: Option<TypeId>) -> Result<()> {
        warn!(at = %slot.path, found = type_name(node), "unexpected shape; keeping the value verbatim");
        let entity = slot
            .entity()
            .with_type(type_ref)
            .with_side_channel(side_channel::encode_value(node));
        self.create(entity, &slot.path).map(|_| ())
    }

    /// Use-site `$ref`: an entity typed with the component record, no body.
    /// Returns false when the record cannot be resolved, in which case the
    /// caller walks the node as plain fields so the `$ref` survives in the
    /// side channel.
    fn reference(&mut self, slot: &Slot, node: &Value, path: &str) -> Result<bool> {
        let Some(type_ref) = self.registry.resolve(&mut *self.store, path, true) else {
            return Ok(false);
        };
        if node.as_object().is_some_and(|map| map.len() > 1) {
            warn!(at = %slot.path, reference = path, "fields next to a component $ref are dropped");
        }
        self.create(slot.entity().with_type(Some(type_ref)), &slot.path)?;
        Ok(true)
    }

    fn object_body(
        &mut self,
        construct: Construct,
        slot: Slot,
        map: &Map<String, Value>,
        site: Site,
    ) -> Result<EntityId> {
        let Layout::Object { described, fields } = construct.layout() else {
            bail!("{}: {construct:?} is not an object construct", slot.path);
        };
        let mut modeled = modeled_fields(map, described, fields, &slot.path);
        let mut type_ref = match site {
            Site::Definition(type_ref) => type_ref,
            Site::Inline => None,
        };
        let mut entity_name = slot.name.clone();
        let mut entity_kind = slot.kind.clone();
        let mut properties = None;

        match construct {
            Construct::Schema => {
                if type_ref.is_none() {
                    let basic = map
                        .get("type")
                        .and_then(Value::as_str)
                        .and_then(BasicType::from_name);
                    if let Some(basic) = basic {
                        type_ref = self.resolve_basic(basic);
                        if type_ref.is_some() {
                            modeled.push("type");
                        }
                    }
                }
                match map.get("properties") {
                    Some(Value::Object(members)) if !members.is_empty() => {
                        modeled.push("properties");
                        properties = Some(members);
                    }
                    Some(Value::Object(_)) | None => {}
                    Some(_) => warn!(at = %slot.path, "properties is not an object; keeping it verbatim"),
                }
            }
            Construct::Tag => match map.get("name").and_then(Value::as_str) {
                Some(name) if !name.is_empty() => {
                    entity_name = name.to_string();
                    modeled.push("name");
                }
                // Only named tags are properties; export adds `name` back
                // for those alone.
                _ => {
                    warn!(at = %slot.path, "tag without a name; naming it by position");
                    entity_kind = AssetKind::Element;
                }
            },
            _ => {}
        }

        let mut entity = slot.entity();
        entity.name = entity_name;
        entity.kind = entity_kind;
        let entity = entity
            .with_description(modeled_description(map, &modeled))
            .with_type(type_ref)
            .with_side_channel(side_channel::encode(map, &modeled));
        let id = self.create(entity, &slot.path)?;

        for field in fields {
            if !modeled.contains(&field.key) {
                continue;
            }
            let Some(value) = map.get(field.key) else {
                continue;
            };
            let name = child_name(field.key, value);
            let child = slot.child(id, name, field.key, field.construct.kind());
            self.walk(field.construct, child, value, Site::Inline)?;
        }

        if let Some(members) = properties {
            for (key, member) in members {
                let mut child = slot.child(id, key, key, AssetKind::Property);
                child.path = format!("{}/properties/{key}", slot.path);
                self.walk(Construct::Schema, child, member, Site::Inline)?;
            }
        }
        Ok(id)
    }

    /// `components`: every member path of every recognized category is
    /// registered first, then each member body is walked as a definition.
    fn components(&mut self, slot: Slot, node: &Value) -> Result<()> {
        let Value::Object(map) = node else {
            return self.verbatim(slot, node, None);
        };
        let mut categories = Vec::new();
        for (key, value) in map {
            let Some(category) = ComponentCategory::from_key(key) else {
                warn!(at = %slot.path, category = %key, "unrecognized component category; keeping it verbatim");
                continue;
            };
            let Value::Object(members) = value else {
                warn!(at = %slot.path, category = %key, found = type_name(value), "component category is not a map; keeping it verbatim");
                continue;
            };
            for name in members.keys() {
                self.registry
                    .resolve(&mut *self.store, &category.member_path(name), true);
            }
            categories.push((key.as_str(), category, members));
        }

        let modeled: Vec<&str> = categories.iter().map(|(key, _, _)| *key).collect();
        let entity = slot
            .entity()
            .with_side_channel(side_channel::encode(map, &modeled));
        let id = self.create(entity, &slot.path)?;

        for (key, category, members) in categories {
            let category_slot = slot.child(id, key, key, AssetKind::Element);
            let category_id = self.create(category_slot.entity(), &category_slot.path)?;
            let member = category.member();
            for (name, body) in members {
                let definition = self.registry.cached(&category.member_path(name));
                let child = category_slot.child(category_id, name, name, member.kind());
                self.walk(member, child, body, Site::Definition(definition))?;
            }
        }
        Ok(())
    }

    fn members(&mut self, member: Construct, slot: Slot, node: &Value) -> Result<()> {
        let Value::Object(map) = node else {
            return self.verbatim(slot, node, None);
        };
        let id = self.create(slot.entity(), &slot.path)?;
        for (key, value) in map {
            let child = slot.child(id, key, key, member.kind());
            self.walk(member, child, value, Site::Inline)?;
        }
        Ok(())
    }

    fn items(&mut self, item: Construct, item_label: &str, slot: Slot, node: &Value) -> Result<()> {
        let Value::Array(entries) = node else {
            return self.verbatim(slot, node, None);
        };
        let array = self.resolve_basic(BasicType::Array);
        let id = self.create(slot.entity().with_type(array), &slot.path)?;
        for (index, entry) in entries.iter().enumerate() {
            let child = slot.child(id, &index.to_string(), item_label, item.kind());
            self.walk(item, child, entry, Site::Inline)?;
        }
        Ok(())
    }

    /// Scalar leaf. Strings are stored raw, everything else as JSON text.
    fn simple(&mut self, slot: Slot, node: &Value) -> Result<()> {
        let (side, basic) = match node {
            Value::String(text) if text.is_empty() => {
                debug!(at = %slot.path, "skipping empty value");
                return Ok(());
            }
            Value::String(text) => (text.clone(), Some(BasicType::String)),
            Value::Bool(_) => (side_channel::encode_value(node), Some(BasicType::Boolean)),
            Value::Number(number) if number.is_i64() || number.is_u64() => {
                (side_channel::encode_value(node), Some(BasicType::Integer))
            }
            other => (side_channel::encode_value(other), None),
        };
        let type_ref = basic.and_then(|basic| self.resolve_basic(basic));
        let entity = slot.entity().with_type(type_ref).with_side_channel(side);
        self.create(entity, &slot.path).map(|_| ())
    }

    /// OAuth scope: the scope text is the description.
    fn scope(&mut self, slot: Slot, node: &Value) -> Result<()> {
        let entity = match node {
            Value::String(text) => slot.entity().with_description(Some(text)),
            other => slot
                .entity()
                .with_side_channel(side_channel::encode_value(other)),
        };
        self.create(entity, &slot.path).map(|_| ())
    }

    /// Entry of a security requirement's scope list.
    fn required_scope(&mut self, slot: Slot, node: &Value) -> Result<()> {
        let entity = match node {
            Value::String(scope) => {
                let mut entity = slot.entity();
                entity.name = scope.clone();
                entity
            }
            other => slot
                .entity()
                .with_side_channel(side_channel::encode_value(other)),
        };
        self.create(entity, &slot.path).map(|_| ())
    }
}

fn modeled_description<'a>(map: &'a Map<String, Value>, modeled: &[&str]) -> Option<&'a str> {
    if modeled.contains(&"description") {
        map.get("description").and_then(Value::as_str)
    } else {
        None
    }
}

/// Entity name of a fixed-field child. A contact is named after the contact.
fn child_name<'a>(key: &'a str, value: &'a Value) -> &'a str {
    if key == "contact" {
        if let Some(name) = value.get("name").and_then(Value::as_str) {
            if !name.is_empty() {
                return name;
            }
        }
    }
    key
}
