#![allow(dead_code)]

use apicatalog::{
    CatalogStore, Entity, EntityId, ImportSummary, MemoryCatalog, StoreError, TypeId, TypeRecord,
    import_document, load_document,
};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn load_fixture(name: &str) -> Map<String, Value> {
    load_document(&fixture_path(name)).expect("fixture should decode")
}

pub fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object fixture, got {other}"),
    }
}

/// Import `document` into a fresh in-memory catalog.
pub fn import_fresh(root: &str, document: &Map<String, Value>) -> (MemoryCatalog, ImportSummary) {
    let mut store = MemoryCatalog::new();
    let summary = import_document(&mut store, root, document).expect("import should succeed");
    (store, summary)
}

/// Follow entity names from `start` down through the graph.
pub fn entity_at(store: &impl CatalogStore, start: EntityId, names: &[&str]) -> Entity {
    let mut current = start;
    let mut found = None;
    for name in names {
        let children = store.find_children(current).expect("children should list");
        let child = children
            .into_iter()
            .find(|child| child.name == *name)
            .unwrap_or_else(|| panic!("no child named {name} under entity {current}"));
        current = child.id.expect("stored entity has an id");
        found = Some(child);
    }
    found.expect("path must name at least one entity")
}

pub fn type_name_of(store: &impl CatalogStore, entity: &Entity) -> Option<String> {
    entity.type_ref.map(|id| {
        store
            .find_type_record_by_id(id)
            .expect("type record should exist")
            .name
    })
}

/// Every `$ref` string anywhere under `value`.
pub fn collect_refs(value: &Value, refs: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map {
                match (key.as_str(), entry) {
                    ("$ref", Value::String(path)) => refs.push(path.clone()),
                    _ => collect_refs(entry, refs),
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_refs(item, refs)),
        _ => {}
    }
}

/// In-memory store that counts type-record lookups and creations by name.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryCatalog,
    lookups: RefCell<BTreeMap<String, usize>>,
    creates: BTreeMap<String, usize>,
}

impl CountingStore {
    pub fn lookups(&self, name: &str) -> usize {
        self.lookups.borrow().get(name).copied().unwrap_or_default()
    }

    pub fn creates(&self, name: &str) -> usize {
        self.creates.get(name).copied().unwrap_or_default()
    }
}

impl CatalogStore for CountingStore {
    fn create_entity(&mut self, entity: &Entity) -> Result<EntityId, StoreError> {
        self.inner.create_entity(entity)
    }
    fn find_entities_by_name(&self, name: &str) -> Result<Vec<Entity>, StoreError> {
        self.inner.find_entities_by_name(name)
    }
    fn find_children(&self, parent: EntityId) -> Result<Vec<Entity>, StoreError> {
        self.inner.find_children(parent)
    }
    fn delete_entity(&mut self, id: EntityId) -> Result<(), StoreError> {
        self.inner.delete_entity(id)
    }
    fn create_type_record(&mut self, name: &str, complex: bool) -> Result<TypeId, StoreError> {
        *self.creates.entry(name.to_string()).or_default() += 1;
        self.inner.create_type_record(name, complex)
    }
    fn find_type_record_by_name(&self, name: &str) -> Result<Option<TypeId>, StoreError> {
        *self.lookups.borrow_mut().entry(name.to_string()).or_default() += 1;
        self.inner.find_type_record_by_name(name)
    }
    fn find_type_record_by_id(&self, id: TypeId) -> Result<TypeRecord, StoreError> {
        self.inner.find_type_record_by_id(id)
    }
    fn delete_type_record(&mut self, id: TypeId) -> Result<(), StoreError> {
        self.inner.delete_type_record(id)
    }
}

/// In-memory store whose entity creation starts failing after `budget`
/// successful calls, like a catalog that goes away mid-import.
pub struct FailingStore {
    pub inner: MemoryCatalog,
    budget: usize,
}

impl FailingStore {
    pub fn new(budget: usize) -> Self {
        Self {
            inner: MemoryCatalog::new(),
            budget,
        }
    }
}

impl CatalogStore for FailingStore {
    fn create_entity(&mut self, entity: &Entity) -> Result<EntityId, StoreError> {
        if self.budget == 0 {
            return Err(StoreError::Status {
                method: "POST",
                url: "http://catalog.invalid/asset".to_string(),
                status: 503,
            });
        }
        self.budget -= 1;
        self.inner.create_entity(entity)
    }
    fn find_entities_by_name(&self, name: &str) -> Result<Vec<Entity>, StoreError> {
        self.inner.find_entities_by_name(name)
    }
    fn find_children(&self, parent: EntityId) -> Result<Vec<Entity>, StoreError> {
        self.inner.find_children(parent)
    }
    fn delete_entity(&mut self, id: EntityId) -> Result<(), StoreError> {
        self.inner.delete_entity(id)
    }
    fn create_type_record(&mut self, name: &str, complex: bool) -> Result<TypeId, StoreError> {
        self.inner.create_type_record(name, complex)
    }
    fn find_type_record_by_name(&self, name: &str) -> Result<Option<TypeId>, StoreError> {
        self.inner.find_type_record_by_name(name)
    }
    fn find_type_record_by_id(&self, id: TypeId) -> Result<TypeRecord, StoreError> {
        self.inner.find_type_record_by_id(id)
    }
    fn delete_type_record(&mut self, id: TypeId) -> Result<(), StoreError> {
        self.inner.delete_type_record(id)
    }
}
