//! In-memory catalog backend.
//!
//! Backs `--dry-run` imports and the test suite. Ids are handed out from
//! monotonically increasing counters so sibling order matches creation order,
//! the same guarantee the remote catalog gives.

use crate::catalog::identity::{EntityId, TypeId};
use crate::catalog::model::{Entity, TypeRecord};
use crate::catalog::store::{CatalogStore, StoreError};
use std::collections::BTreeMap;

#[derive(Default, Debug)]
/// Entities and type records keyed by id.
pub struct MemoryCatalog {
    entities: BTreeMap<EntityId, Entity>,
    types: BTreeMap<TypeId, TypeRecord>,
    next_entity: u64,
    next_type: u64,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored entity in creation order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Every stored type record in creation order.
    pub fn type_records(&self) -> impl Iterator<Item = &TypeRecord> {
        self.types.values()
    }

    /// Fetch an entity by id.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Count type records carrying `name`; used to check deduplication.
    pub fn type_records_named(&self, name: &str) -> usize {
        self.types.values().filter(|t| t.name == name).count()
    }
}

impl CatalogStore for MemoryCatalog {
    fn create_entity(&mut self, entity: &Entity) -> Result<EntityId, StoreError> {
        if let Some(parent) = entity.parent {
            if !self.entities.contains_key(&parent) {
                return Err(StoreError::NotFound {
                    what: "parent entity",
                    id: parent.to_string(),
                });
            }
        }
        self.next_entity += 1;
        let id = EntityId(self.next_entity);
        let mut stored = entity.clone();
        stored.id = Some(id);
        self.entities.insert(id, stored);
        Ok(id)
    }

    fn find_entities_by_name(&self, name: &str) -> Result<Vec<Entity>, StoreError> {
        Ok(self
            .entities
            .values()
            .filter(|e| e.name == name)
            .cloned()
            .collect())
    }

    fn find_children(&self, parent: EntityId) -> Result<Vec<Entity>, StoreError> {
        Ok(self
            .entities
            .values()
            .filter(|e| e.parent == Some(parent))
            .cloned()
            .collect())
    }

    fn delete_entity(&mut self, id: EntityId) -> Result<(), StoreError> {
        self.entities
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                what: "entity",
                id: id.to_string(),
            })
    }

    fn create_type_record(&mut self, name: &str, complex: bool) -> Result<TypeId, StoreError> {
        self.next_type += 1;
        let id = TypeId(self.next_type);
        self.types.insert(
            id,
            TypeRecord {
                id,
                name: name.to_string(),
                complex,
            },
        );
        Ok(id)
    }

    fn find_type_record_by_name(&self, name: &str) -> Result<Option<TypeId>, StoreError> {
        Ok(self.types.values().find(|t| t.name == name).map(|t| t.id))
    }

    fn find_type_record_by_id(&self, id: TypeId) -> Result<TypeRecord, StoreError> {
        self.types
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                what: "type record",
                id: id.to_string(),
            })
    }

    fn delete_type_record(&mut self, id: TypeId) -> Result<(), StoreError> {
        self.types
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                what: "type record",
                id: id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_come_back_in_creation_order() {
        let mut store = MemoryCatalog::new();
        let root = store.create_entity(&Entity::element("root")).unwrap();
        let b = store
            .create_entity(&Entity::element("b").with_parent(root))
            .unwrap();
        let a = store
            .create_entity(&Entity::element("a").with_parent(root))
            .unwrap();
        store
            .create_entity(&Entity::element("nested").with_parent(a))
            .unwrap();

        let children = store.find_children(root).unwrap();
        let ids: Vec<_> = children.iter().map(|e| e.id.unwrap()).collect();
        assert_eq!(ids, vec![b, a]);
        assert_eq!(children[1].name, "a");
    }

    #[test]
    fn rejects_unknown_parent() {
        let mut store = MemoryCatalog::new();
        let err = store
            .create_entity(&Entity::element("orphan").with_parent(EntityId(99)))
            .expect_err("parent must exist");
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(store.entities().count(), 0);
    }

    #[test]
    fn type_records_round_trip_and_delete() {
        let mut store = MemoryCatalog::new();
        let id = store
            .create_type_record("#/components/schemas/Foo", true)
            .unwrap();
        assert_eq!(
            store
                .find_type_record_by_name("#/components/schemas/Foo")
                .unwrap(),
            Some(id)
        );
        let record = store.find_type_record_by_id(id).unwrap();
        assert!(record.complex);
        assert!(record.is_component());

        store.delete_type_record(id).unwrap();
        assert_eq!(store.find_type_record_by_name("#/components/schemas/Foo").unwrap(), None);
        assert!(store.find_type_record_by_id(id).is_err());
        assert!(store.delete_type_record(id).is_err());
    }

    #[test]
    fn delete_entity_leaves_children_in_place() {
        let mut store = MemoryCatalog::new();
        let root = store.create_entity(&Entity::element("root")).unwrap();
        let child = store
            .create_entity(&Entity::element("child").with_parent(root))
            .unwrap();
        store.delete_entity(root).unwrap();
        assert!(store.entity(root).is_none());
        assert!(store.entity(child).is_some());
        assert!(store.find_entities_by_name("root").unwrap().is_empty());
        assert_eq!(store.find_entities_by_name("child").unwrap().len(), 1);
    }
}
