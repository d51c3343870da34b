//! CRUD contract between the walkers and a catalog backend.

use crate::catalog::identity::{EntityId, TypeId};
use crate::catalog::model::{Entity, TypeRecord};
use thiserror::Error;

/// Failures reported by a catalog backend. Never retried by callers.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("catalog request {method} {url} failed")]
    Transport {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("catalog request {method} {url} returned status {status}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
    },
    #[error("malformed catalog response from {url}")]
    Malformed {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{what} {id} not found in catalog")]
    NotFound { what: &'static str, id: String },
}

/// Persistence operations the import/export/cleanup walkers depend on.
///
/// Writes take `&mut self`; export only ever needs `&self`.
pub trait CatalogStore {
    /// Persist a new entity and return its store-assigned id.
    fn create_entity(&mut self, entity: &Entity) -> Result<EntityId, StoreError>;

    /// Every entity with the given name. Names are not unique: a root and
    /// any descendant can share one.
    fn find_entities_by_name(&self, name: &str) -> Result<Vec<Entity>, StoreError>;

    /// Direct children of `parent`.
    fn find_children(&self, parent: EntityId) -> Result<Vec<Entity>, StoreError>;

    fn delete_entity(&mut self, id: EntityId) -> Result<(), StoreError>;

    /// Create a type record; `complex` marks reusable component types.
    fn create_type_record(&mut self, name: &str, complex: bool) -> Result<TypeId, StoreError>;

    fn find_type_record_by_name(&self, name: &str) -> Result<Option<TypeId>, StoreError>;

    fn find_type_record_by_id(&self, id: TypeId) -> Result<TypeRecord, StoreError>;

    fn delete_type_record(&mut self, id: TypeId) -> Result<(), StoreError>;
}
