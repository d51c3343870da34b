//! Per-run registry of type records.
//!
//! Maps canonical names (primitive names or `#/components/...` paths) to type
//! ids so a name is looked up or created at most once per run, and caches
//! records fetched by id for export. A registry is built at the start of each
//! import or export call and dropped with it; nothing is shared between runs.

use crate::catalog::{BasicType, CatalogStore, StoreError, TypeId, TypeRecord};
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct TypeRegistry {
    by_name: BTreeMap<String, TypeId>,
    by_id: BTreeMap<TypeId, TypeRecord>,
}

impl TypeRegistry {
    /// Empty registry; export starts here.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with the basic primitive types, as every import run
    /// needs before any document reference is resolved.
    pub fn with_basic_types<S: CatalogStore + ?Sized>(store: &mut S) -> Self {
        let mut registry = Self::new();
        for basic in BasicType::ALL {
            registry.resolve(store, basic.as_str(), false);
        }
        registry
    }

    /// Find or create the type record for `name`.
    ///
    /// Cached names never touch the store. Otherwise the store is queried and
    /// the record created when missing. Resolution is best-effort: a failed
    /// lookup or creation is logged and yields `None` so the caller leaves the
    /// type unset instead of aborting the walk. A failed lookup never falls
    /// through to creation, which could duplicate an existing record.
    pub fn resolve<S: CatalogStore + ?Sized>(
        &mut self,
        store: &mut S,
        name: &str,
        complex: bool,
    ) -> Option<TypeId> {
        if let Some(id) = self.by_name.get(name) {
            return Some(*id);
        }
        let existing = match store.find_type_record_by_name(name) {
            Ok(found) => found,
            Err(err) => {
                warn!(name, error = %err, "type lookup failed; leaving type unset");
                return None;
            }
        };
        let id = match existing {
            Some(id) => {
                debug!(name, %id, "reusing type record");
                id
            }
            None => match store.create_type_record(name, complex) {
                Ok(id) => {
                    debug!(name, %id, complex, "created type record");
                    id
                }
                Err(err) => {
                    warn!(name, error = %err, "failed to create type record; leaving type unset");
                    return None;
                }
            },
        };
        self.by_name.insert(name.to_string(), id);
        Some(id)
    }

    /// Id of a previously resolved name, without contacting the store.
    pub fn cached(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// Id of a basic type registered by [`TypeRegistry::with_basic_types`].
    pub fn basic(&self, basic: BasicType) -> Option<TypeId> {
        self.cached(basic.as_str())
    }

    /// Fetch (once) the record behind a type id.
    pub fn record<S: CatalogStore + ?Sized>(
        &mut self,
        store: &S,
        id: TypeId,
    ) -> Result<&TypeRecord, StoreError> {
        if !self.by_id.contains_key(&id) {
            let record = store.find_type_record_by_id(id)?;
            self.by_name.insert(record.name.clone(), id);
            self.by_id.insert(id, record);
        }
        self.by_id.get(&id).ok_or_else(|| StoreError::NotFound {
            what: "type record",
            id: id.to_string(),
        })
    }

    /// Number of distinct names resolved so far.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
