//! Partial inverse of import.
//!
//! Removes the component type records registered for a document and then
//! the root entity itself. Descendant entities are left in the store; the
//! catalog does not cascade deletes and this command does not walk the tree
//! to remove them.

use super::{ComponentCategory, find_root};
use crate::catalog::{CatalogStore, Entity, EntityId};
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

/// What a cleanup run removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupSummary {
    pub root: String,
    pub root_found: bool,
    pub type_records_deleted: usize,
}

/// Delete the component type records found under `root`'s `components`
/// subtree, then the root entity. A missing root is reported, not an error.
pub fn clean_document<S: CatalogStore + ?Sized>(store: &mut S, root: &str) -> Result<CleanupSummary> {
    let mut summary = CleanupSummary {
        root: root.to_string(),
        ..CleanupSummary::default()
    };
    let found = find_root(store, root)
        .with_context(|| format!("Failed to look up root entity '{root}'"))?;
    let Some(root_id) = found.and_then(|entity| entity.id) else {
        warn!(root, "no root entity found; nothing to clean");
        return Ok(summary);
    };
    summary.root_found = true;

    let components = children(store, root_id)?
        .into_iter()
        .find(|child| child.label == "components");
    if let Some(components_id) = components.and_then(|entity| entity.id) {
        for category_entity in children(store, components_id)? {
            let Some(category) = ComponentCategory::from_key(&category_entity.label) else {
                warn!(label = %category_entity.label, "unrecognized component category; skipping");
                continue;
            };
            let Some(category_id) = category_entity.id else {
                continue;
            };
            for member in children(store, category_id)? {
                let path = category.member_path(&member.name);
                let existing = store
                    .find_type_record_by_name(&path)
                    .with_context(|| format!("Failed to look up type record {path}"))?;
                match existing {
                    Some(type_id) => {
                        store
                            .delete_type_record(type_id)
                            .with_context(|| format!("Failed to delete type record {path}"))?;
                        summary.type_records_deleted += 1;
                        debug!(path, %type_id, "deleted type record");
                    }
                    None => debug!(path, "no type record to delete"),
                }
            }
        }
    }

    store
        .delete_entity(root_id)
        .with_context(|| format!("Failed to delete root entity '{root}'"))?;
    info!(
        root,
        type_records = summary.type_records_deleted,
        "removed root entity and component type records"
    );
    Ok(summary)
}

fn children<S: CatalogStore + ?Sized>(store: &S, parent: EntityId) -> Result<Vec<Entity>> {
    store
        .find_children(parent)
        .with_context(|| format!("Failed to list children of entity {parent}"))
}
