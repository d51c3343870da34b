//! Catalog graph model and storage backends.
//!
//! `model` holds the entity/type-record types the walkers produce, `store` the
//! CRUD trait they depend on. `memory` is an in-process backend used for
//! dry runs and tests; `http` talks to the remote catalog REST API.

pub mod http;
pub mod identity;
pub mod memory;
pub mod model;
pub mod store;

pub use http::HttpCatalog;
pub use identity::{AssetKind, BasicType, EntityId, TypeId};
pub use memory::MemoryCatalog;
pub use model::{COMPONENTS_PREFIX, Entity, TypeRecord};
pub use store::{CatalogStore, StoreError};
