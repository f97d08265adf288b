//! Backstage catalog generation
//!
//! Turns the extracted resource graph into catalog entities with
//! deterministic, collision-free names.

pub mod entity;
pub mod generator;
pub mod naming;
pub mod selector;

pub use entity::{
    CATALOG_API_VERSION, CatalogEntity, EntityKind, EntityLink, EntityMetadata, EntitySpec,
    MAX_ENTITY_NAME_LEN, to_yaml_stream,
};
pub use generator::{CORE_SYSTEM, CUSTOM_SYSTEM, CatalogGenerator};
pub use naming::{EntityNamer, NameCandidate};
pub use selector::label_selector;
