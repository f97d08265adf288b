//! Model layer
//!
//! Structure:
//! - `construct.rs` - Construct tree handed over by the chart layer
//! - `api_object.rs` - Kubernetes-shaped objects carried by resource leaves
//! - `resource.rs` - Extracted resource records and relationships
//! - `resource_kind.rs` - Kinds with dedicated extraction/catalog rules

pub mod api_object;
pub mod construct;
pub mod resource;
pub mod resource_kind;

pub use api_object::{ApiObject, DEFAULT_NAMESPACE};
pub use construct::{ConstructNode, ConstructTree, NodeId, TreeDocument};
pub use resource::{
    RelationshipSet, RelationshipType, ResourceNode, ResourceRelationship, UNKNOWN_CHART,
    resource_id,
};
pub use resource_kind::{ResourceKind, is_workload_kind};
