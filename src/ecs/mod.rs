//! Entity Component System (ECS) core
//!
//! Components of one type live packed in a `Vec<T>`, indexed by a sparse set
//! keyed on the entity id, so removal is a swap-remove and never shifts.

pub mod component;
pub mod entity;
pub mod query;
pub mod registry;
pub mod sparse_set;

pub use component::{Component, ComponentStore, TypedComponentStore};
pub use entity::{Entity, EntityId, EntityIssuer};
pub use query::ComponentSet;
pub use registry::Registry;
pub use sparse_set::{SparseKey, SparseSet};
