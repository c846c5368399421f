//! Packed per-type component storage

use std::any::Any;

use super::sparse_set::SparseSet;
use super::Entity;
use crate::tag::ComponentId;

/// Anything that can be attached to an entity.
///
/// `Clone` is needed so whole entities can be copied.
pub trait Component: Clone + 'static {}

impl<T: Clone + 'static> Component for T {}

/// Type-erased component storage.
///
/// The registry holds one of these per component type and only talks to it
/// through this surface; typed access goes through [`as_any`](Self::as_any).
pub trait ComponentStore: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn component_id(&self) -> ComponentId;
    fn contains(&self, entity: Entity) -> bool;
    fn remove(&mut self, entity: Entity) -> bool;
    /// Clone the value of `src` into a new slot owned by `dst`.
    fn copy(&mut self, src: Entity, dst: Entity) -> bool;
    fn entities(&self) -> &[Entity];
    fn clear(&mut self);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Concrete storage for a specific component type.
///
/// `index` and `data` are kept in lockstep: the dense position of an entity
/// in `index` is the slot of its value in `data`.
pub struct TypedComponentStore<T: Component> {
    index: SparseSet<Entity>,
    data: Vec<T>,
}

impl<T: Component> TypedComponentStore<T> {
    pub fn new() -> Self {
        Self {
            index: SparseSet::new(),
            data: Vec::new(),
        }
    }

    /// Insert `component` for `entity`. Does nothing if it is already present.
    pub fn insert(&mut self, entity: Entity, component: T) -> bool {
        if self.index.contains(entity) {
            return false;
        }
        self.index.insert(entity);
        self.data.push(component);
        true
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.index.index_of(entity).map(|slot| &self.data[slot])
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let slot = self.index.index_of(entity)?;
        Some(&mut self.data[slot])
    }

    /// The value in slot 0, used for singleton-style components.
    pub fn first(&self) -> Option<&T> {
        self.data.first()
    }

    pub fn first_mut(&mut self) -> Option<&mut T> {
        self.data.first_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.index.iter().zip(self.data.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.index.iter().zip(self.data.iter_mut())
    }

    pub fn values(&self) -> &[T] {
        &self.data
    }
}

impl<T: Component> Default for TypedComponentStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> ComponentStore for TypedComponentStore<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn component_id(&self) -> ComponentId {
        ComponentId::of::<T>()
    }

    fn contains(&self, entity: Entity) -> bool {
        self.index.contains(entity)
    }

    fn remove(&mut self, entity: Entity) -> bool {
        // both arrays swap-remove the same slot, so they stay aligned
        match self.index.remove(entity) {
            Some(slot) => {
                self.data.swap_remove(slot);
                true
            }
            None => false,
        }
    }

    fn copy(&mut self, src: Entity, dst: Entity) -> bool {
        if self.index.contains(dst) {
            return false;
        }
        let Some(value) = self.get(src).cloned() else {
            return false;
        };
        self.insert(dst, value)
    }

    fn entities(&self) -> &[Entity] {
        self.index.as_slice()
    }

    fn clear(&mut self) {
        self.index.clear();
        self.data.clear();
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    fn entity(id: u32) -> Entity {
        Entity::from_raw(id)
    }

    #[test]
    fn test_component_store() {
        let mut store = TypedComponentStore::<Position>::new();

        assert!(store.insert(entity(1), Position { x: 1.0, y: 2.0 }));
        assert!(store.insert(entity(2), Position { x: 3.0, y: 4.0 }));

        assert_eq!(store.len(), 2);
        assert!(store.contains(entity(1)));
        assert!(store.contains(entity(2)));
        assert!(!store.contains(entity(3)));

        let pos = store.get(entity(1)).unwrap();
        assert_eq!(pos.x, 1.0);
        assert_eq!(pos.y, 2.0);

        assert!(store.remove(entity(1)));
        assert!(!store.contains(entity(1)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_insert_keeps_first_value() {
        let mut store = TypedComponentStore::<Position>::new();
        store.insert(entity(1), Position { x: 1.0, y: 1.0 });

        assert!(!store.insert(entity(1), Position { x: 9.0, y: 9.0 }));
        assert_eq!(store.get(entity(1)), Some(&Position { x: 1.0, y: 1.0 }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_swap_remove_keeps_other_values() {
        let mut store = TypedComponentStore::<u32>::new();
        for id in 0..5 {
            store.insert(entity(id), id * 10);
        }

        assert!(store.remove(entity(1)));
        assert!(!store.remove(entity(1)));

        for id in [0, 2, 3, 4] {
            assert_eq!(store.get(entity(id)), Some(&(id * 10)));
        }
        assert_eq!(store.entities(), &[entity(0), entity(4), entity(2), entity(3)]);
    }

    #[test]
    fn test_component_copy() {
        let mut store = TypedComponentStore::<Position>::new();
        store.insert(entity(1), Position { x: 1.0, y: 2.0 });

        assert!(store.copy(entity(1), entity(2)));
        assert_eq!(store.get(entity(2)), store.get(entity(1)));

        // source missing or destination occupied
        assert!(!store.copy(entity(7), entity(3)));
        assert!(!store.copy(entity(1), entity(2)));

        store.get_mut(entity(2)).unwrap().x = 5.0;
        assert_eq!(store.get(entity(1)).unwrap().x, 1.0);
    }

    #[test]
    fn test_component_iteration() {
        let mut store = TypedComponentStore::<Position>::new();
        store.insert(entity(1), Position { x: 1.0, y: 2.0 });
        store.insert(entity(2), Position { x: 3.0, y: 4.0 });

        assert_eq!(store.iter().count(), 2);

        for (_entity, pos) in store.iter_mut() {
            pos.x += 1.0;
        }

        assert_eq!(store.get(entity(1)).unwrap().x, 2.0);
        assert_eq!(store.first().unwrap().x, 2.0);
    }

    #[test]
    fn test_erased_surface() {
        let mut store: Box<dyn ComponentStore> = Box::new(TypedComponentStore::<u8>::new());
        assert_eq!(store.component_id(), ComponentId::of::<u8>());
        assert!(store.is_empty());

        store
            .as_any_mut()
            .downcast_mut::<TypedComponentStore<u8>>()
            .unwrap()
            .insert(entity(4), 1);
        assert_eq!(store.len(), 1);

        store.clear();
        assert!(store.is_empty());
        assert!(!store.contains(entity(4)));
    }
}
