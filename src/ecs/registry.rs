//! Registry - live entities and their components

use std::collections::{HashMap, HashSet};

use tracing::trace;

use super::entity::EntityIssuer;
use super::sparse_set::SparseSet;
use super::{Component, ComponentSet, ComponentStore, Entity, TypedComponentStore};
use crate::config::WorldConfig;
use crate::tag::ComponentId;

/// Registry holds all entities and components.
///
/// `alive` and `records` are parallel: the dense position of an entity in
/// `alive` is the position of its component tag set in `records`. A tag is in
/// an entity's set iff the entity has a slot in that tag's store.
pub struct Registry {
    issuer: EntityIssuer,
    alive: SparseSet<Entity>,
    records: Vec<HashSet<ComponentId>>,
    stores: HashMap<ComponentId, Box<dyn ComponentStore>>,
    excluded: HashSet<ComponentId>,
    evict_empty_stores: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_config(&WorldConfig::default())
    }

    pub fn with_config(config: &WorldConfig) -> Self {
        Self {
            issuer: EntityIssuer::new(config.first_entity),
            alive: SparseSet::with_capacity(config.entity_capacity),
            records: Vec::with_capacity(config.entity_capacity),
            stores: HashMap::new(),
            excluded: HashSet::new(),
            evict_empty_stores: config.evict_empty_stores,
        }
    }

    /// Create a new entity without components
    pub fn create(&mut self) -> Entity {
        let entity = self.issuer.issue();
        self.insert_record(entity);
        trace!(%entity, "entity created");
        entity
    }

    /// Create a new entity from a bundle of components. When the bundle holds
    /// the same type twice, the first value wins.
    pub fn spawn<B: ComponentSet>(&mut self, components: B) -> Entity {
        let entity = self.create();
        components.attach(self, entity);
        entity
    }

    /// Create `entity` with an explicit handle. The issuer moves past it so the
    /// handle is never handed out again. Adds the bundle if it is already alive.
    ///
    /// # Panics
    ///
    /// Panics on [`Entity::NULL`].
    pub fn spawn_at<B: ComponentSet>(&mut self, entity: Entity, components: B) -> Entity {
        assert!(!entity.is_null(), "cannot spawn the null entity");
        self.issuer.reserve(entity);
        if !self.alive.contains(entity) {
            self.insert_record(entity);
            trace!(%entity, "entity created with explicit id");
        }
        components.attach(self, entity);
        entity
    }

    /// Create a new entity holding a copy of every component of `entity`.
    pub fn copy(&mut self, entity: Entity) -> Option<Entity> {
        let slot = self.alive.index_of(entity)?;
        let components: Vec<ComponentId> = self.records[slot].iter().copied().collect();

        let copy = self.create();
        let copy_slot = self.records.len() - 1;
        for id in components {
            if let Some(store) = self.stores.get_mut(&id) {
                if store.copy(entity, copy) {
                    self.records[copy_slot].insert(id);
                }
            }
        }

        trace!(source = %entity, %copy, "entity copied");
        Some(copy)
    }

    /// Destroy an entity and remove all its components
    pub fn destroy(&mut self, entity: Entity) -> bool {
        let Some(slot) = self.alive.remove(entity) else {
            return false;
        };
        let components = self.records.swap_remove(slot);

        for id in components {
            if let Some(store) = self.stores.get_mut(&id) {
                store.remove(entity);
            }
            self.evict_if_empty(id);
        }

        trace!(%entity, "entity destroyed");
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.alive.contains(entity)
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.alive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alive.is_empty()
    }

    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.alive.iter()
    }

    /// Add a component to an entity.
    ///
    /// Returns `false` without touching anything when the entity is dead or
    /// already has a component of this type.
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) -> bool {
        let Some(slot) = self.alive.index_of(entity) else {
            trace!(%entity, "ignoring component for dead entity");
            return false;
        };

        let id = ComponentId::of::<T>();
        let attached = self
            .stores
            .entry(id)
            .or_insert_with(|| Box::new(TypedComponentStore::<T>::new()))
            .as_any_mut()
            .downcast_mut::<TypedComponentStore<T>>()
            .expect("Internal registry error. Store registered under a foreign component id.")
            .insert(entity, component);

        if attached {
            self.records[slot].insert(id);
        }
        attached
    }

    /// Add every component of a bundle, returning how many were newly attached
    pub fn add_components<B: ComponentSet>(&mut self, entity: Entity, components: B) -> usize {
        components.attach(self, entity)
    }

    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> bool {
        self.remove_component_by_id(entity, ComponentId::of::<T>())
    }

    /// Detach the component with tag `id` from `entity`.
    ///
    /// The tag leaves the entity's set even if no store exists for it.
    pub fn remove_component_by_id(&mut self, entity: Entity, id: ComponentId) -> bool {
        let Some(slot) = self.alive.index_of(entity) else {
            return false;
        };
        if !self.records[slot].remove(&id) {
            return false;
        }

        if let Some(store) = self.stores.get_mut(&id) {
            store.remove(entity);
        }
        self.evict_if_empty(id);
        true
    }

    /// Remove each component of the set from `entity`, returning how many were present
    pub fn remove_components<S: ComponentSet>(&mut self, entity: Entity) -> usize {
        S::component_ids()
            .into_iter()
            .filter(|&id| self.remove_component_by_id(entity, id))
            .count()
    }

    /// Remove a component type from every entity holding it
    pub fn remove_component_everywhere<T: Component>(&mut self) -> usize {
        self.remove_component_everywhere_by_id(ComponentId::of::<T>())
    }

    /// Remove every component type of the set from all entities, returning
    /// how many components were detached in total
    pub fn remove_components_everywhere<S: ComponentSet>(&mut self) -> usize {
        S::component_ids()
            .into_iter()
            .map(|id| self.remove_component_everywhere_by_id(id))
            .sum()
    }

    pub fn remove_component_everywhere_by_id(&mut self, id: ComponentId) -> usize {
        let Some(store) = self.stores.get(&id) else {
            return 0;
        };

        let holders = store.entities().to_vec();
        for &entity in &holders {
            self.remove_component_by_id(entity, id);
        }
        holders.len()
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.has_component_id(entity, ComponentId::of::<T>())
    }

    pub fn has_component_id(&self, entity: Entity, id: ComponentId) -> bool {
        self.record(entity).is_some_and(|record| record.contains(&id))
    }

    /// Whether `entity` has every component of the set
    pub fn has_components<S: ComponentSet>(&self, entity: Entity) -> bool {
        self.record(entity).is_some_and(|record| {
            S::component_ids().iter().all(|id| record.contains(id))
        })
    }

    /// Whether any entity at all holds a `T`
    pub fn any_has<T: Component>(&self) -> bool {
        self.stores
            .get(&ComponentId::of::<T>())
            .is_some_and(|store| !store.is_empty())
    }

    /// Whether every component type of the set is held by at least one
    /// entity. The holders need not be the same entity.
    pub fn any_has_each<S: ComponentSet>(&self) -> bool {
        S::component_ids().iter().all(|id| {
            self.stores
                .get(id)
                .is_some_and(|store| !store.is_empty())
        })
    }

    pub fn component_ids(&self, entity: Entity) -> Option<impl Iterator<Item = ComponentId> + '_> {
        self.record(entity).map(|record| record.iter().copied())
    }

    pub fn store<T: Component>(&self) -> Option<&TypedComponentStore<T>> {
        self.stores
            .get(&ComponentId::of::<T>())?
            .as_any()
            .downcast_ref::<TypedComponentStore<T>>()
    }

    pub fn store_mut<T: Component>(&mut self) -> Option<&mut TypedComponentStore<T>> {
        self.stores
            .get_mut(&ComponentId::of::<T>())?
            .as_any_mut()
            .downcast_mut::<TypedComponentStore<T>>()
    }

    /// Number of component stores currently allocated
    pub fn store_count(&self) -> usize {
        self.stores.len()
    }

    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.store::<T>()?.get(entity)
    }

    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.store_mut::<T>()?.get_mut(entity)
    }

    /// The first stored `T`, for components used as singletons
    pub fn first<T: Component>(&self) -> Option<&T> {
        self.store::<T>()?.first()
    }

    pub fn first_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.store_mut::<T>()?.first_mut()
    }

    /// Skip entities holding `T` in queries that do not name `T` themselves.
    pub fn exclude<T: Component>(&mut self) {
        self.excluded.insert(ComponentId::of::<T>());
    }

    pub fn include<T: Component>(&mut self) {
        self.excluded.remove(&ComponentId::of::<T>());
    }

    /// Lazily walk the entities holding every component of `S`.
    ///
    /// The walk is driven by the smallest participating store. Mutating the
    /// registry invalidates the iterator, which the borrow checker enforces.
    pub fn entities_with<S: ComponentSet>(&self) -> impl Iterator<Item = Entity> + '_ {
        let ids = S::component_ids();
        let driver = self.driver_for(&ids);
        driver
            .iter()
            .copied()
            .filter(move |&entity| self.matches(entity, &ids))
    }

    pub fn first_entity_with<S: ComponentSet>(&self) -> Option<Entity> {
        self.entities_with::<S>().next()
    }

    pub fn query_with_values<S: ComponentSet>(
        &self,
    ) -> impl Iterator<Item = (Entity, S::Refs<'_>)> + '_ {
        self.entities_with::<S>()
            .filter_map(move |entity| S::fetch(self, entity).map(|refs| (entity, refs)))
    }

    pub fn for_each_mut<S, F>(&mut self, f: F)
    where
        S: ComponentSet,
        F: FnMut(Entity, S::Muts<'_>),
    {
        S::for_each_mut(self, f);
    }

    /// Drop every entity and store, and restart the id issuer.
    pub fn clear(&mut self) {
        self.alive.clear();
        self.records.clear();
        self.stores.clear();
        self.issuer.reset();
    }

    pub(crate) fn detach_store(&mut self, id: ComponentId) -> Box<dyn ComponentStore> {
        self.stores
            .remove(&id)
            .expect("Internal registry error. Matched entity without a backing store.")
    }

    pub(crate) fn attach_store(&mut self, store: Box<dyn ComponentStore>) {
        self.stores.insert(store.component_id(), store);
    }

    fn insert_record(&mut self, entity: Entity) {
        self.alive.insert(entity);
        self.records.push(HashSet::new());
    }

    fn record(&self, entity: Entity) -> Option<&HashSet<ComponentId>> {
        self.alive.index_of(entity).map(|slot| &self.records[slot])
    }

    fn driver_for(&self, ids: &[ComponentId]) -> &[Entity] {
        if ids.is_empty() {
            return self.alive.as_slice();
        }
        ids.iter()
            .map(|id| self.stores.get(id).map_or(&[][..], |store| store.entities()))
            .min_by_key(|entities| entities.len())
            .unwrap_or(&[])
    }

    fn matches(&self, entity: Entity, ids: &[ComponentId]) -> bool {
        let Some(record) = self.record(entity) else {
            return false;
        };
        if !ids.iter().all(|id| record.contains(id)) {
            return false;
        }
        // the unfiltered walk over all entities ignores exclusions
        ids.is_empty()
            || !record
                .iter()
                .any(|id| self.excluded.contains(id) && !ids.contains(id))
    }

    fn evict_if_empty(&mut self, id: ComponentId) {
        if !self.evict_empty_stores {
            return;
        }
        if self.stores.get(&id).is_some_and(|store| store.is_empty()) {
            self.stores.remove(&id);
            trace!(component = %id, "evicted empty component store");
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
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

    #[derive(Debug, Clone, PartialEq)]
    struct Velocity {
        dx: f32,
        dy: f32,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Hidden;

    #[test]
    fn test_registry_entity_lifecycle() {
        let mut registry = Registry::new();

        let e1 = registry.create();
        let e2 = registry.create();

        assert!(registry.is_alive(e1));
        assert!(registry.is_alive(e2));
        assert_eq!(registry.len(), 2);

        assert!(registry.destroy(e1));
        assert!(!registry.is_alive(e1));
        assert!(registry.is_alive(e2));
        assert_eq!(registry.len(), 1);

        assert!(!registry.destroy(e1));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_components() {
        let mut registry = Registry::new();

        let entity = registry.create();
        registry.add_component(entity, Position { x: 1.0, y: 2.0 });
        registry.add_component(entity, Velocity { dx: 0.5, dy: 0.5 });

        assert!(registry.has_component::<Position>(entity));
        assert!(registry.has_component::<Velocity>(entity));
        assert!(registry.has_components::<(Position, Velocity)>(entity));

        let pos = registry.get::<Position>(entity).unwrap();
        assert_eq!(pos.x, 1.0);

        if let Some(vel) = registry.get_mut::<Velocity>(entity) {
            vel.dx = 1.0;
        }

        let vel = registry.get::<Velocity>(entity).unwrap();
        assert_eq!(vel.dx, 1.0);
    }

    #[test]
    fn test_add_component_keeps_first_value() {
        let mut registry = Registry::new();
        let entity = registry.spawn((Position { x: 1.0, y: 1.0 },));

        assert!(!registry.add_component(entity, Position { x: 2.0, y: 2.0 }));
        assert_eq!(registry.get::<Position>(entity).unwrap().x, 1.0);
    }

    #[test]
    fn test_add_component_to_dead_entity_is_ignored() {
        let mut registry = Registry::new();
        let entity = registry.create();
        registry.destroy(entity);

        assert!(!registry.add_component(entity, Hidden));
        assert!(!registry.any_has::<Hidden>());
        assert!(!registry.add_component(Entity::NULL, Hidden));
    }

    #[test]
    fn test_remove_component() {
        let mut registry = Registry::new();
        let entity = registry.spawn((Position { x: 0.0, y: 0.0 }, Hidden));

        assert!(registry.remove_component::<Hidden>(entity));
        assert!(!registry.has_component::<Hidden>(entity));
        assert!(registry.has_component::<Position>(entity));

        assert!(!registry.remove_component::<Hidden>(entity));
        assert!(!registry.remove_component::<Velocity>(entity));
    }

    #[test]
    fn test_destroy_removes_from_stores() {
        let mut registry = Registry::new();
        let a = registry.spawn((Position { x: 1.0, y: 0.0 },));
        let b = registry.spawn((Position { x: 2.0, y: 0.0 },));

        registry.destroy(a);

        let store = registry.store::<Position>().unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(b).unwrap().x, 2.0);
        assert!(store.get(a).is_none());
    }

    #[test]
    fn test_copy_entity() {
        let mut registry = Registry::new();
        let source = registry.spawn((Position { x: 1.0, y: 2.0 }, Hidden));

        let copy = registry.copy(source).unwrap();
        assert_ne!(copy, source);
        assert!(registry.has_components::<(Position, Hidden)>(copy));

        registry.get_mut::<Position>(copy).unwrap().x = 10.0;
        assert_eq!(registry.get::<Position>(source).unwrap().x, 1.0);

        registry.destroy(source);
        assert!(registry.copy(source).is_none());
    }

    #[test]
    fn test_spawn_at_reserves_id() {
        let mut registry = Registry::new();
        let fixed = registry.spawn_at(Entity::from_raw(50), (Hidden,));

        assert!(registry.is_alive(fixed));
        assert!(registry.has_component::<Hidden>(fixed));
        assert_eq!(registry.create().id(), 51);

        // spawning onto a live entity only adds components
        registry.spawn_at(fixed, (Position { x: 0.0, y: 0.0 },));
        assert_eq!(registry.len(), 2);
        assert!(registry.has_components::<(Hidden, Position)>(fixed));
    }

    #[test]
    fn test_remove_component_everywhere() {
        let mut registry = Registry::new();
        let a = registry.spawn((Hidden, Position { x: 0.0, y: 0.0 }));
        let b = registry.spawn((Hidden,));
        let c = registry.spawn((Position { x: 0.0, y: 0.0 },));

        assert_eq!(registry.remove_component_everywhere::<Hidden>(), 2);
        assert!(!registry.any_has::<Hidden>());
        assert!(!registry.has_component::<Hidden>(a));
        assert!(!registry.has_component::<Hidden>(b));
        assert!(registry.has_component::<Position>(c));
        assert_eq!(registry.remove_component_everywhere::<Velocity>(), 0);
    }

    #[test]
    fn test_set_wide_removal_and_presence() {
        let mut registry = Registry::new();
        let a = registry.spawn((Hidden, Position { x: 0.0, y: 0.0 }));
        registry.spawn((Velocity { dx: 0.0, dy: 0.0 },));

        // holders of different types count
        assert!(registry.any_has_each::<(Hidden, Velocity)>());
        assert!(registry.any_has_each::<()>());

        assert_eq!(registry.remove_components_everywhere::<(Hidden, Velocity)>(), 2);
        assert!(!registry.any_has_each::<(Hidden, Position)>());
        assert!(registry.any_has_each::<(Position,)>());
        assert!(registry.has_component::<Position>(a));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_spawn_at_large_id() {
        let mut registry = Registry::new();
        let far = registry.spawn_at(Entity::from_raw(50_000_000), (Hidden,));

        assert_eq!(registry.create().id(), 50_000_001);
        assert!(registry.has_component::<Hidden>(far));
        assert!(registry.destroy(far));
        assert!(!registry.any_has::<Hidden>());
    }

    #[test]
    fn test_entities_with_filters_by_components() {
        let mut registry = Registry::new();
        let moving = registry.spawn((Position { x: 0.0, y: 0.0 }, Velocity { dx: 1.0, dy: 0.0 }));
        let still = registry.spawn((Position { x: 0.0, y: 0.0 },));

        let with_position: Vec<_> = registry.entities_with::<(Position,)>().collect();
        assert_eq!(with_position, vec![moving, still]);

        let with_both: Vec<_> = registry.entities_with::<(Position, Velocity)>().collect();
        assert_eq!(with_both, vec![moving]);

        assert_eq!(registry.first_entity_with::<(Velocity,)>(), Some(moving));
        assert_eq!(registry.first_entity_with::<(Hidden,)>(), None);
        assert_eq!(registry.entities_with::<()>().count(), 2);
    }

    #[test]
    fn test_query_with_values() {
        let mut registry = Registry::new();
        let entity = registry.spawn((Position { x: 3.0, y: 4.0 }, Velocity { dx: 1.0, dy: 1.0 }));
        registry.spawn((Velocity { dx: 0.0, dy: 0.0 },));

        let rows: Vec<_> = registry.query_with_values::<(Position, Velocity)>().collect();
        assert_eq!(rows.len(), 1);
        let (found, (pos, vel)) = rows[0];
        assert_eq!(found, entity);
        assert_eq!(pos.y, 4.0);
        assert_eq!(vel.dx, 1.0);
    }

    #[test]
    fn test_excluded_components_hide_entities() {
        let mut registry = Registry::new();
        let visible = registry.spawn((Position { x: 0.0, y: 0.0 },));
        let hidden = registry.spawn((Position { x: 0.0, y: 0.0 }, Hidden));

        registry.exclude::<Hidden>();
        assert_eq!(registry.entities_with::<(Position,)>().collect::<Vec<_>>(), vec![visible]);
        // naming the excluded type explicitly brings the entity back
        assert_eq!(registry.first_entity_with::<(Position, Hidden)>(), Some(hidden));
        assert_eq!(registry.entities_with::<()>().count(), 2);

        registry.include::<Hidden>();
        assert_eq!(registry.entities_with::<(Position,)>().count(), 2);
    }

    #[test]
    fn test_empty_stores_are_retained_by_default() {
        let mut registry = Registry::new();
        let entity = registry.spawn((Hidden,));
        registry.remove_component::<Hidden>(entity);

        assert_eq!(registry.store_count(), 1);
        assert!(!registry.any_has::<Hidden>());
    }

    #[test]
    fn test_empty_stores_are_evicted_when_configured() {
        let config = WorldConfig {
            evict_empty_stores: true,
            ..WorldConfig::default()
        };
        let mut registry = Registry::with_config(&config);
        let a = registry.spawn((Hidden,));
        let b = registry.spawn((Hidden, Position { x: 0.0, y: 0.0 }));

        registry.remove_component::<Hidden>(a);
        assert_eq!(registry.store_count(), 2);

        registry.destroy(b);
        assert_eq!(registry.store_count(), 0);
    }

    #[test]
    fn test_clear_resets_issuer() {
        let mut registry = Registry::new();
        let first = registry.spawn((Hidden,));
        registry.create();

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.store_count(), 0);
        assert_eq!(registry.create(), first);
    }
}
