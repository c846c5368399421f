//! Component sets.
//!
//! A tuple of component types serves two purposes: as a bundle of values
//! handed to `spawn`/`add_components`, and as a filter for queries. The unit
//! type `()` is the empty set and matches every live entity.

use std::collections::HashSet;

use super::{Component, ComponentStore, Entity, Registry, TypedComponentStore};
use crate::tag::ComponentId;

const MESSAGE_DUPLICATE_COMPONENT_TYPE: &str =
    "Component types must be different when mutably querying more than one component type";

/// A tuple of distinct component types.
///
/// # Examples
/// ```
/// use tessera::World;
///
/// #[derive(Clone)]
/// struct Name(&'static str);
/// #[derive(Clone)]
/// struct Health(i32);
///
/// let mut world = World::new();
/// world.spawn((Name("player"), Health(100)));
/// world.spawn((Name("rock"),));
///
/// let alive: Vec<_> = world.query::<(Name, Health)>().collect();
/// assert_eq!(alive.len(), 1);
///
/// world.for_each_mut::<(Health,), _>(|_, (health,)| health.0 -= 10);
/// for (_, (name, health)) in world.query_with_values::<(Name, Health)>() {
///     assert_eq!(name.0, "player");
///     assert_eq!(health.0, 90);
/// }
/// ```
pub trait ComponentSet: Sized + 'static {
    type Refs<'a>;
    type Muts<'a>;

    fn component_ids() -> Vec<ComponentId>;

    /// Attach every value to `entity` and return how many were newly attached.
    fn attach(self, registry: &mut Registry, entity: Entity) -> usize;

    fn fetch(registry: &Registry, entity: Entity) -> Option<Self::Refs<'_>>;

    /// Visit every matching entity with mutable access to its components.
    ///
    /// The participating stores are detached from the registry for the
    /// duration of the walk.
    ///
    /// # Panics
    ///
    /// Panics if the set names the same component type twice.
    fn for_each_mut<F>(registry: &mut Registry, f: F)
    where
        F: FnMut(Entity, Self::Muts<'_>);
}

impl ComponentSet for () {
    type Refs<'a> = ();
    type Muts<'a> = ();

    fn component_ids() -> Vec<ComponentId> {
        Vec::new()
    }

    fn attach(self, _registry: &mut Registry, _entity: Entity) -> usize {
        0
    }

    fn fetch(registry: &Registry, entity: Entity) -> Option<Self::Refs<'_>> {
        registry.is_alive(entity).then_some(())
    }

    fn for_each_mut<F>(registry: &mut Registry, mut f: F)
    where
        F: FnMut(Entity, Self::Muts<'_>),
    {
        let entities: Vec<Entity> = registry.entities().collect();
        for entity in entities {
            f(entity, ());
        }
    }
}

macro_rules! impl_component_set {
    ($(($ty:ident, $var:ident)),+) => {
        impl<$($ty: Component),+> ComponentSet for ($($ty,)+) {
            type Refs<'a> = ($(&'a $ty,)+);
            type Muts<'a> = ($(&'a mut $ty,)+);

            fn component_ids() -> Vec<ComponentId> {
                vec![$(ComponentId::of::<$ty>()),+]
            }

            fn attach(self, registry: &mut Registry, entity: Entity) -> usize {
                let ($($var,)+) = self;
                0 $(+ usize::from(registry.add_component(entity, $var)))+
            }

            fn fetch(registry: &Registry, entity: Entity) -> Option<Self::Refs<'_>> {
                Some(($(registry.get::<$ty>(entity)?,)+))
            }

            fn for_each_mut<F>(registry: &mut Registry, mut f: F)
            where
                F: FnMut(Entity, Self::Muts<'_>),
            {
                let ids = Self::component_ids();
                assert_distinct(&ids);

                let entities: Vec<Entity> = registry.entities_with::<Self>().collect();
                if entities.is_empty() {
                    return;
                }

                // we detach the stores in order to hand out disjoint mutable borrows
                let mut detached = DetachedStores::new(registry, &ids);
                let mut stores = detached.stores.iter_mut();
                $(let $var = downcast_store::<$ty>(
                    stores.next().expect("Internal registry error. Detached fewer stores than requested."),
                );)+
                for entity in entities {
                    if let ($(Some($var),)+) = ($($var.get_mut(entity),)+) {
                        f(entity, ($($var,)+));
                    }
                }
            }
        }
    };
}

impl_component_set!((A, a));
impl_component_set!((A, a), (B, b));
impl_component_set!((A, a), (B, b), (C, c));
impl_component_set!((A, a), (B, b), (C, c), (D, d));
impl_component_set!((A, a), (B, b), (C, c), (D, d), (E, e));
impl_component_set!((A, a), (B, b), (C, c), (D, d), (E, e), (G, g));

/// Stores taken out of a registry for a mutable walk. Dropping the guard
/// puts them back, also when the walk unwinds.
struct DetachedStores<'r> {
    registry: &'r mut Registry,
    stores: Vec<Box<dyn ComponentStore>>,
}

impl<'r> DetachedStores<'r> {
    fn new(registry: &'r mut Registry, ids: &[ComponentId]) -> Self {
        let stores = ids.iter().map(|&id| registry.detach_store(id)).collect();
        Self { registry, stores }
    }
}

impl Drop for DetachedStores<'_> {
    fn drop(&mut self) {
        for store in self.stores.drain(..) {
            self.registry.attach_store(store);
        }
    }
}

fn assert_distinct(ids: &[ComponentId]) {
    assert_eq!(
        ids.iter().collect::<HashSet<_>>().len(),
        ids.len(),
        "{MESSAGE_DUPLICATE_COMPONENT_TYPE}"
    );
}

fn downcast_store<T: Component>(store: &mut Box<dyn ComponentStore>) -> &mut TypedComponentStore<T> {
    store
        .as_any_mut()
        .downcast_mut::<TypedComponentStore<T>>()
        .expect("Internal registry error. Store registered under a foreign component id.")
}
