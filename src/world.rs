//! World - the single ECS instance and its per-tick entry point

use std::any::type_name;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::WorldConfig;
use crate::ecs::{Component, ComponentSet, Entity, Registry};
use crate::error::{EcsError, EcsResult};
use crate::event::{Events, PulseQueue};
use crate::resource::Resources;
use crate::scheduler::{Scheduler, System, SystemSet, SystemState};
use crate::tag::SystemId;

type Deferred = Box<dyn FnOnce(&mut World)>;

/// Statistics for a single update
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub tick: u64,
    pub systems_run: usize,
    pub systems_failed: usize,
    pub pulses_attached: usize,
    pub pulses_retired: usize,
    pub deferred_run: usize,
    pub duration: Duration,
}

/// Entities, components, resources, events and systems.
///
/// Everything happens on the caller's thread. Structural changes requested
/// while iterating go through [`attach_pulse`](Self::attach_pulse) or
/// [`defer`](Self::defer).
pub struct World {
    registry: Registry,
    resources: Resources,
    events: Events,
    pulses: PulseQueue,
    scheduler: Scheduler,
    deferred: Vec<Deferred>,
    tick: u64,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(&WorldConfig::default())
    }

    pub fn with_config(config: &WorldConfig) -> Self {
        Self {
            registry: Registry::with_config(config),
            resources: Resources::new(),
            events: Events::new(),
            pulses: PulseQueue::new(),
            scheduler: Scheduler::new(),
            deferred: Vec::new(),
            tick: 0,
        }
    }

    // ---- entities ----

    pub fn create_entity(&mut self) -> Entity {
        self.registry.create()
    }

    pub fn spawn<B: ComponentSet>(&mut self, components: B) -> Entity {
        self.registry.spawn(components)
    }

    pub fn spawn_at<B: ComponentSet>(&mut self, entity: Entity, components: B) -> Entity {
        self.registry.spawn_at(entity, components)
    }

    pub fn copy_entity(&mut self, entity: Entity) -> Option<Entity> {
        self.registry.copy(entity)
    }

    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        self.registry.destroy(entity)
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.registry.is_alive(entity)
    }

    /// Number of live entities
    pub fn count(&self) -> usize {
        self.registry.len()
    }

    // ---- components ----

    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) -> bool {
        self.registry.add_component(entity, component)
    }

    pub fn add_components<B: ComponentSet>(&mut self, entity: Entity, components: B) -> usize {
        self.registry.add_components(entity, components)
    }

    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> bool {
        self.registry.remove_component::<T>(entity)
    }

    pub fn remove_components<S: ComponentSet>(&mut self, entity: Entity) -> usize {
        self.registry.remove_components::<S>(entity)
    }

    pub fn remove_component_everywhere<T: Component>(&mut self) -> usize {
        self.registry.remove_component_everywhere::<T>()
    }

    pub fn remove_components_everywhere<S: ComponentSet>(&mut self) -> usize {
        self.registry.remove_components_everywhere::<S>()
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.registry.has_component::<T>(entity)
    }

    pub fn has_components<S: ComponentSet>(&self, entity: Entity) -> bool {
        self.registry.has_components::<S>(entity)
    }

    pub fn any_has<T: Component>(&self) -> bool {
        self.registry.any_has::<T>()
    }

    /// Whether each component type of `S` is held by some entity
    pub fn any_has_each<S: ComponentSet>(&self) -> bool {
        self.registry.any_has_each::<S>()
    }

    /// # Panics
    ///
    /// Panics if the entity is dead or lacks a `T`.
    #[track_caller]
    pub fn component<T: Component>(&self, entity: Entity) -> &T {
        match self.try_component(entity) {
            Ok(component) => component,
            Err(err) => panic!("{err}"),
        }
    }

    #[track_caller]
    pub fn component_mut<T: Component>(&mut self, entity: Entity) -> &mut T {
        match self.try_component_mut(entity) {
            Ok(component) => component,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_component<T: Component>(&self, entity: Entity) -> EcsResult<&T> {
        if !self.registry.is_alive(entity) {
            return Err(EcsError::DeadEntity(entity));
        }
        self.registry
            .get::<T>(entity)
            .ok_or_else(|| missing_component::<T>(entity))
    }

    pub fn try_component_mut<T: Component>(&mut self, entity: Entity) -> EcsResult<&mut T> {
        if !self.registry.is_alive(entity) {
            return Err(EcsError::DeadEntity(entity));
        }
        self.registry
            .get_mut::<T>(entity)
            .ok_or_else(|| missing_component::<T>(entity))
    }

    /// The first stored `T`, for components only one entity carries.
    ///
    /// # Panics
    ///
    /// Panics if no entity holds a `T`.
    #[track_caller]
    pub fn singleton<T: Component>(&self) -> &T {
        match self.try_singleton() {
            Ok(component) => component,
            Err(err) => panic!("{err}"),
        }
    }

    #[track_caller]
    pub fn singleton_mut<T: Component>(&mut self) -> &mut T {
        match self.registry.first_mut::<T>() {
            Some(component) => component,
            None => panic!("{}", EcsError::EmptyStore(type_name::<T>())),
        }
    }

    pub fn try_singleton<T: Component>(&self) -> EcsResult<&T> {
        self.registry
            .first::<T>()
            .ok_or(EcsError::EmptyStore(type_name::<T>()))
    }

    /// Entities holding every component of `S`
    pub fn query<S: ComponentSet>(&self) -> impl Iterator<Item = Entity> + '_ {
        self.registry.entities_with::<S>()
    }

    pub fn first_entity_with<S: ComponentSet>(&self) -> Option<Entity> {
        self.registry.first_entity_with::<S>()
    }

    pub fn query_with_values<S: ComponentSet>(
        &self,
    ) -> impl Iterator<Item = (Entity, S::Refs<'_>)> + '_ {
        self.registry.query_with_values::<S>()
    }

    pub fn for_each_mut<S, F>(&mut self, f: F)
    where
        S: ComponentSet,
        F: FnMut(Entity, S::Muts<'_>),
    {
        self.registry.for_each_mut::<S, F>(f);
    }

    pub fn exclude<T: Component>(&mut self) {
        self.registry.exclude::<T>();
    }

    pub fn include<T: Component>(&mut self) {
        self.registry.include::<T>();
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    // ---- systems ----

    pub fn register_system<S: System>(&mut self, system: S) -> SystemId {
        self.scheduler.register(system)
    }

    pub fn register<S: System + Default>(&mut self) -> SystemId {
        self.scheduler.register(S::default())
    }

    /// Register a tuple of systems in tuple order.
    pub fn register_systems<S: SystemSet>(&mut self, systems: S) -> Vec<SystemId> {
        systems.register_into(&mut self.scheduler)
    }

    pub fn register_all<S: SystemSet + Default>(&mut self) -> Vec<SystemId> {
        self.register_systems(S::default())
    }

    /// Unregister every system of the set, returning how many were registered
    pub fn unregister_systems<S: SystemSet>(&mut self) -> usize {
        S::system_ids()
            .into_iter()
            .filter(|&id| self.unregister_id(id))
            .count()
    }

    pub fn pause_systems<S: SystemSet>(&mut self) -> usize {
        S::system_ids()
            .into_iter()
            .filter(|&id| self.pause_id(id))
            .count()
    }

    pub fn resume_systems<S: SystemSet>(&mut self) -> usize {
        S::system_ids()
            .into_iter()
            .filter(|&id| self.resume_id(id))
            .count()
    }

    pub fn unregister<S: System>(&mut self) -> bool {
        self.unregister_id(SystemId::of::<S>())
    }

    pub fn unregister_id(&mut self, id: SystemId) -> bool {
        self.scheduler.unregister_id(id)
    }

    pub fn pause<S: System>(&mut self) -> bool {
        self.pause_id(SystemId::of::<S>())
    }

    pub fn pause_id(&mut self, id: SystemId) -> bool {
        self.scheduler.pause_id(id)
    }

    pub fn resume<S: System>(&mut self) -> bool {
        self.resume_id(SystemId::of::<S>())
    }

    pub fn resume_id(&mut self, id: SystemId) -> bool {
        self.scheduler.resume_id(id)
    }

    pub fn system_state<S: System>(&self) -> Option<SystemState> {
        self.system_state_id(SystemId::of::<S>())
    }

    pub fn system_state_id(&self, id: SystemId) -> Option<SystemState> {
        self.scheduler.state(id)
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    // ---- resources ----

    /// Store a resource. Does nothing if one of this type is already set.
    pub fn set_resource<T: 'static>(&mut self, value: T) -> bool {
        self.resources.insert(value)
    }

    /// # Panics
    ///
    /// Panics if no `T` resource is set.
    #[track_caller]
    pub fn resource<T: 'static>(&self) -> &T {
        match self.try_resource() {
            Ok(resource) => resource,
            Err(err) => panic!("{err}"),
        }
    }

    #[track_caller]
    pub fn resource_mut<T: 'static>(&mut self) -> &mut T {
        match self.try_resource_mut() {
            Ok(resource) => resource,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_resource<T: 'static>(&self) -> EcsResult<&T> {
        self.resources
            .get::<T>()
            .ok_or(EcsError::MissingResource(type_name::<T>()))
    }

    pub fn try_resource_mut<T: 'static>(&mut self) -> EcsResult<&mut T> {
        self.resources
            .get_mut::<T>()
            .ok_or(EcsError::MissingResource(type_name::<T>()))
    }

    pub fn has_resource<T: 'static>(&self) -> bool {
        self.resources.contains::<T>()
    }

    pub fn unset_resource<T: 'static>(&mut self) -> Option<T> {
        self.resources.remove::<T>()
    }

    // ---- events and pulses ----

    pub fn raise<T: 'static>(&mut self, event: T) {
        self.events.raise(event);
    }

    pub fn raise_from<T: 'static, A: Into<T>>(&mut self, args: A) {
        self.events.raise_from::<T, A>(args);
    }

    pub fn has_pending<T: 'static>(&self) -> bool {
        self.events.has_pending::<T>()
    }

    pub fn has_visible<T: 'static>(&self) -> bool {
        self.events.has_visible::<T>()
    }

    /// Events of type `T` raised during the previous tick
    pub fn visible<T: 'static>(&self) -> &[T] {
        self.events.visible::<T>()
    }

    /// Attach `component` to `entity` for one tick, starting with the next update.
    pub fn attach_pulse<T: Component>(&mut self, entity: Entity, component: T) {
        self.pulses.queue(entity, component);
    }

    pub fn is_pulse_queued<T: Component>(&self, entity: Entity) -> bool {
        self.pulses.is_queued::<T>(entity)
    }

    /// Run `f` at the start of the next update, before any system.
    ///
    /// [`reset_entities`](Self::reset_entities) and [`reset_all`](Self::reset_all)
    /// discard calls that have not run yet.
    pub fn defer<F>(&mut self, f: F)
    where
        F: FnOnce(&mut World) + 'static,
    {
        self.deferred.push(Box::new(f));
    }

    // ---- lifecycle ----

    /// Advance the world by one tick.
    pub fn update(&mut self) -> TickReport {
        let started = Instant::now();
        self.tick += 1;

        let pulses_retired = self.pulses.retire(&mut self.registry);
        self.events.swap_buffers();
        let pulses_attached = self.pulses.realize(&mut self.registry);

        let deferred = std::mem::take(&mut self.deferred);
        let deferred_run = deferred.len();
        for f in deferred {
            f(self);
        }

        let mut systems_run = 0;
        let mut systems_failed = 0;
        for id in self.scheduler.snapshot() {
            // paused or removed by an earlier system of this tick
            let Some(mut system) = self.scheduler.check_out(id) else {
                continue;
            };
            systems_run += 1;
            if let Err(err) = system.run(self) {
                systems_failed += 1;
                warn!(system = %system.name(), tick = self.tick, error = %format!("{err:#}"), "system failed");
            }
            self.scheduler.check_in(id, system);
        }

        let report = TickReport {
            tick: self.tick,
            systems_run,
            systems_failed,
            pulses_attached,
            pulses_retired,
            deferred_run,
            duration: started.elapsed(),
        };
        debug!(
            tick = report.tick,
            systems = report.systems_run,
            failed = report.systems_failed,
            entities = self.registry.len(),
            "tick complete"
        );
        report
    }

    /// Number of updates run so far
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Drop every entity, restart id issuing and forget pulses and deferred
    /// calls, which may hold handles that are about to be issued again.
    pub fn reset_entities(&mut self) {
        self.registry.clear();
        self.pulses.clear();
        self.deferred.clear();
        info!("entities reset");
    }

    pub fn reset_systems(&mut self) {
        self.scheduler.clear();
        info!("systems reset");
    }

    /// Drop all events and queued pulses. Pulse components attached by the
    /// last update are detached right away.
    pub fn reset_events(&mut self) {
        self.events.clear();
        self.pulses.retire(&mut self.registry);
        self.pulses.clear();
        info!("events reset");
    }

    pub fn reset_resources(&mut self) {
        self.resources.clear();
        info!("resources reset");
    }

    /// Return to the state of a freshly built world.
    pub fn reset_all(&mut self) {
        self.registry.clear();
        self.scheduler.clear();
        self.events.clear();
        self.pulses.clear();
        self.resources.clear();
        self.deferred.clear();
        self.tick = 0;
        info!("world reset");
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

fn missing_component<T>(entity: Entity) -> EcsError {
    EcsError::MissingComponent {
        entity,
        component: type_name::<T>(),
    }
}
