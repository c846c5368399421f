//! One-tick components
//!
//! A pulse attaches a component at the start of the next update and detaches
//! it again at the start of the update after that, so systems see it for
//! exactly one tick.

use tracing::debug;

use crate::ecs::{Component, Entity, Registry};
use crate::tag::ComponentId;

type Attach = Box<dyn FnOnce(&mut Registry, Entity) -> bool>;

struct PendingPulse {
    entity: Entity,
    component: ComponentId,
    attach: Attach,
}

#[derive(Default)]
pub struct PulseQueue {
    pending: Vec<PendingPulse>,
    /// Components attached by the last `realize`, detached by the next `retire`
    active: Vec<(Entity, ComponentId)>,
}

impl PulseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue<T: Component>(&mut self, entity: Entity, component: T) {
        self.pending.push(PendingPulse {
            entity,
            component: ComponentId::of::<T>(),
            attach: Box::new(move |registry: &mut Registry, entity: Entity| {
                registry.add_component(entity, component)
            }),
        });
    }

    pub fn is_queued<T: Component>(&self, entity: Entity) -> bool {
        let component = ComponentId::of::<T>();
        self.pending
            .iter()
            .any(|pulse| pulse.entity == entity && pulse.component == component)
    }

    /// Detach every component attached by the previous [`realize`](Self::realize).
    pub fn retire(&mut self, registry: &mut Registry) -> usize {
        let mut retired = 0;
        for (entity, component) in self.active.drain(..) {
            if registry.remove_component_by_id(entity, component) {
                retired += 1;
            }
        }
        retired
    }

    /// Attach every queued pulse and remember the ones that took effect.
    ///
    /// A pulse aimed at an entity that already holds the component does not
    /// replace it and is not retired later.
    pub fn realize(&mut self, registry: &mut Registry) -> usize {
        for pulse in std::mem::take(&mut self.pending) {
            if !registry.is_alive(pulse.entity) {
                debug!(entity = %pulse.entity, component = %pulse.component, "dropping pulse for dead entity");
                continue;
            }
            if (pulse.attach)(registry, pulse.entity) {
                self.active.push((pulse.entity, pulse.component));
            }
        }
        self.active.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.active.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Flash(u8);

    #[test]
    fn test_pulse_lifecycle() {
        let mut registry = Registry::new();
        let mut pulses = PulseQueue::new();
        let entity = registry.create();

        pulses.queue(entity, Flash(1));
        assert!(pulses.is_queued::<Flash>(entity));
        assert!(!registry.has_component::<Flash>(entity));

        assert_eq!(pulses.realize(&mut registry), 1);
        assert!(!pulses.is_queued::<Flash>(entity));
        assert_eq!(registry.get::<Flash>(entity), Some(&Flash(1)));

        assert_eq!(pulses.retire(&mut registry), 1);
        assert!(!registry.has_component::<Flash>(entity));
        assert_eq!(pulses.active_len(), 0);
    }

    #[test]
    fn test_pulse_on_dead_entity_is_dropped() {
        let mut registry = Registry::new();
        let mut pulses = PulseQueue::new();
        let entity = registry.create();

        pulses.queue(entity, Flash(1));
        registry.destroy(entity);

        assert_eq!(pulses.realize(&mut registry), 0);
        assert_eq!(pulses.pending_len(), 0);
        assert!(!registry.any_has::<Flash>());
    }

    #[test]
    fn test_pulse_keeps_existing_component() {
        let mut registry = Registry::new();
        let mut pulses = PulseQueue::new();
        let entity = registry.spawn((Flash(7),));

        pulses.queue(entity, Flash(1));
        assert_eq!(pulses.realize(&mut registry), 0);
        assert_eq!(pulses.retire(&mut registry), 0);

        assert_eq!(registry.get::<Flash>(entity), Some(&Flash(7)));
    }

    #[test]
    fn test_duplicate_pulses_attach_once() {
        let mut registry = Registry::new();
        let mut pulses = PulseQueue::new();
        let entity = registry.create();

        pulses.queue(entity, Flash(1));
        pulses.queue(entity, Flash(2));
        assert_eq!(pulses.pending_len(), 2);

        assert_eq!(pulses.realize(&mut registry), 1);
        assert_eq!(registry.get::<Flash>(entity), Some(&Flash(1)));
    }

    #[test]
    fn test_retire_tolerates_removed_component() {
        let mut registry = Registry::new();
        let mut pulses = PulseQueue::new();
        let entity = registry.create();

        pulses.queue(entity, Flash(1));
        pulses.realize(&mut registry);
        registry.destroy(entity);

        assert_eq!(pulses.retire(&mut registry), 0);
    }
}
