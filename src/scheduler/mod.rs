//! Scheduler - ordered systems with active/paused flags

use std::any::type_name;
use std::collections::HashMap;

use tracing::debug;

use crate::tag::SystemId;
use crate::world::World;

/// System trait - a unit of per-tick logic.
///
/// Any `FnMut(&mut World) -> anyhow::Result<()>` closure is a system too.
pub trait System: 'static {
    fn name(&self) -> &str {
        type_name::<Self>()
    }

    fn run(&mut self, world: &mut World) -> anyhow::Result<()>;
}

impl<F> System for F
where
    F: FnMut(&mut World) -> anyhow::Result<()> + 'static,
{
    fn run(&mut self, world: &mut World) -> anyhow::Result<()> {
        self(world)
    }
}

/// A tuple of system types, registered or toggled together.
///
/// Systems of a set are registered in tuple order.
pub trait SystemSet: 'static {
    fn system_ids() -> Vec<SystemId>;

    fn register_into(self, scheduler: &mut Scheduler) -> Vec<SystemId>;
}

macro_rules! impl_system_set {
    ($(($ty:ident, $var:ident)),+) => {
        impl<$($ty: System),+> SystemSet for ($($ty,)+) {
            fn system_ids() -> Vec<SystemId> {
                vec![$(SystemId::of::<$ty>()),+]
            }

            fn register_into(self, scheduler: &mut Scheduler) -> Vec<SystemId> {
                let ($($var,)+) = self;
                vec![$(scheduler.register($var)),+]
            }
        }
    };
}

impl_system_set!((A, a));
impl_system_set!((A, a), (B, b));
impl_system_set!((A, a), (B, b), (C, c));
impl_system_set!((A, a), (B, b), (C, c), (D, d));
impl_system_set!((A, a), (B, b), (C, c), (D, d), (E, e));
impl_system_set!((A, a), (B, b), (C, c), (D, d), (E, e), (G, g));
impl_system_set!((A, a), (B, b), (C, c), (D, d), (E, e), (G, g), (H, h));
impl_system_set!((A, a), (B, b), (C, c), (D, d), (E, e), (G, g), (H, h), (I, i));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemState {
    Active,
    Paused,
}

struct SystemRecord {
    /// `None` while the system is running
    system: Option<Box<dyn System>>,
    active: bool,
    name: String,
}

/// Keeps systems in registration order.
#[derive(Default)]
pub struct Scheduler {
    order: Vec<SystemId>,
    records: HashMap<SystemId, SystemRecord>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a system at the end of the order. Registering the same system
    /// type twice keeps the first one.
    pub fn register<S: System>(&mut self, system: S) -> SystemId {
        let id = SystemId::of::<S>();
        if self.records.contains_key(&id) {
            debug!(system = %id, "system already registered");
            return id;
        }

        let name = system.name().to_string();
        debug!(system = %name, "system registered");
        self.records.insert(
            id,
            SystemRecord {
                system: Some(Box::new(system)),
                active: true,
                name,
            },
        );
        self.order.push(id);
        id
    }

    pub fn unregister_id(&mut self, id: SystemId) -> bool {
        let Some(record) = self.records.remove(&id) else {
            return false;
        };
        self.order.retain(|&registered| registered != id);
        debug!(system = %record.name, "system unregistered");
        true
    }

    pub fn pause_id(&mut self, id: SystemId) -> bool {
        self.set_active(id, false)
    }

    pub fn resume_id(&mut self, id: SystemId) -> bool {
        self.set_active(id, true)
    }

    pub fn state(&self, id: SystemId) -> Option<SystemState> {
        self.records.get(&id).map(|record| {
            if record.active {
                SystemState::Active
            } else {
                SystemState::Paused
            }
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// System names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
            .map(|record| record.name.as_str())
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.records.clear();
    }

    /// The current registration order
    pub(crate) fn snapshot(&self) -> Vec<SystemId> {
        self.order.clone()
    }

    /// Take an active system out of its record so it can borrow the world.
    pub(crate) fn check_out(&mut self, id: SystemId) -> Option<Box<dyn System>> {
        let record = self.records.get_mut(&id)?;
        if !record.active {
            return None;
        }
        record.system.take()
    }

    /// Put a system back after it ran. If its record was removed or replaced
    /// in the meantime, the system is dropped.
    pub(crate) fn check_in(&mut self, id: SystemId, system: Box<dyn System>) {
        if let Some(record) = self.records.get_mut(&id) {
            if record.system.is_none() {
                record.system = Some(system);
            }
        }
    }

    fn set_active(&mut self, id: SystemId, active: bool) -> bool {
        let Some(record) = self.records.get_mut(&id) else {
            return false;
        };
        if record.active != active {
            record.active = active;
            debug!(system = %record.name, active, "system state changed");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        calls: u32,
    }

    impl System for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn run(&mut self, _world: &mut World) -> anyhow::Result<()> {
            self.calls += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct Idle;

    impl System for Idle {
        fn run(&mut self, _world: &mut World) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_register_keeps_order_and_ignores_duplicates() {
        let mut scheduler = Scheduler::new();
        let counter = scheduler.register(Counter::default());
        let idle = scheduler.register(Idle);

        assert_eq!(scheduler.register(Counter { calls: 9 }), counter);
        assert_eq!(scheduler.len(), 2);
        assert_eq!(scheduler.snapshot(), vec![counter, idle]);
        assert_eq!(scheduler.names().collect::<Vec<_>>()[0], "counter");
    }

    #[test]
    fn test_default_name_is_type_name() {
        let mut scheduler = Scheduler::new();
        scheduler.register(Idle);
        assert!(scheduler.names().next().unwrap().ends_with("Idle"));
    }

    #[test]
    fn test_pause_resume_state() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.register(Counter::default());
        assert_eq!(scheduler.state(id), Some(SystemState::Active));

        assert!(scheduler.pause_id(id));
        assert_eq!(scheduler.state(id), Some(SystemState::Paused));
        assert!(scheduler.check_out(id).is_none());

        assert!(scheduler.resume_id(id));
        assert_eq!(scheduler.state(id), Some(SystemState::Active));
    }

    #[test]
    fn test_system_set_registers_in_tuple_order() {
        let mut scheduler = Scheduler::new();
        let ids = (Idle, Counter::default()).register_into(&mut scheduler);

        assert_eq!(ids, <(Idle, Counter)>::system_ids());
        assert_eq!(scheduler.snapshot(), ids);
        // already registered members are kept
        assert_eq!((Counter { calls: 3 },).register_into(&mut scheduler), vec![ids[1]]);
        assert_eq!(scheduler.len(), 2);
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let mut scheduler = Scheduler::new();
        let id = SystemId::of::<Counter>();

        assert!(!scheduler.pause_id(id));
        assert!(!scheduler.resume_id(id));
        assert!(!scheduler.unregister_id(id));
        assert_eq!(scheduler.state(id), None);
    }

    #[test]
    fn test_reregister_appends_fresh_record() {
        let mut scheduler = Scheduler::new();
        let counter = scheduler.register(Counter::default());
        let idle = scheduler.register(Idle);
        scheduler.pause_id(counter);

        assert!(scheduler.unregister_id(counter));
        assert_eq!(scheduler.state(counter), None);

        scheduler.register(Counter::default());
        assert_eq!(scheduler.snapshot(), vec![idle, counter]);
        assert_eq!(scheduler.state(counter), Some(SystemState::Active));
    }

    #[test]
    fn test_check_in_after_unregister_drops_system() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.register(Counter::default());

        let system = scheduler.check_out(id).unwrap();
        assert!(scheduler.check_out(id).is_none());
        scheduler.unregister_id(id);
        scheduler.check_in(id, system);

        assert!(scheduler.is_empty());
        assert_eq!(scheduler.state(id), None);
    }
}
