use anyhow::Result;

use crate::scheduler::System;
use crate::systems::Health;
use crate::world::World;

/// Heals every fighter by a fixed amount each tick
pub struct RegenSystem {
    heal_per_tick: i32,
}

impl RegenSystem {
    pub fn new(heal_per_tick: i32) -> Self {
        Self { heal_per_tick }
    }
}

impl Default for RegenSystem {
    fn default() -> Self {
        Self::new(1)
    }
}

impl System for RegenSystem {
    fn name(&self) -> &str {
        "regen"
    }

    fn run(&mut self, world: &mut World) -> Result<()> {
        let heal = self.heal_per_tick;
        world.for_each_mut::<(Health,), _>(|_, (health,)| {
            // knocked out fighters wait for removal
            if health.0 > 0 {
                health.0 += heal;
            }
        });
        Ok(())
    }
}
