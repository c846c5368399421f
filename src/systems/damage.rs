use anyhow::Result;
use tracing::debug;

use crate::scheduler::System;
use crate::systems::{ArenaStats, DamageEvent, Health, Name, Stunned};
use crate::world::World;

/// Applies last tick's damage, stuns the targets and removes knocked out fighters.
#[derive(Default)]
pub struct DamageSystem;

impl DamageSystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for DamageSystem {
    fn name(&self) -> &str {
        "damage"
    }

    fn run(&mut self, world: &mut World) -> Result<()> {
        let hits = world.visible::<DamageEvent>().to_vec();
        let mut hits_landed = 0;
        let mut damage_dealt = 0;
        let mut knockouts = 0;

        for hit in hits {
            let Ok(health) = world.try_component_mut::<Health>(hit.target) else {
                continue;
            };
            if health.0 <= 0 {
                continue;
            }
            health.0 -= hit.amount;
            hits_landed += 1;
            damage_dealt += i64::from(hit.amount);

            if health.0 <= 0 {
                knockouts += 1;
                let name = world
                    .try_component::<Name>(hit.target)
                    .map(|name| name.0.clone())
                    .unwrap_or_default();
                debug!(fighter = %name, by = %hit.source, "knocked out");
                let target = hit.target;
                world.defer(move |world| {
                    world.destroy_entity(target);
                });
            } else {
                world.attach_pulse(hit.target, Stunned);
            }
        }

        if let Ok(stats) = world.try_resource_mut::<ArenaStats>() {
            stats.hits += hits_landed;
            stats.damage_dealt += damage_dealt;
            stats.knockouts += knockouts;
        }
        Ok(())
    }
}
