use anyhow::{Context, Result};
use rand::Rng;

use crate::ecs::Entity;
use crate::scheduler::System;
use crate::systems::{ArenaRng, DamageEvent, Health, Stunned};
use crate::world::World;

/// Every fighter that is not stunned strikes a random opponent.
pub struct BrawlSystem {
    max_damage: i32,
}

impl BrawlSystem {
    pub fn new(max_damage: i32) -> Self {
        Self { max_damage }
    }
}

impl Default for BrawlSystem {
    fn default() -> Self {
        Self::new(25)
    }
}

impl System for BrawlSystem {
    fn name(&self) -> &str {
        "brawl"
    }

    fn run(&mut self, world: &mut World) -> Result<()> {
        let fighters: Vec<Entity> = world
            .query_with_values::<(Health,)>()
            .filter(|(_, (health,))| health.0 > 0)
            .map(|(entity, _)| entity)
            .collect();
        if fighters.len() < 2 {
            return Ok(());
        }

        let attackers: Vec<Entity> = fighters
            .iter()
            .copied()
            .filter(|&fighter| !world.has_component::<Stunned>(fighter))
            .collect();

        let rng = &mut world
            .try_resource_mut::<ArenaRng>()
            .context("brawl needs an arena rng")?
            .0;
        let mut strikes = Vec::with_capacity(attackers.len());
        for source in attackers {
            // pick among the others by skipping over the attacker's own slot
            let own = fighters.iter().position(|&f| f == source).unwrap_or(0);
            let mut pick = rng.gen_range(0..fighters.len() - 1);
            if pick >= own {
                pick += 1;
            }
            strikes.push(DamageEvent {
                source,
                target: fighters[pick],
                amount: rng.gen_range(1..=self.max_damage.max(1)),
            });
        }

        for strike in strikes {
            world.raise(strike);
        }
        Ok(())
    }
}
