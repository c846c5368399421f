//! Demo arena: fighters trade blows until they drop.

mod brawl;
mod damage;
mod regen;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::ArenaConfig;
use crate::ecs::Entity;
use crate::world::World;

pub use brawl::BrawlSystem;
pub use damage::DamageSystem;
pub use regen::RegenSystem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health(pub i32);

/// One-tick marker for fighters hit during the previous tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stunned;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageEvent {
    pub source: Entity,
    pub target: Entity,
    pub amount: i32,
}

/// Seeded random stream shared by the arena systems
pub struct ArenaRng(pub ChaCha8Rng);

impl ArenaRng {
    pub fn seeded(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArenaStats {
    pub hits: u64,
    pub damage_dealt: i64,
    pub knockouts: u32,
}

/// Spawn the fighters and register the arena systems in run order.
pub fn populate(world: &mut World, config: &ArenaConfig) -> Vec<Entity> {
    world.set_resource(ArenaRng::seeded(config.seed));
    world.set_resource(ArenaStats::default());

    let fighters = (0..config.fighters)
        .map(|index| {
            world.spawn((
                Name(format!("fighter-{index}")),
                Health(config.base_hp),
            ))
        })
        .collect();

    world.register_systems((
        RegenSystem::new(config.heal_per_tick),
        BrawlSystem::new(config.max_damage),
        DamageSystem::new(),
    ));
    fighters
}
