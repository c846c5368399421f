pub mod config;
pub mod ecs;
pub mod error;
pub mod event;
pub mod resource;
pub mod scheduler;
pub mod systems;
pub mod tag;
pub mod world;

pub use config::{ArenaConfig, Config, LoggingConfig, WorldConfig};
pub use ecs::{Component, ComponentSet, Entity, EntityId, Registry};
pub use error::{ConfigError, EcsError, EcsResult};
pub use scheduler::{System, SystemSet, SystemState};
pub use tag::{ComponentId, SystemId, TypeTag};
pub use world::{TickReport, World};
