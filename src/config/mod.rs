//! Configuration loaded from YAML

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::ecs::Entity;
use crate::error::ConfigError;

/// Top-level configuration. Every section falls back to its defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub arena: ArenaConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Id of the first issued entity
    #[serde(default = "default_first_entity")]
    pub first_entity: u32,
    /// Drop a component store as soon as it holds no values
    #[serde(default)]
    pub evict_empty_stores: bool,
    /// Pre-reserved room in the live entity set
    #[serde(default)]
    pub entity_capacity: usize,
}

fn default_first_entity() -> u32 {
    1
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            first_entity: default_first_entity(),
            evict_empty_stores: false,
            entity_capacity: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Parameters of the demo arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaConfig {
    #[serde(default = "default_fighters")]
    pub fighters: u32,
    #[serde(default = "default_base_hp")]
    pub base_hp: i32,
    #[serde(default = "default_heal_per_tick")]
    pub heal_per_tick: i32,
    #[serde(default = "default_max_damage")]
    pub max_damage: i32,
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_fighters() -> u32 {
    8
}

fn default_base_hp() -> i32 {
    100
}

fn default_heal_per_tick() -> i32 {
    1
}

fn default_max_damage() -> i32 {
    25
}

fn default_ticks() -> u64 {
    50
}

fn default_seed() -> u64 {
    7
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            fighters: default_fighters(),
            base_hp: default_base_hp(),
            heal_per_tick: default_heal_per_tick(),
            max_damage: default_max_damage(),
            ticks: default_ticks(),
            seed: default_seed(),
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world.first_entity == Entity::NULL.id() {
            return Err(ConfigError::Invalid(
                "world.first_entity collides with the null entity".to_string(),
            ));
        }
        if self.arena.max_damage <= 0 {
            return Err(ConfigError::Invalid(
                "arena.max_damage must be positive".to_string(),
            ));
        }
        if self.arena.base_hp <= 0 {
            return Err(ConfigError::Invalid(
                "arena.base_hp must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
