//! Error types

use std::path::PathBuf;

use thiserror::Error;

use crate::ecs::Entity;

/// Contract violations reported by the fallible world accessors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EcsError {
    #[error("entity {0} is not alive")]
    DeadEntity(Entity),

    #[error("entity {entity} has no {component} component")]
    MissingComponent {
        entity: Entity,
        component: &'static str,
    },

    #[error("no entity holds a {0} component")]
    EmptyStore(&'static str),

    #[error("resource {0} is not set")]
    MissingResource(&'static str),
}

pub type EcsResult<T> = Result<T, EcsError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
