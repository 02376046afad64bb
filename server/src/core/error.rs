// tag_arena/server/src/core/error.rs
use thiserror::Error;

use super::types::{AgentId, PropId, RadiusClass, WaypointId};

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Path reconstruction overran {limit} steps in nav graph {radius_class} ({from} -> {to})")]
    PathOverrun {
        radius_class: RadiusClass,
        from: WaypointId,
        to: WaypointId,
        limit: usize,
    },

    #[error("Empty shortest-path reconstruction in nav graph {radius_class} ({from} -> {to})")]
    EmptyPath {
        radius_class: RadiusClass,
        from: WaypointId,
        to: WaypointId,
    },

    #[error("Agent {0} is protected and cannot be destroyed")]
    ProtectedAgent(AgentId),

    #[error("Unknown agent: {0}")]
    UnknownAgent(AgentId),

    #[error("Agent {0} is not a bot")]
    NotABot(AgentId),

    #[error("Unknown prop: {0}")]
    UnknownProp(PropId),

    #[error("Non-finite goal for {0}: ({1}, {2})")]
    InvalidGoal(AgentId, f64, f64),

    #[error("Heading out of range: {0}")]
    InvalidHeading(f64),

    #[error("Invalid obstacle: {0}")]
    InvalidObstacle(String),

    #[error("No navigation graph built for radius class {0}")]
    MissingNavGraph(RadiusClass),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    /// Broken invariants that must abort initialisation rather than be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SimError::PathOverrun { .. } | SimError::EmptyPath { .. } | SimError::ProtectedAgent(_)
        )
    }
}

pub type SimResult<T> = Result<T, SimError>;
