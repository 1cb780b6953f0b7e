// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::dag::NodeId;

#[derive(Error, Debug)]
pub enum JobdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("command line is empty; expected at least the executable name")]
    EmptyCommand,

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("nodes cannot be added once the scheduler has run")]
    GraphSealed,

    #[error("scheduler has already run")]
    AlreadyRan,

    #[error("scheduler stalled with {waiting} node(s) waiting on dependencies that can never finish")]
    Stalled { waiting: usize },

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("process was already spawned")]
    AlreadySpawned,

    #[error("wait_any called with nothing in flight")]
    NothingInFlight,

    #[error("failed to deliver signal: {0}")]
    Signal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, JobdagError>;
