//! Error types for the simulation harness.

use mafia_core::GameError;
use std::path::PathBuf;
use thiserror::Error;

/// Problems loading or resolving a policy configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration document is not valid JSON for its schema
    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// No policy registered under this name
    #[error("Unknown policy: {0}")]
    UnknownPolicy(String),

    #[error("Policy '{policy}' has no parameter '{param}'")]
    UnknownParameter { policy: String, param: String },

    /// Parameters are probabilities and must lie in [0, 1]
    #[error("Parameter '{param}' = {value} is outside [0, 1]")]
    OutOfRange { param: String, value: f64 },

    #[error("Unknown roster preset: {0}")]
    UnknownPreset(String),

    /// Optimisation plan is incomplete or inconsistent
    #[error("Invalid optimisation plan: {0}")]
    InvalidPlan(String),
}

impl ConfigError {
    /// Creates an I/O error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn unknown_parameter(policy: &str, param: &str) -> Self {
        Self::UnknownParameter {
            policy: policy.to_string(),
            param: param.to_string(),
        }
    }
}

/// Failures of the persistent game store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// sled reported an error
    #[error("Storage error: {0}")]
    StorageError(String),

    /// A record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Errors that abort a batch of games.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A game failed for a reason other than hitting the round limit
    #[error("Game {index} failed: {source}")]
    Game {
        index: usize,
        #[source]
        source: GameError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A worker task panicked or was cancelled
    #[error("Worker failed: {0}")]
    Join(String),

    /// Writing an export or log file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunnerError {
    pub fn game(index: usize, source: GameError) -> Self {
        Self::Game { index, source }
    }
}
