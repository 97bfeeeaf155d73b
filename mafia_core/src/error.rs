//! Error types for the round engine.

use crate::participant::PlayerId;
use thiserror::Error;

/// Error type event handlers may return.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Problems with a roster, detected before any round is played.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SetupError {
    /// No participants at all
    #[error("Roster is empty")]
    EmptyRoster,

    /// Participant ids must be 0..N-1 in order
    #[error("Participant at position {position} has id {found}")]
    NonDenseIds { position: usize, found: PlayerId },

    /// A unique role was assigned more than once
    #[error("Role {role} assigned to both {first} and {second}")]
    DuplicateRole {
        role: &'static str,
        first: PlayerId,
        second: PlayerId,
    },
}

/// Errors that abort a game in progress.
#[derive(Debug, Error)]
pub enum GameError {
    /// An event subscriber failed; the game cannot continue
    #[error("Subscriber for '{event}' failed: {source}")]
    Subscriber {
        event: &'static str,
        #[source]
        source: HandlerError,
    },

    /// A dead (or unknown) participant was asked for a day action
    #[error("Participant {0} is not alive")]
    NotAlive(PlayerId),

    /// The caller-imposed round limit was hit without a winner
    #[error("No winner after {0} rounds")]
    RoundLimitReached(u32),

    #[error(transparent)]
    Setup(#[from] SetupError),
}

impl GameError {
    /// Creates a subscriber error.
    pub fn subscriber(event: &'static str, source: HandlerError) -> Self {
        Self::Subscriber { event, source }
    }
}
