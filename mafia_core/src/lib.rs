//! Round engine for a mafia-style social deduction game.
//!
//! A fixed roster of participants (civilians, mafia, one sheriff, one don)
//! alternates between days, where everyone speaks and votes someone out, and
//! nights, where the mafia kill and the sheriff and don investigate. The game
//! ends when one side wins.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       RoundEngine                         │
//! │   day phase ──► win check ──► night phase ──► win check   │
//! │        │                          │                       │
//! │        ▼                          ▼                       │
//! │  ┌────────────┐   NightBehavior (per role)                │
//! │  │ GameSession│◄── roster, history, rotation, faction     │
//! │  └────────────┘                                           │
//! │        │ &GameSession                                     │
//! │        ▼                                                  │
//! │  Participant ──► Box<dyn Policy>  (all decisions)         │
//! │                                                           │
//! │  EventBus ──► subscribers (renderers, recorders, ...)     │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine never branches on a concrete policy type, and never on a role
//! beyond what [`NightBehavior`] exposes. Policies see the session read-only.
//!
//! # Usage
//!
//! ```ignore
//! use mafia_core::{Participant, RoundEngine, Role};
//!
//! let players = vec![
//!     Participant::new(0, Role::Sheriff, Box::new(my_sheriff_policy)),
//!     Participant::new(1, Role::Civilian, Box::new(my_civilian_policy)),
//!     Participant::new(2, Role::Don, Box::new(my_don_policy)),
//! ];
//! let mut engine = RoundEngine::from_participants(players)?;
//! let winner = engine.run()?;
//! ```

pub mod actions;
pub mod engine;
pub mod error;
pub mod events;
pub mod participant;
pub mod policy;
pub mod roles;
pub mod session;

#[cfg(test)]
mod testing;

pub use actions::{
    CheckResult, DayLog, DonCheckResult, NightLog, RoundLog, SheriffClaim, SpeechAction,
    SpeechLog, Vote,
};
pub use engine::RoundEngine;
pub use error::{GameError, HandlerError, SetupError};
pub use events::{EventBus, EventHandler, EventKind, GameEvent, NightActionEvent};
pub use participant::{Participant, PlayerId};
pub use policy::{FactionKnowledge, Policy};
pub use roles::{Alignment, Investigation, KillAuthority, NightBehavior, Role};
pub use session::GameSession;
