//! Synchronous, ordered event channel.
//!
//! The engine reports every state transition through an [`EventBus`] instead
//! of logging directly, so renderers, recorders and analytics can attach
//! without touching game logic.
//!
//! Handlers run synchronously, in registration order, on the thread that
//! drives the game. A handler returning an error aborts the emitting phase:
//! the error travels back through the engine as [`GameError::Subscriber`].
//!
//! # Catalogue
//!
//! | name                 | payload                                          |
//! |----------------------|--------------------------------------------------|
//! | `game_started`       | `mafia_ids`, `don_id`, `sheriff_id`              |
//! | `day_started`        | `day`                                            |
//! | `night_started`      | `night`                                          |
//! | `speech_added`       | `day`, `index`, `speech`                         |
//! | `vote_cast`          | `day`, `voter_id`, `target_id`                   |
//! | `night_action`       | `night`, `action` + action-specific fields       |
//! | `players_eliminated` | `day`, `ids`                                     |
//! | `no_elimination`     | `day`                                            |
//! | `game_ended`         | `winner`, `rounds`                               |

use crate::actions::SpeechLog;
use crate::error::{GameError, HandlerError};
use crate::participant::PlayerId;
use crate::roles::Alignment;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Night actions reported through `night_action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum NightActionEvent {
    /// `success` is false when no valid target was resolved
    MafiaKill {
        target: Option<PlayerId>,
        success: bool,
    },
    DonCheck {
        checker: PlayerId,
        target: PlayerId,
        is_sheriff: bool,
    },
    SheriffCheck {
        checker: PlayerId,
        target: PlayerId,
        is_mafia: bool,
    },
}

/// An event emitted by the round engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    GameStarted {
        mafia_ids: Vec<PlayerId>,
        don_id: Option<PlayerId>,
        sheriff_id: Option<PlayerId>,
    },
    DayStarted {
        day: u32,
    },
    NightStarted {
        night: u32,
    },
    SpeechAdded {
        day: u32,
        index: usize,
        speech: SpeechLog,
    },
    VoteCast {
        day: u32,
        voter_id: PlayerId,
        target_id: Option<PlayerId>,
    },
    NightAction {
        night: u32,
        #[serde(flatten)]
        action: NightActionEvent,
    },
    PlayersEliminated {
        day: u32,
        ids: Vec<PlayerId>,
    },
    NoElimination {
        day: u32,
    },
    GameEnded {
        winner: Alignment,
        rounds: u32,
    },
}

impl GameEvent {
    /// The kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            GameEvent::GameStarted { .. } => EventKind::GameStarted,
            GameEvent::DayStarted { .. } => EventKind::DayStarted,
            GameEvent::NightStarted { .. } => EventKind::NightStarted,
            GameEvent::SpeechAdded { .. } => EventKind::SpeechAdded,
            GameEvent::VoteCast { .. } => EventKind::VoteCast,
            GameEvent::NightAction { .. } => EventKind::NightAction,
            GameEvent::PlayersEliminated { .. } => EventKind::PlayersEliminated,
            GameEvent::NoElimination { .. } => EventKind::NoElimination,
            GameEvent::GameEnded { .. } => EventKind::GameEnded,
        }
    }

    /// Catalogue name of this event.
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }
}

/// Event names, used for subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    GameStarted,
    DayStarted,
    NightStarted,
    SpeechAdded,
    VoteCast,
    NightAction,
    PlayersEliminated,
    NoElimination,
    GameEnded,
}

impl EventKind {
    /// Returns every event kind.
    pub fn all() -> Vec<EventKind> {
        vec![
            EventKind::GameStarted,
            EventKind::DayStarted,
            EventKind::NightStarted,
            EventKind::SpeechAdded,
            EventKind::VoteCast,
            EventKind::NightAction,
            EventKind::PlayersEliminated,
            EventKind::NoElimination,
            EventKind::GameEnded,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            EventKind::GameStarted => "game_started",
            EventKind::DayStarted => "day_started",
            EventKind::NightStarted => "night_started",
            EventKind::SpeechAdded => "speech_added",
            EventKind::VoteCast => "vote_cast",
            EventKind::NightAction => "night_action",
            EventKind::PlayersEliminated => "players_eliminated",
            EventKind::NoElimination => "no_elimination",
            EventKind::GameEnded => "game_ended",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::all()
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("Unknown event: {}", s))
    }
}

/// Subscriber callback.
pub type EventHandler = Box<dyn FnMut(&GameEvent) -> Result<(), HandlerError> + Send>;

/// Ordered publish/subscribe bus.
///
/// Handlers for a given event run in the order they were registered,
/// interleaved with catch-all handlers by registration order too.
#[derive(Default)]
pub struct EventBus {
    handlers: Vec<(Option<EventKind>, EventHandler)>,
}

impl EventBus {
    /// Creates a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for one kind of event.
    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&GameEvent) -> Result<(), HandlerError> + Send + 'static,
    {
        self.handlers.push((Some(kind), Box::new(handler)));
    }

    /// Registers `handler` for every event.
    pub fn subscribe_all<F>(&mut self, handler: F)
    where
        F: FnMut(&GameEvent) -> Result<(), HandlerError> + Send + 'static,
    {
        self.handlers.push((None, Box::new(handler)));
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Delivers `event` to every matching handler.
    ///
    /// Stops at the first failing handler; later handlers do not see the event.
    pub fn emit(&mut self, event: &GameEvent) -> Result<(), GameError> {
        let kind = event.kind();
        for (filter, handler) in self.handlers.iter_mut() {
            if filter.map_or(true, |k| k == kind) {
                handler(event).map_err(|e| GameError::subscriber(kind.name(), e))?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
