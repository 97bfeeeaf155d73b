//! The round engine: day phase, night phase and the run loop.
//!
//! A round is a day followed by a night. After each half the engine checks
//! for a winner; the night is skipped when the day already decided the game.
//! Everything runs synchronously on the caller's thread, in a fixed order,
//! so a game with deterministic policies replays identically.

mod day;
mod night;

use crate::actions::{RoundLog, SpeechLog};
use crate::error::{GameError, HandlerError};
use crate::events::{EventBus, EventKind, GameEvent};
use crate::participant::{Participant, PlayerId};
use crate::roles::{Alignment, Role};
use crate::session::GameSession;
use tracing::{debug, info};

/// Drives one game from the first day to a winner.
#[derive(Debug)]
pub struct RoundEngine {
    session: GameSession,
    events: EventBus,
    round_limit: Option<u32>,
}

impl RoundEngine {
    /// Creates an engine with no subscribers and no round limit.
    pub fn new(session: GameSession) -> Self {
        Self {
            session,
            events: EventBus::new(),
            round_limit: None,
        }
    }

    /// Validates `participants` and creates an engine for them.
    pub fn from_participants(participants: Vec<Participant>) -> Result<Self, GameError> {
        Ok(Self::new(GameSession::new(participants)?))
    }

    /// Uses an existing event bus.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Stops [`run`](Self::run) with [`GameError::RoundLimitReached`] once
    /// `limit` rounds have passed without a winner.
    pub fn with_round_limit(mut self, limit: u32) -> Self {
        self.round_limit = Some(limit);
        self
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn into_session(self) -> GameSession {
        self.session
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// Registers a handler for one kind of event.
    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&GameEvent) -> Result<(), HandlerError> + Send + 'static,
    {
        self.events.subscribe(kind, handler);
    }

    /// Plays rounds until one side wins.
    pub fn run(&mut self) -> Result<Alignment, GameError> {
        let started = GameEvent::GameStarted {
            mafia_ids: self.session.ids_with_role(Role::Mafia),
            don_id: self.session.find_role(Role::Don).map(Participant::id),
            sheriff_id: self.session.find_role(Role::Sheriff).map(Participant::id),
        };
        self.emit(started)?;

        let mut round: u32 = 1;
        loop {
            if let Some(limit) = self.round_limit {
                if round > limit {
                    return Err(GameError::RoundLimitReached(limit));
                }
            }
            if let Some(winner) = self.play_round(round)? {
                info!("Game over after {} rounds: {} wins", round, winner);
                self.emit(GameEvent::GameEnded { winner, rounds: round })?;
                return Ok(winner);
            }
            round += 1;
        }
    }

    /// Plays one day and, if still undecided, one night, then records the
    /// round. Returns the winner if the game ended.
    pub fn play_round(&mut self, round: u32) -> Result<Option<Alignment>, GameError> {
        let day = self.day_phase(round)?;
        let mut winner = self.session.check_win();

        let night = if winner.is_none() {
            let night = self.night_phase(round)?;
            winner = self.session.check_win();
            Some(night)
        } else {
            None
        };

        self.record_round(RoundLog { day, night });
        debug!(
            "Round {} done: {} mafia vs {} civilians alive",
            round,
            self.session.mafia_count(),
            self.session.civilian_count()
        );
        Ok(winner)
    }

    /// Appends a finished round to the history.
    ///
    /// [`play_round`](Self::play_round) does this itself; the method is public
    /// so phases can be driven one at a time.
    pub fn record_round(&mut self, round: RoundLog) {
        self.session.push_round(round);
    }

    /// Records a speech for `day`, notifies every policy and publishes it.
    pub fn add_speech(&mut self, day: u32, speech: SpeechLog) -> Result<(), GameError> {
        let index = self.session.push_speech(speech.clone());
        for p in self.session.participants() {
            p.notify_speech(day, index, &speech);
        }
        self.emit(GameEvent::SpeechAdded { day, index, speech })
    }

    fn emit(&mut self, event: GameEvent) -> Result<(), GameError> {
        self.events.emit(&event)
    }

    /// Looks up a participant that must be alive for a day action.
    fn living(&self, id: PlayerId) -> Result<&Participant, GameError> {
        self.session
            .participant(id)
            .filter(|p| p.is_alive())
            .ok_or(GameError::NotAlive(id))
    }
}
