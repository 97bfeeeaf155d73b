//! JSON replay export.
//!
//! Captures one game (roster, policies, round logs and the full event
//! timeline) so it can be inspected or replayed outside the simulator.

use crate::error::RunnerError;
use crate::runner::{BatchRunner, GameOutcome};
use mafia_core::{Alignment, EventBus, GameEvent, PlayerId, Role, RoundLog};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// One seat of an exported game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatExport {
    pub id: PlayerId,
    pub role: Role,
    pub policy: String,
}

/// Complete game export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameExport {
    /// Roster preset name
    pub preset: String,

    /// Master seed of the batch
    pub seed: u64,

    /// Index of the game within the batch
    pub game_index: usize,

    /// Seed derived for this game
    pub game_seed: u64,

    pub seats: Vec<SeatExport>,

    pub rounds: Vec<RoundLog>,

    /// Absent when the game hit the round limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Alignment>,

    /// Every event, in emission order
    pub events: Vec<GameEvent>,
}

impl GameExport {
    /// Plays game `index` of `runner` and captures it.
    ///
    /// `events` may already carry other subscribers; the recorder is added
    /// after them.
    pub fn record(runner: &BatchRunner, index: usize, mut events: EventBus) -> Result<Self, RunnerError> {
        let recorder = EventRecorder::new();
        recorder.attach(&mut events);
        let outcome = runner.play_game_with(index, events)?;
        Ok(Self::from_outcome(runner, &outcome, recorder.take()))
    }

    /// Builds an export from a finished outcome and its recorded events.
    pub fn from_outcome(runner: &BatchRunner, outcome: &GameOutcome, events: Vec<GameEvent>) -> Self {
        let seats = outcome
            .roles
            .iter()
            .zip(&outcome.policies)
            .enumerate()
            .map(|(id, (role, policy))| SeatExport {
                id,
                role: *role,
                policy: policy.clone(),
            })
            .collect();

        Self {
            preset: runner.preset().name().to_string(),
            seed: runner.context().seed(),
            game_index: outcome.index,
            game_seed: outcome.seed,
            seats,
            rounds: outcome.rounds.clone(),
            winner: outcome.winner,
            events,
        }
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

/// Collects every event emitted on a bus.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<GameEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes the recorder to every event on `bus`.
    pub fn attach(&self, bus: &mut EventBus) {
        let events = Arc::clone(&self.events);
        bus.subscribe_all(move |event| {
            events
                .lock()
                .map_err(|_| "event recorder poisoned")?
                .push(event.clone());
            Ok(())
        });
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes and returns everything recorded so far.
    pub fn take(&self) -> Vec<GameEvent> {
        self.events
            .lock()
            .map(|mut e| std::mem::take(&mut *e))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mafia_core::EventKind;

    #[test]
    fn test_export_matches_outcome() {
        let runner = BatchRunner::new(21);
        let export = GameExport::record(&runner, 2, EventBus::new()).unwrap();
        let outcome = runner.play_game(2).unwrap();

        assert_eq!(export.rounds, outcome.rounds);
        assert_eq!(export.winner, outcome.winner);
        assert_eq!(export.game_index, 2);
        assert_eq!(export.seats.len(), 10);
        assert_eq!(export.seats[3].role, outcome.roles[3]);
    }

    #[test]
    fn test_timeline_is_bracketed() {
        let runner = BatchRunner::new(4);
        let export = GameExport::record(&runner, 0, EventBus::new()).unwrap();

        assert_eq!(export.events.first().map(|e| e.kind()), Some(EventKind::GameStarted));
        assert_eq!(export.events.get(1).map(|e| e.kind()), Some(EventKind::DayStarted));
        if export.winner.is_some() {
            assert_eq!(export.events.last().map(|e| e.kind()), Some(EventKind::GameEnded));
        }
    }

    #[test]
    fn test_recorder_take_drains() {
        let recorder = EventRecorder::new();
        let mut bus = EventBus::new();
        recorder.attach(&mut bus);

        bus.emit(&GameEvent::DayStarted { day: 1 }).unwrap();
        bus.emit(&GameEvent::NoElimination { day: 1 }).unwrap();

        assert_eq!(recorder.len(), 2);
        assert_eq!(recorder.take().len(), 2);
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_write_and_read_back() {
        let runner = BatchRunner::new(13);
        let export = GameExport::record(&runner, 0, EventBus::new()).unwrap();
        let path = std::env::temp_dir().join(format!("mafia_export_{}.json", std::process::id()));
        let path = path.to_str().unwrap();

        export.write_to_file(path).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        std::fs::remove_file(path).ok();

        let back: GameExport = serde_json::from_str(&text).unwrap();
        assert_eq!(back, export);
        assert!(text.contains("\"event\": \"game_started\""));
    }
}
