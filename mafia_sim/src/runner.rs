//! Batch runner - plays many seeded games and tallies the winners.

use crate::config::SimConfig;
use crate::context::SimContext;
use crate::error::RunnerError;
use crate::history::GameRecord;
use crate::scenarios::RosterPreset;

use mafia_core::{Alignment, EventBus, GameError, Participant, Role, RoundEngine, RoundLog};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Rounds a harness game may last before it is abandoned.
pub const DEFAULT_ROUND_LIMIT: u32 = 200;

/// Builds the event bus for game `index`.
pub type EventFactory = Arc<dyn Fn(usize) -> EventBus + Send + Sync>;

/// Result of one game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameOutcome {
    /// Position of the game in its batch
    pub index: usize,

    /// Seed the game's RNG streams were derived from
    pub seed: u64,

    /// Role of every seat
    pub roles: Vec<Role>,

    /// Policy name of every seat
    pub policies: Vec<String>,

    /// `None` when the round limit was reached first
    pub winner: Option<Alignment>,

    pub rounds: Vec<RoundLog>,
}

impl GameOutcome {
    pub fn rounds_played(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_finished(&self) -> bool {
        self.winner.is_some()
    }

    /// Storage record, for finished games only.
    pub fn record(&self) -> Option<GameRecord> {
        Some(GameRecord {
            players: self.roles.clone(),
            rounds: self.rounds.clone(),
            winner: self.winner?,
        })
    }
}

/// Win tally of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub games: usize,
    pub civilian_wins: usize,
    pub mafia_wins: usize,

    /// Games stopped by the round limit
    pub unfinished: usize,

    pub total_rounds: usize,
}

impl BatchSummary {
    pub fn add(&mut self, outcome: &GameOutcome) {
        self.games += 1;
        self.total_rounds += outcome.rounds_played();
        match outcome.winner {
            Some(Alignment::Civilian) => self.civilian_wins += 1,
            Some(Alignment::Mafia) => self.mafia_wins += 1,
            None => self.unfinished += 1,
        }
    }

    pub fn wins(&self, side: Alignment) -> usize {
        match side {
            Alignment::Civilian => self.civilian_wins,
            Alignment::Mafia => self.mafia_wins,
        }
    }

    /// Share of all games won by `side`. Unfinished games count as losses.
    pub fn win_rate(&self, side: Alignment) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            self.wins(side) as f64 / self.games as f64
        }
    }

    pub fn average_rounds(&self) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            self.total_rounds as f64 / self.games as f64
        }
    }
}

/// Plays batches of games.
///
/// Game `i` of a batch is fully determined by the master seed, `i`, the
/// roster preset and the policy configuration, so batches replay exactly and
/// can be split across threads.
#[derive(Clone)]
pub struct BatchRunner {
    context: SimContext,
    config: Arc<SimConfig>,
    preset: RosterPreset,
    round_limit: u32,
    events: Option<EventFactory>,
}

impl BatchRunner {
    /// Creates a runner with default policies and the classic roster.
    pub fn new(seed: u64) -> Self {
        Self {
            context: SimContext::new(seed),
            config: Arc::new(SimConfig::default()),
            preset: RosterPreset::default(),
            round_limit: DEFAULT_ROUND_LIMIT,
            events: None,
        }
    }

    pub fn with_config(mut self, config: SimConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn with_preset(mut self, preset: RosterPreset) -> Self {
        self.preset = preset;
        self
    }

    pub fn with_round_limit(mut self, limit: u32) -> Self {
        self.round_limit = limit;
        self
    }

    /// Attaches subscribers to every game.
    pub fn with_events<F>(mut self, factory: F) -> Self
    where
        F: Fn(usize) -> EventBus + Send + Sync + 'static,
    {
        self.events = Some(Arc::new(factory));
        self
    }

    pub fn context(&self) -> &SimContext {
        &self.context
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn preset(&self) -> RosterPreset {
        self.preset
    }

    /// Seats a shuffled roster for game `index` and wraps it in an engine.
    pub fn build_game(&self, index: usize) -> Result<RoundEngine, RunnerError> {
        let roles = self.preset.shuffled(&mut self.context.roster_rng(index));
        let mut participants = Vec::with_capacity(roles.len());
        for (id, role) in roles.into_iter().enumerate() {
            let policy = self
                .config
                .build_policy(role, self.context.player_rng(index, id))?;
            participants.push(Participant::new(id, role, policy));
        }

        let engine = RoundEngine::from_participants(participants)
            .map_err(|e| RunnerError::game(index, e))?
            .with_round_limit(self.round_limit);
        Ok(match &self.events {
            Some(factory) => engine.with_events(factory(index)),
            None => engine,
        })
    }

    /// Plays game `index`.
    pub fn play_game(&self, index: usize) -> Result<GameOutcome, RunnerError> {
        let engine = self.build_game(index)?;
        self.finish(index, engine)
    }

    /// Plays game `index` with `events` instead of the runner's subscribers.
    pub fn play_game_with(&self, index: usize, events: EventBus) -> Result<GameOutcome, RunnerError> {
        let engine = self.build_game(index)?.with_events(events);
        self.finish(index, engine)
    }

    fn finish(&self, index: usize, mut engine: RoundEngine) -> Result<GameOutcome, RunnerError> {
        let winner = match engine.run() {
            Ok(winner) => Some(winner),
            Err(GameError::RoundLimitReached(limit)) => {
                warn!("Game {} abandoned after {} rounds", index, limit);
                None
            }
            Err(e) => return Err(RunnerError::game(index, e)),
        };

        let session = engine.into_session();
        debug!(
            "Game {} finished: {:?} after {} rounds",
            index,
            winner,
            session.rounds_played()
        );
        Ok(GameOutcome {
            index,
            seed: self.context.game_seed(index),
            roles: session.roles(),
            policies: session
                .participants()
                .iter()
                .map(Participant::policy_name)
                .collect(),
            winner,
            rounds: session.history().to_vec(),
        })
    }

    /// Plays `games` games on the calling thread, in order.
    ///
    /// `on_game` sees every outcome as it completes; an error from it, or
    /// from any game, aborts the batch.
    pub fn run<F>(&self, games: usize, mut on_game: F) -> Result<BatchSummary, RunnerError>
    where
        F: FnMut(&GameOutcome) -> Result<(), RunnerError>,
    {
        info!(
            "Running {} games (seed={}, roster={})",
            games,
            self.context.seed(),
            self.preset
        );
        let mut summary = BatchSummary::default();
        for index in 0..games {
            let outcome = self.play_game(index)?;
            summary.add(&outcome);
            on_game(&outcome)?;
        }
        Ok(summary)
    }

    /// Plays `games` games on tokio's blocking pool, `workers` at a time.
    ///
    /// Outcomes are handed to `on_game` in game order once every worker is
    /// done, so the result matches [`run`](Self::run) exactly.
    pub async fn run_parallel<F>(
        &self,
        games: usize,
        workers: usize,
        mut on_game: F,
    ) -> Result<BatchSummary, RunnerError>
    where
        F: FnMut(&GameOutcome) -> Result<(), RunnerError>,
    {
        let workers = workers.clamp(1, games.max(1));
        info!(
            "Running {} games on {} workers (seed={}, roster={})",
            games,
            workers,
            self.context.seed(),
            self.preset
        );

        let mut tasks = JoinSet::new();
        for worker in 0..workers {
            let runner = self.clone();
            tasks.spawn_blocking(move || {
                (worker..games)
                    .step_by(workers)
                    .map(|index| runner.play_game(index))
                    .collect::<Result<Vec<_>, _>>()
            });
        }

        let mut outcomes = Vec::with_capacity(games);
        while let Some(joined) = tasks.join_next().await {
            let batch = joined.map_err(|e| RunnerError::Join(e.to_string()))??;
            outcomes.extend(batch);
        }
        outcomes.sort_by_key(|outcome| outcome.index);

        let mut summary = BatchSummary::default();
        for outcome in &outcomes {
            summary.add(outcome);
            on_game(outcome)?;
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicySpec;
    use mafia_core::EventKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn collect(runner: &BatchRunner, games: usize) -> (BatchSummary, Vec<GameOutcome>) {
        let mut outcomes = Vec::new();
        let summary = runner
            .run(games, |o| {
                outcomes.push(o.clone());
                Ok(())
            })
            .unwrap();
        (summary, outcomes)
    }

    #[test]
    fn test_seeded_batches_replay() {
        let (summary_a, a) = collect(&BatchRunner::new(42), 8);
        let (summary_b, b) = collect(&BatchRunner::new(42), 8);

        assert_eq!(summary_a, summary_b);
        assert_eq!(a, b);
        assert_eq!(summary_a.games, 8);
        assert_eq!(
            summary_a.civilian_wins + summary_a.mafia_wins + summary_a.unfinished,
            8
        );
    }

    #[test]
    fn test_different_seeds_differ() {
        let (_, a) = collect(&BatchRunner::new(1), 5);
        let (_, b) = collect(&BatchRunner::new(2), 5);

        assert!(a.iter().zip(&b).any(|(x, y)| x.roles != y.roles));
    }

    #[test]
    fn test_games_are_independent_of_batch() {
        let runner = BatchRunner::new(7);
        let (_, batch) = collect(&runner, 4);

        assert_eq!(runner.play_game(3).unwrap(), batch[3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_parallel_matches_sequential() {
        let runner = BatchRunner::new(99).with_preset(RosterPreset::Compact);
        let (sequential, expected) = collect(&runner, 12);

        let mut seen = Vec::new();
        let parallel = runner
            .run_parallel(12, 4, |o| {
                seen.push(o.clone());
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(parallel, sequential);
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_round_limit_leaves_games_unfinished() {
        let runner = BatchRunner::new(3).with_round_limit(0);

        let (summary, outcomes) = collect(&runner, 3);

        assert_eq!(summary.unfinished, 3);
        assert_eq!(summary.total_rounds, 0);
        assert!(outcomes.iter().all(|o| o.record().is_none()));
        assert_eq!(summary.win_rate(Alignment::Civilian), 0.0);
    }

    #[test]
    fn test_callback_error_aborts_batch() {
        let runner = BatchRunner::new(5);
        let mut calls = 0;

        let result = runner.run(10, |_| {
            calls += 1;
            Err(RunnerError::Join("stop".into()))
        });

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_config_reaches_every_seat() {
        let config = SimConfig::new()
            .with_role(Role::Civilian, PolicySpec::new("single_sheriff_civilian"))
            .with_role(Role::Sheriff, PolicySpec::new("single_sheriff_sheriff"));
        let runner = BatchRunner::new(11).with_config(config);

        let outcome = runner.play_game(0).unwrap();

        for (role, policy) in outcome.roles.iter().zip(&outcome.policies) {
            let expected = match role {
                Role::Civilian => "single_sheriff_civilian",
                Role::Sheriff => "single_sheriff_sheriff",
                Role::Mafia => "mafia",
                Role::Don => "don",
            };
            assert_eq!(policy, expected);
        }
    }

    #[test]
    fn test_event_factory_attaches_per_game() {
        let started = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&started);
        let runner = BatchRunner::new(8).with_events(move |_| {
            let mut bus = EventBus::new();
            let counter = Arc::clone(&counter);
            bus.subscribe(EventKind::GameStarted, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
            bus
        });

        collect(&runner, 3);

        assert_eq!(started.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_summary_rates() {
        let mut summary = BatchSummary::default();
        let mut outcome = GameOutcome {
            index: 0,
            seed: 0,
            roles: vec![],
            policies: vec![],
            winner: Some(Alignment::Civilian),
            rounds: vec![],
        };
        summary.add(&outcome);
        outcome.winner = Some(Alignment::Mafia);
        summary.add(&outcome);
        outcome.winner = None;
        summary.add(&outcome);
        summary.add(&outcome);

        assert_eq!(summary.win_rate(Alignment::Civilian), 0.25);
        assert_eq!(summary.win_rate(Alignment::Mafia), 0.25);
        assert_eq!(summary.unfinished, 2);
    }
}
