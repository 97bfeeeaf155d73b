//! Deterministic simulation harness for the mafia round engine.
//!
//! Plays large batches of seeded games with configurable policies, stores
//! finished games, renders or exports individual games and tunes policy
//! parameters by hill climbing.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                        BatchRunner                         │
//! │  SimContext (master seed)                                  │
//! │     ├─ roster_rng(game)  ──► RosterPreset::shuffled        │
//! │     └─ player_rng(game, id) ──► SimConfig ──► registry     │
//! │                                    (policy per role)       │
//! │  RoundEngine per game ──► EventBus ──► EventRenderer       │
//! │                                    └─► EventRecorder       │
//! │  GameOutcome ──► BatchSummary / HistoryStore (sled)        │
//! └────────────────────────────────────────────────────────────┘
//!            ▲
//!            │ win rate per configuration
//!      FitnessProvider ◄── optimise_parameter / optimise_all
//! ```
//!
//! # Determinism
//!
//! All randomness comes from one 64-bit seed. Game `i` depends only on the
//! seed, `i`, the preset and the configuration, so batches can be split across
//! workers and still replay exactly.
//!
//! # Usage
//!
//! ```ignore
//! use mafia_sim::{BatchRunner, RosterPreset};
//! use mafia_core::Alignment;
//!
//! let summary = BatchRunner::new(42)
//!     .with_preset(RosterPreset::Classic)
//!     .run(100, |_| Ok(()))?;
//! println!("civilians win {:.1}%", summary.win_rate(Alignment::Civilian) * 100.0);
//! ```

pub mod config;
mod context;
pub mod error;
pub mod evolution;
pub mod exporter;
pub mod history;
pub mod logger;
pub mod policies;
pub mod registry;
pub mod runner;
pub mod scenarios;

pub use config::{PolicySpec, SimConfig};
pub use context::SimContext;
pub use error::{ConfigError, RunnerError, StoreError};
pub use evolution::{
    optimise_all, optimise_parameter, FitnessProvider, OptimisationConfig, OptimisationReport,
    OptimisationResult, WinRateFitness,
};
pub use exporter::{EventRecorder, GameExport};
pub use history::{GameRecord, HistoryStore, SledHistoryStore};
pub use logger::EventRenderer;
pub use runner::{BatchRunner, BatchSummary, GameOutcome};
pub use scenarios::RosterPreset;
