//! Seed derivation for deterministic batches.
//!
//! Every source of randomness in a batch comes from one master seed:
//!
//! ```text
//! master seed ──► game seed (per game index)
//!                    ├──► roster stream  (role shuffle)
//!                    └──► player stream  (one per seat, feeds its policy)
//! ```
//!
//! Streams never share state, so a game replays identically no matter which
//! thread runs it or how many other games run beside it.

use mafia_core::PlayerId;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Derives per-game and per-player RNG streams from a master seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimContext {
    /// Master seed for the batch
    seed: u64,
}

impl SimContext {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Seed of game `index`.
    pub fn game_seed(&self, index: usize) -> u64 {
        self.seed.wrapping_mul(0x9e3779b97f4a7c15) ^ index as u64
    }

    /// Stream used to shuffle the roster of game `index`.
    pub fn roster_rng(&self, index: usize) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.game_seed(index))
    }

    /// Stream handed to the policy of `player` in game `index`.
    pub fn player_rng(&self, index: usize, player: PlayerId) -> ChaCha8Rng {
        let combined = self.game_seed(index).wrapping_mul(0x517cc1b727220a95) ^ player as u64;
        ChaCha8Rng::seed_from_u64(combined)
    }
}
