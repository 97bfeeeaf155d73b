//! Persistent game history.
//!
//! Finished games are stored as JSON records in an embedded sled database,
//! keyed by a monotonically increasing id. Inserts are buffered and written
//! in batches: a larger `batch_size` means fewer writes but more games lost
//! if the process dies before the next flush.

use crate::error::StoreError;
use mafia_core::{Alignment, Role, RoundLog};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// One stored game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Role of every seat, by participant id
    pub players: Vec<Role>,

    /// Full, unredacted history
    pub rounds: Vec<RoundLog>,

    pub winner: Alignment,
}

/// Storage for finished games.
pub trait HistoryStore: Send {
    /// Queues a game for storage, writing the batch once it is full.
    fn log_game(&mut self, record: GameRecord) -> Result<(), StoreError>;

    /// Writes every queued game.
    fn flush(&mut self) -> Result<(), StoreError>;

    /// Loads every stored game with its id, oldest first.
    fn load_all(&self) -> Result<Vec<(u64, GameRecord)>, StoreError>;

    /// Number of games written so far (queued games excluded).
    fn stored_count(&self) -> usize;
}

/// sled-backed [`HistoryStore`].
pub struct SledHistoryStore {
    db: sled::Db,
    batch_size: usize,
    pending: Vec<GameRecord>,
}

impl SledHistoryStore {
    /// Opens (or creates) a store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)
            .map_err(|e| StoreError::StorageError(format!("Failed to open sled DB: {}", e)))?;
        Ok(Self::with_db(db))
    }

    /// Creates a store that is deleted when dropped.
    pub fn open_temp() -> Result<Self, StoreError> {
        let config = sled::Config::new().temporary(true);
        let db = config
            .open()
            .map_err(|e| StoreError::StorageError(format!("Failed to open temp DB: {}", e)))?;
        Ok(Self::with_db(db))
    }

    fn with_db(db: sled::Db) -> Self {
        Self {
            db,
            batch_size: 1,
            pending: Vec::new(),
        }
    }

    /// Number of games buffered before a write. Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Games queued but not yet written.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Loads one game by id.
    pub fn get(&self, id: u64) -> Result<Option<GameRecord>, StoreError> {
        let value = self
            .db
            .get(id.to_be_bytes())
            .map_err(|e| StoreError::StorageError(format!("Read failed: {}", e)))?;
        value.map(|bytes| decode(&bytes)).transpose()
    }
}

fn decode(bytes: &[u8]) -> Result<GameRecord, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::SerializationError(e.to_string()))
}

impl HistoryStore for SledHistoryStore {
    fn log_game(&mut self, record: GameRecord) -> Result<(), StoreError> {
        self.pending.push(record);
        if self.pending.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let mut batch = sled::Batch::default();
        for record in &self.pending {
            let id = self
                .db
                .generate_id()
                .map_err(|e| StoreError::StorageError(format!("Id generation failed: {}", e)))?;
            let json = serde_json::to_vec(record)
                .map_err(|e| StoreError::SerializationError(e.to_string()))?;
            batch.insert(&id.to_be_bytes()[..], json);
        }
        self.db
            .apply_batch(batch)
            .map_err(|e| StoreError::StorageError(format!("Insert failed: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| StoreError::StorageError(format!("Flush failed: {}", e)))?;

        debug!("Stored {} games", self.pending.len());
        self.pending.clear();
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<(u64, GameRecord)>, StoreError> {
        let mut records = Vec::new();
        for entry in self.db.iter() {
            let (key, value) = entry
                .map_err(|e| StoreError::StorageError(format!("Iteration failed: {}", e)))?;
            if key.len() == 8 {
                let mut id = [0u8; 8];
                id.copy_from_slice(&key);
                records.push((u64::from_be_bytes(id), decode(&value)?));
            }
        }
        Ok(records)
    }

    fn stored_count(&self) -> usize {
        self.db.len()
    }
}

impl Drop for SledHistoryStore {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("Lost {} unsaved games: {}", self.pending.len(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mafia_core::DayLog;

    fn record(winner: Alignment) -> GameRecord {
        GameRecord {
            players: vec![Role::Sheriff, Role::Civilian, Role::Don],
            rounds: vec![RoundLog {
                day: DayLog {
                    eliminated: vec![2],
                    ..Default::default()
                },
                night: None,
            }],
            winner,
        }
    }

    #[test]
    fn test_store_roundtrip() {
        let mut store = SledHistoryStore::open_temp().unwrap();

        store.log_game(record(Alignment::Civilian)).unwrap();
        store.log_game(record(Alignment::Mafia)).unwrap();

        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].1, record(Alignment::Civilian));
        assert_eq!(all[1].1.winner, Alignment::Mafia);
        assert!(all[0].0 < all[1].0);
        assert_eq!(store.get(all[1].0).unwrap(), Some(record(Alignment::Mafia)));
    }

    #[test]
    fn test_batching_defers_writes() {
        let mut store = SledHistoryStore::open_temp().unwrap().with_batch_size(3);

        store.log_game(record(Alignment::Civilian)).unwrap();
        store.log_game(record(Alignment::Civilian)).unwrap();
        assert_eq!(store.stored_count(), 0);
        assert_eq!(store.pending(), 2);

        store.log_game(record(Alignment::Mafia)).unwrap();
        assert_eq!(store.stored_count(), 3);
        assert_eq!(store.pending(), 0);
    }

    #[test]
    fn test_flush_writes_partial_batch() {
        let mut store = SledHistoryStore::open_temp().unwrap().with_batch_size(10);

        store.log_game(record(Alignment::Mafia)).unwrap();
        store.flush().unwrap();

        assert_eq!(store.stored_count(), 1);
        // Flushing an empty buffer is a no-op
        store.flush().unwrap();
        assert_eq!(store.stored_count(), 1);
    }

    #[test]
    fn test_missing_id_is_none() {
        let store = SledHistoryStore::open_temp().unwrap();
        assert_eq!(store.get(99).unwrap(), None);
    }

    #[test]
    fn test_record_json_shape() {
        let value = serde_json::to_value(record(Alignment::Civilian)).unwrap();
        assert_eq!(value["players"][0], "SHERIFF");
        assert_eq!(value["winner"], "CIVILIAN");
        assert_eq!(value["rounds"][0]["day"]["eliminated"][0], 2);
    }
}
