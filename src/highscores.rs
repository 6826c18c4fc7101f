//! Best score per game
//!
//! One number per game, keyed by [`GameKind::as_str`]. Missing entries read as
//! zero. The file store writes through a temporary file and a rename so a
//! crash mid-write never leaves a truncated save behind.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::GameKind;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("high score file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("high score file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

/// Scalar key-value store for best scores
pub trait HighScoreStore {
    fn get(&self, game: GameKind) -> Option<u64>;
    fn set(&mut self, game: GameKind, score: u64);

    /// Best score, zero when nothing is stored
    fn best(&self, game: GameKind) -> u64 {
        self.get(game).unwrap_or(0)
    }
}

/// Store the score if it beats the current best. Returns true on a new record.
pub fn record_if_higher(store: &mut dyn HighScoreStore, game: GameKind, score: u64) -> bool {
    if score <= store.best(game) {
        return false;
    }
    log::info!("New {} high score: {}", game, score);
    store.set(game, score);
    true
}

/// Volatile store (tests, demo runs)
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    scores: BTreeMap<String, u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HighScoreStore for MemoryStore {
    fn get(&self, game: GameKind) -> Option<u64> {
        self.scores.get(game.as_str()).copied()
    }

    fn set(&mut self, game: GameKind, score: u64) {
        self.scores.insert(game.as_str().to_string(), score);
    }
}

/// JSON map on disk, read once at open and rewritten on every `set`
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    scores: BTreeMap<String, u64>,
}

impl JsonFileStore {
    /// Open the store. A missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let scores = match Self::read(&path) {
            Ok(scores) => {
                log::info!("Loaded {} high scores from {}", scores.len(), path.display());
                scores
            }
            Err(StoreError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No high scores found, starting fresh");
                BTreeMap::new()
            }
            Err(e) => {
                log::warn!("Ignoring high scores: {e}");
                BTreeMap::new()
            }
        };
        Self { path, scores }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(path: &Path) -> Result<BTreeMap<String, u64>, StoreError> {
        let json = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    fn write(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.scores)?;
        let io = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(io)?;
        std::fs::rename(&tmp, &self.path).map_err(io)?;
        Ok(())
    }
}

impl HighScoreStore for JsonFileStore {
    fn get(&self, game: GameKind) -> Option<u64> {
        self.scores.get(game.as_str()).copied()
    }

    fn set(&mut self, game: GameKind, score: u64) {
        self.scores.insert(game.as_str().to_string(), score);
        if let Err(e) = self.write() {
            log::warn!("Could not save high scores: {e}");
        }
    }
}
