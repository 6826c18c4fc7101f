//! Score, combo, lives and fever bookkeeping
//!
//! Every mutation is a single method call so score and combo can never be
//! observed half-updated. Hit bonuses read the combo held *before* the hit.

use serde::{Deserialize, Serialize};

/// Fever flag change caused by a combo update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeverChange {
    Started,
    Ended,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBook {
    pub score: u64,
    /// Consecutive non-penalty hits
    pub combo: u32,
    pub best_combo: u32,
    pub lives: u32,
    pub fever: bool,
}

impl ScoreBook {
    pub fn new(lives: u32) -> Self {
        Self {
            lives,
            ..Default::default()
        }
    }

    /// Register a successful hit.
    ///
    /// `points` receives the combo held before this hit and returns the award.
    /// Score and combo are then updated together. Returns the points awarded.
    pub fn hit(&mut self, points: impl FnOnce(u32) -> u64) -> u64 {
        let award = points(self.combo);
        self.score = self.score.saturating_add(award);
        self.combo += 1;
        self.best_combo = self.best_combo.max(self.combo);
        award
    }

    /// Deliberate penalty: lose points (never below zero) and the combo.
    /// Returns the points actually removed.
    pub fn penalty(&mut self, points: u64) -> u64 {
        let removed = points.min(self.score);
        self.score -= removed;
        self.combo = 0;
        removed
    }

    /// Something got away: the combo is gone
    pub fn miss(&mut self) {
        self.combo = 0;
    }

    /// Points that do not touch the combo (boss bonus, smash bonus)
    pub fn add(&mut self, points: u64) {
        self.score = self.score.saturating_add(points);
    }

    /// Lose one life, returning how many remain
    pub fn lose_life(&mut self) -> u32 {
        self.lives = self.lives.saturating_sub(1);
        self.lives
    }

    /// Re-evaluate fever after a combo change
    pub fn update_fever(&mut self, threshold: u32) -> Option<FeverChange> {
        if !self.fever && threshold > 0 && self.combo >= threshold {
            self.fever = true;
            Some(FeverChange::Started)
        } else if self.fever && self.combo == 0 {
            self.fever = false;
            Some(FeverChange::Ended)
        } else {
            None
        }
    }
}
