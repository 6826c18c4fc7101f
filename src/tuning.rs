//! Data-driven game balance
//!
//! Every number a designer might want to tweak lives here, grouped per game.
//! `Default` reproduces the shipped balance; a JSON file can override any
//! subset of fields.
//!
//! Difficulty is always a pure function of the current score. Nothing here
//! caches derived values, so a score change takes effect on the next tick.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Failure reading a JSON configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unplayable tuning: {0}")]
    Invalid(String),
}

fn require(ok: bool, what: &str) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid(what.to_string()))
    }
}

fn non_negative(x: f64) -> bool {
    x.is_finite() && x >= 0.0
}

fn positive(x: f64) -> bool {
    x.is_finite() && x > 0.0
}

/// Relative spawn weights for the three pig kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindWeights {
    pub normal: u32,
    pub bonus: u32,
    pub hazard: u32,
}

impl KindWeights {
    pub fn total(&self) -> u32 {
        self.normal + self.bonus + self.hazard
    }
}

/// One difficulty bucket of the whack game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhackTier {
    /// Lowest score that selects this tier
    pub min_score: u64,
    /// Display name for the level-up banner
    pub name: String,
    /// Seconds between spawn attempts
    pub tick_interval: f32,
    /// Probability that a spawn attempt pops a pig
    pub spawn_chance: f64,
    /// Seconds a pig stays up before ducking back
    pub stay: f32,
    pub weights: KindWeights,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhackTuning {
    pub holes: usize,
    /// Session time budget (seconds)
    pub duration: f32,
    /// Sorted by `min_score`, first entry must start at 0
    pub tiers: Vec<WhackTier>,
    pub normal_reward: u64,
    pub bonus_reward: u64,
    pub hazard_penalty: u64,
    /// Combo bonus is `floor(combo / combo_divisor) * combo_bonus`
    pub combo_divisor: u32,
    pub combo_bonus: u64,
    /// Bonus pigs are faster: stay is scaled by this factor
    pub bonus_stay_factor: f32,
    /// How long a bonked pig stays on screen before the hole frees up
    pub hit_display: f32,
    pub commentary_scale: u64,
}

impl Default for WhackTuning {
    fn default() -> Self {
        Self {
            holes: 9,
            duration: 30.0,
            tiers: vec![
                WhackTier {
                    min_score: 0,
                    name: "Greenhorn Farmer".to_string(),
                    tick_interval: 0.7,
                    spawn_chance: 0.5,
                    stay: 1.0,
                    weights: KindWeights {
                        normal: 1,
                        bonus: 0,
                        hazard: 0,
                    },
                },
                WhackTier {
                    min_score: 50,
                    name: "Seasoned Cowhand".to_string(),
                    tick_interval: 0.55,
                    spawn_chance: 0.7,
                    stay: 0.75,
                    weights: KindWeights {
                        normal: 2,
                        bonus: 1,
                        hazard: 0,
                    },
                },
                WhackTier {
                    min_score: 200,
                    name: "Legendary Rancher".to_string(),
                    tick_interval: 0.45,
                    spawn_chance: 0.85,
                    stay: 0.55,
                    weights: KindWeights {
                        normal: 1,
                        bonus: 1,
                        hazard: 1,
                    },
                },
            ],
            normal_reward: 10,
            bonus_reward: 50,
            hazard_penalty: 50,
            combo_divisor: 5,
            combo_bonus: 5,
            bonus_stay_factor: 0.6,
            hit_display: 0.4,
            commentary_scale: 500,
        }
    }
}

impl WhackTuning {
    /// 1-based tier number for a score
    pub fn tier_number(&self, score: u64) -> u32 {
        let idx = self
            .tiers
            .iter()
            .rposition(|t| score >= t.min_score)
            .unwrap_or(0);
        idx as u32 + 1
    }

    /// Tier parameters for a score
    pub fn tier(&self, score: u64) -> &WhackTier {
        let idx = self.tier_number(score) as usize - 1;
        &self.tiers[idx.min(self.tiers.len().saturating_sub(1))]
    }

    fn validate(&self) -> Result<(), ConfigError> {
        require(!self.tiers.is_empty(), "whack needs at least one tier")?;
        require(
            self.tiers.first().is_some_and(|t| t.min_score == 0),
            "first whack tier must start at score 0",
        )?;
        require(
            self.tiers.windows(2).all(|w| w[0].min_score <= w[1].min_score),
            "whack tiers must be sorted by min_score",
        )?;
        for tier in &self.tiers {
            require(positive(tier.tick_interval as f64), "whack tick_interval must be positive")?;
            require(
                (0.0..=1.0).contains(&tier.spawn_chance),
                "whack spawn_chance must be within 0..=1",
            )?;
            require(non_negative(tier.stay as f64), "whack stay must not be negative")?;
        }
        require(positive(self.duration as f64), "whack duration must be positive")?;
        require(
            non_negative(self.bonus_stay_factor as f64),
            "whack bonus_stay_factor must not be negative",
        )?;
        require(non_negative(self.hit_display as f64), "whack hit_display must not be negative")
    }

    /// Combo bonus earned by a hit made while holding `combo`
    pub fn combo_bonus_for(&self, combo: u32) -> u64 {
        if self.combo_divisor == 0 {
            return 0;
        }
        (combo / self.combo_divisor) as u64 * self.combo_bonus
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RhythmTuning {
    pub lanes: u8,
    pub bpm: f64,
    /// Grid steps per beat (1 = quarter notes)
    pub subdivisions: u32,
    /// Seconds a note travels before it reaches the hit line
    pub approach_time: f64,
    /// Inclusive timing windows (seconds)
    pub perfect_window: f64,
    pub good_window: f64,
    pub perfect_points: u64,
    pub good_points: u64,
    pub fever_multiplier: u64,
    /// Extra points per combo step held at the time of the hit
    pub combo_step: u64,
    /// Combo needed to light fever
    pub fever_combo: u32,
    pub lives: u32,
    pub density_base: f64,
    pub density_per_point: f64,
    pub density_cap: f64,
    /// Seconds after its anchor that a note is dropped from the lane
    pub note_linger: f64,
    /// Delay between pressing start and the first scheduled beat
    pub lead_in: f64,
    /// Audio-time seconds of regular play before the boss shows up
    pub boss_after: f64,
    pub boss_health: u32,
    pub boss_countdown: f64,
    pub boss_bonus: u64,
    /// Scheduler look-ahead window (seconds of audio time)
    pub schedule_ahead: f64,
    pub commentary_scale: u64,
}

impl Default for RhythmTuning {
    fn default() -> Self {
        Self {
            lanes: 3,
            bpm: 100.0,
            subdivisions: 1,
            approach_time: 2.0,
            perfect_window: 0.15,
            good_window: 0.3,
            perfect_points: 50,
            good_points: 20,
            fever_multiplier: 2,
            combo_step: 5,
            fever_combo: 10,
            lives: 5,
            density_base: 0.4,
            density_per_point: 0.005,
            density_cap: 0.9,
            note_linger: 1.0,
            lead_in: 0.1,
            boss_after: 30.0,
            boss_health: 50,
            boss_countdown: 10.0,
            boss_bonus: 1000,
            schedule_ahead: 0.1,
            commentary_scale: 2000,
        }
    }
}

impl RhythmTuning {
    /// Seconds between grid steps
    pub fn step_seconds(&self) -> f64 {
        60.0 / self.bpm / self.subdivisions.max(1) as f64
    }

    /// Probability that a grid step carries a note
    pub fn note_density(&self, score: u64) -> f64 {
        (self.density_base + score as f64 * self.density_per_point).min(self.density_cap)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        require(positive(self.bpm), "rhythm bpm must be positive")?;
        require(positive(self.approach_time), "rhythm approach_time must be positive")?;
        require(non_negative(self.perfect_window), "rhythm perfect_window must not be negative")?;
        require(
            self.good_window.is_finite() && self.good_window >= self.perfect_window,
            "rhythm good_window must cover perfect_window",
        )?;
        require(
            [self.density_base, self.density_per_point, self.density_cap]
                .iter()
                .all(|d| d.is_finite()),
            "rhythm note density must be finite",
        )?;
        require(non_negative(self.note_linger), "rhythm note_linger must not be negative")?;
        require(non_negative(self.lead_in), "rhythm lead_in must not be negative")?;
        require(non_negative(self.boss_after), "rhythm boss_after must not be negative")?;
        require(non_negative(self.boss_countdown), "rhythm boss_countdown must not be negative")?;
        require(non_negative(self.schedule_ahead), "rhythm schedule_ahead must not be negative")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightTuning {
    pub actor_x: f32,
    pub actor_size: f32,
    /// Hitbox is shrunk by this much on every side
    pub hitbox_margin: f32,
    pub start_y: f32,
    /// Downward acceleration (units/s²)
    pub gravity: f32,
    /// Velocity set by a flap (units/s, negative is up)
    pub jump_velocity: f32,
    pub obstacle_width: f32,
    pub gap_base: f32,
    pub gap_min: f32,
    pub gap_shrink_per_point: f32,
    /// Gap top is kept this far from the playfield edges
    pub gap_margin: f32,
    pub speed_base: f32,
    pub speed_max: f32,
    pub speed_per_point: f32,
    /// Horizontal distance between consecutive obstacles
    pub spacing: f32,
    /// Passes needed to earn a rush
    pub rush_every: u64,
    pub rush_duration: f32,
    pub smash_bonus: u64,
    pub commentary_scale: u64,
}

impl Default for FlightTuning {
    fn default() -> Self {
        Self {
            actor_x: 10.0,
            actor_size: 8.0,
            hitbox_margin: 2.0,
            start_y: 50.0,
            // 0.12 per frame² and 2.2 per frame at 60 fps
            gravity: 432.0,
            jump_velocity: -132.0,
            obstacle_width: 15.0,
            gap_base: 35.0,
            gap_min: 22.0,
            gap_shrink_per_point: 0.5,
            gap_margin: 10.0,
            // 0.35 per frame at 60 fps
            speed_base: 21.0,
            speed_max: 40.0,
            speed_per_point: 0.6,
            spacing: 55.0,
            rush_every: 10,
            rush_duration: 3.0,
            smash_bonus: 3,
            commentary_scale: 50,
        }
    }
}

impl FlightTuning {
    /// Horizontal scroll speed for a score (units/s)
    pub fn scroll_speed(&self, score: u64) -> f32 {
        (self.speed_base + score as f32 * self.speed_per_point).clamp(self.speed_base, self.speed_max)
    }

    /// Vertical opening of the next fence for a score
    pub fn gap(&self, score: u64) -> f32 {
        (self.gap_base - score as f32 * self.gap_shrink_per_point).clamp(self.gap_min, self.gap_base)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let finite = [
            self.actor_x,
            self.actor_size,
            self.hitbox_margin,
            self.start_y,
            self.gravity,
            self.jump_velocity,
            self.obstacle_width,
            self.gap_shrink_per_point,
            self.gap_margin,
            self.speed_per_point,
            self.rush_duration,
        ];
        require(finite.iter().all(|x| x.is_finite()), "flight values must be finite")?;
        require(positive(self.spacing as f64), "flight spacing must be positive")?;
        require(
            non_negative(self.speed_base as f64)
                && self.speed_max.is_finite()
                && self.speed_base <= self.speed_max,
            "flight speed_base must be within 0..=speed_max",
        )?;
        require(
            non_negative(self.gap_min as f64)
                && self.gap_base.is_finite()
                && self.gap_min <= self.gap_base,
            "flight gap_min must be within 0..=gap_base",
        )
    }
}

/// Balance for the whole arcade
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub whack: WhackTuning,
    pub rhythm: RhythmTuning,
    pub flight: FlightTuning,
}

impl Tuning {
    /// Parse and check a tuning file. Values that would stall or crash a run
    /// are rejected rather than clamped.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let tuning: Self = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.whack.validate()?;
        self.rhythm.validate()?;
        self.flight.validate()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn whack_tiers_follow_score_thresholds() {
        let t = WhackTuning::default();
        assert_eq!(t.tier_number(0), 1);
        assert_eq!(t.tier_number(49), 1);
        assert_eq!(t.tier_number(50), 2);
        assert_eq!(t.tier_number(199), 2);
        assert_eq!(t.tier_number(200), 3);
        assert_eq!(t.tier(10_000).name, "Legendary Rancher");
    }

    #[test]
    fn combo_bonus_steps_every_five() {
        let t = WhackTuning::default();
        assert_eq!(t.combo_bonus_for(0), 0);
        assert_eq!(t.combo_bonus_for(4), 0);
        assert_eq!(t.combo_bonus_for(5), 5);
        assert_eq!(t.combo_bonus_for(12), 10);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let tuning = Tuning::from_json(r#"{ "rhythm": { "bpm": 120.0 } }"#).unwrap();
        assert_eq!(tuning.rhythm.bpm, 120.0);
        assert_eq!(tuning.rhythm.lives, 5);
        assert_eq!(tuning.whack, WhackTuning::default());
        assert!((tuning.rhythm.step_seconds() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = Tuning::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn unplayable_values_are_rejected() {
        for json in [
            r#"{ "whack": { "tiers": [] } }"#,
            r#"{ "whack": { "tiers": [{ "min_score": 10, "name": "Late", "tick_interval": 0.5,
                 "spawn_chance": 0.5, "stay": 1.0,
                 "weights": { "normal": 1, "bonus": 0, "hazard": 0 } }] } }"#,
            r#"{ "flight": { "spacing": 0.0 } }"#,
            r#"{ "flight": { "speed_base": 50.0, "speed_max": 40.0 } }"#,
            r#"{ "rhythm": { "bpm": 0.0 } }"#,
            r#"{ "rhythm": { "approach_time": -1.0 } }"#,
            r#"{ "rhythm": { "perfect_window": 0.4, "good_window": 0.3 } }"#,
        ] {
            let err = Tuning::from_json(json).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{json}: {err}");
        }
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Tuning::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    proptest! {
        #[test]
        fn whack_tier_is_pure_and_non_decreasing(a in 0u64..2_000, b in 0u64..2_000) {
            let t = WhackTuning::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(t.tier_number(lo) <= t.tier_number(hi));
            prop_assert_eq!(t.tier(a), t.tier(a));
        }

        #[test]
        fn note_density_is_capped_and_monotone(a in 0u64..5_000, b in 0u64..5_000) {
            let t = RhythmTuning::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(t.note_density(lo) <= t.note_density(hi));
            prop_assert!(t.note_density(hi) <= t.density_cap);
            prop_assert!(t.note_density(lo) >= t.density_base);
        }

        #[test]
        fn flight_speed_and_gap_stay_clamped(score in 0u64..10_000) {
            let t = FlightTuning::default();
            let speed = t.scroll_speed(score);
            let gap = t.gap(score);
            prop_assert!(speed >= t.speed_base && speed <= t.speed_max);
            prop_assert!(gap >= t.gap_min && gap <= t.gap_base);
            prop_assert!(t.scroll_speed(score + 1) >= speed);
            prop_assert!(t.gap(score + 1) <= gap);
        }
    }
}
