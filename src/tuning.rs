//! Data-driven game balance
//!
//! Every physics and combat constant the simulation reads at runtime. Missing
//! JSON fields fall back to the reference values in [`crate::consts`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{Error, Result};

/// Runtime tuning values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Tuning {
    // === Timing ===
    /// Fixed tick length (ms)
    pub tick_ms: u64,
    /// Maximum ticks run by a single `advance` call
    pub max_substeps: u32,

    // === Ball physics ===
    pub gravity: f32,
    pub jump_force: f32,
    pub ball_size: f32,
    /// Ground line = viewport height - ground_offset
    pub ground_offset: f32,
    pub base_speed: f32,
    pub start_x: f32,
    pub fall_margin: f32,
    pub portal_radius: f32,

    // === Abilities ===
    pub coyote_ms: u64,
    pub jump_anim_ms: u64,
    pub sleep_ms: u64,

    // === Combat ===
    pub enemy_think_ms: u64,
    /// Inclusive (min, max)
    pub player_damage: (i32, i32),
    /// Inclusive (min, max)
    pub enemy_damage: (i32, i32),
    pub max_health: i32,
    pub victory_bonus: i64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            tick_ms: TICK_MS,
            max_substeps: MAX_SUBSTEPS,

            gravity: GRAVITY,
            jump_force: JUMP_FORCE,
            ball_size: BALL_SIZE,
            ground_offset: GROUND_OFFSET,
            base_speed: BASE_SPEED,
            start_x: START_X,
            fall_margin: FALL_MARGIN,
            portal_radius: PORTAL_RADIUS,

            coyote_ms: COYOTE_MS,
            jump_anim_ms: JUMP_ANIM_MS,
            sleep_ms: SLEEP_MS,

            enemy_think_ms: ENEMY_THINK_MS,
            player_damage: PLAYER_DAMAGE,
            enemy_damage: ENEMY_DAMAGE,
            max_health: MAX_HEALTH,
            victory_bonus: VICTORY_BONUS,
        }
    }
}

impl Tuning {
    /// Parse and validate tuning overrides
    pub fn from_json(json: &str) -> Result<Self> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load tuning from a file, falling back to defaults when it is unusable
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path)
            .map_err(Error::from)
            .and_then(|json| Self::from_json(&json))
        {
            Ok(tuning) => {
                log::info!("Loaded tuning from {}", path.display());
                tuning
            }
            Err(e) => {
                log::warn!("Using default tuning ({}: {})", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 {
            return Err(Error::InvalidTuning("tickMs must be positive".into()));
        }
        if self.max_substeps == 0 {
            return Err(Error::InvalidTuning("maxSubsteps must be positive".into()));
        }
        if self.ball_size <= 0.0 {
            return Err(Error::InvalidTuning("ballSize must be positive".into()));
        }
        if self.max_health <= 0 {
            return Err(Error::InvalidTuning("maxHealth must be positive".into()));
        }
        for (name, (lo, hi)) in [
            ("playerDamage", self.player_damage),
            ("enemyDamage", self.enemy_damage),
        ] {
            if lo > hi || lo < 0 {
                return Err(Error::InvalidTuning(format!(
                    "{name} range [{lo}, {hi}] is invalid"
                )));
            }
        }
        Ok(())
    }
}
