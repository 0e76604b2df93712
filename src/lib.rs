//! Bounce Quest - simulation core for a bounce-platformer
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, collisions, abilities, combat)
//! - `tuning`: Data-driven game balance
//! - `levels`: Level catalog (level descriptors by id)
//! - `progress`: Per-level completion records and star rating
//! - `error`: Crate error type

pub mod error;
pub mod levels;
pub mod progress;
pub mod sim;
pub mod tuning;

pub use error::{Error, Result};
pub use levels::LevelCatalog;
pub use progress::{Completion, LevelProgress, ProgressBook, star_rating};
pub use tuning::Tuning;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Reference tuning constants (see [`Tuning`] for the runtime values)
pub mod consts {
    /// Fixed simulation timestep in milliseconds (~60 Hz)
    pub const TICK_MS: u64 = 16;
    /// Maximum substeps per `advance` call to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Downward acceleration added to vy every tick
    pub const GRAVITY: f32 = 0.5;
    /// Vertical velocity set by a jump (negative is up)
    pub const JUMP_FORCE: f32 = -12.0;
    /// Ball is a square of this side for collision purposes
    pub const BALL_SIZE: f32 = 24.0;
    /// Ground line sits this far above the bottom of the viewport
    pub const GROUND_OFFSET: f32 = 100.0;
    /// Horizontal speed at attempt start
    pub const BASE_SPEED: f32 = 2.5;
    /// Spawn x coordinate
    pub const START_X: f32 = 50.0;

    /// Coyote-time window after leaving the ground
    pub const COYOTE_MS: u64 = 150;
    /// How long the `jumping` animation flag stays up
    pub const JUMP_ANIM_MS: u64 = 200;
    /// Duration of the sleep (invulnerability) ability
    pub const SLEEP_MS: u64 = 2000;

    /// Ball center to portal center distance that counts as reaching the goal
    pub const PORTAL_RADIUS: f32 = 30.0;
    /// How far below the viewport the ball may fall before the run is lost
    pub const FALL_MARGIN: f32 = 100.0;

    /// Delay before the enemy strikes back
    pub const ENEMY_THINK_MS: u64 = 1000;
    /// Player attack damage (inclusive)
    pub const PLAYER_DAMAGE: (i32, i32) = (20, 50);
    /// Enemy attack damage (inclusive)
    pub const ENEMY_DAMAGE: (i32, i32) = (15, 40);
    /// Health cap for both combatants
    pub const MAX_HEALTH: i32 = 100;
    /// Score awarded for defeating an enemy
    pub const VICTORY_BONUS: i64 = 50;
}

/// Axis-aligned rectangle in screen space (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub size: Vec2,
}

impl Aabb {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            size: Vec2::new(width, height),
        }
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.min.x
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.min.x + self.size.x
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.min.y
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.min.y + self.size.y
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.min + self.size * 0.5
    }

    /// Strict overlap: touching edges do not count
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.right() > other.left()
            && self.left() < other.right()
            && self.bottom() > other.top()
            && self.top() < other.bottom()
    }
}
