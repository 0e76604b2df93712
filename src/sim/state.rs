//! Ball, run and event types
//!
//! Per-attempt state is rebuilt from scratch on every restart; nothing here
//! carries over between attempts except `RunState::death_count`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::abilities::AbilityState;
use super::combat::CombatState;
use super::level::Enemy;
use crate::Aabb;
use crate::tuning::Tuning;

/// Host viewport, re-read every tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Ground line y for the given tuning
    #[inline]
    pub fn ground_y(&self, tuning: &Tuning) -> f32 {
        self.height - tuning.ground_offset
    }

    /// Largest x the ball may occupy
    #[inline]
    pub fn max_x(&self, ball_size: f32) -> f32 {
        (self.width - ball_size).max(0.0)
    }
}

/// The ball-character. Only the physics tick moves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallState {
    /// Top-left corner
    pub pos: Vec2,
    pub vel: Vec2,
    pub grounded: bool,
    /// Animation only
    pub jumping: bool,
    /// Simulation clock (ms) of the last grounded tick
    pub last_grounded_at: u64,
    pub reversed: bool,
    pub base_speed: f32,
}

impl BallState {
    /// Fresh ball resting on the ground at the spawn point
    pub fn spawn(tuning: &Tuning, viewport: Viewport, now: u64) -> Self {
        Self {
            pos: Vec2::new(
                tuning.start_x,
                viewport.ground_y(tuning) - tuning.ball_size,
            ),
            vel: Vec2::new(tuning.base_speed, 0.0),
            grounded: true,
            jumping: false,
            last_grounded_at: now,
            reversed: false,
            base_speed: tuning.base_speed,
        }
    }

    pub fn bounds(&self, size: f32) -> Aabb {
        Aabb::new(self.pos.x, self.pos.y, size, size)
    }

    pub fn center(&self, size: f32) -> Vec2 {
        self.pos + Vec2::splat(size * 0.5)
    }

    /// Grounded, or left the ground less than `window_ms` ago
    pub fn can_jump(&self, now: u64, window_ms: u64) -> bool {
        self.grounded || now.saturating_sub(self.last_grounded_at) < window_ms
    }

    /// Point the ball left (`reversed`) or right at base speed
    pub fn set_direction(&mut self, reversed: bool) {
        self.reversed = reversed;
        self.vel.x = if reversed {
            -self.base_speed
        } else {
            self.base_speed
        };
    }
}

/// Run status as seen by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Playing,
    Paused,
    Completed,
    Failed,
}

/// Session state owned by the simulation controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub status: RunStatus,
    pub score: i64,
    /// Deaths on this level visit (survives restarts)
    pub death_count: u32,
    /// Playing time of the current attempt
    pub elapsed_ms: u64,
    /// Current attempt id; scheduled tasks are tagged with it
    pub attempt: u32,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            status: RunStatus::Playing,
            score: 0,
            death_count: 0,
            elapsed_ms: 0,
            attempt: 0,
        }
    }
}

/// Why a run ended in failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOverCause {
    Obstacle,
    Fell,
    Defeated,
}

/// Reported with `on_level_complete`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelResult {
    pub level_id: u32,
    pub elapsed_ms: u64,
    pub stars: u8,
}

/// Lifecycle events surfaced to the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    LevelComplete(LevelResult),
    GameOver(GameOverCause),
    Score(i64),
}

/// Cosmetic side effects for the renderer (particles, flashes). Not gameplay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    Jumped { pos: Vec2 },
    SleepStarted { pos: Vec2 },
    SleepEnded,
    DirectionChanged { pos: Vec2, reversed: bool },
    Explosion { pos: Vec2 },
    EncounterStarted { enemy_index: usize },
    EnemyHit { damage: i32 },
    PlayerHit { damage: i32 },
    EnemyDefeated { pos: Vec2 },
}

/// Read-only view for rendering
#[derive(Debug, Clone, Serialize)]
pub struct SimSnapshot {
    pub ball: BallState,
    pub abilities: AbilityState,
    pub combat: CombatState,
    pub run: RunState,
    pub enemies: Vec<Enemy>,
    pub viewport: Viewport,
    pub clock_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_on_ground() {
        let tuning = Tuning::default();
        let ball = BallState::spawn(&tuning, Viewport::default(), 0);
        assert_eq!(ball.pos, Vec2::new(50.0, 600.0 - 100.0 - 24.0));
        assert_eq!(ball.vel, Vec2::new(2.5, 0.0));
        assert!(ball.grounded);
        assert!(!ball.reversed);
    }

    #[test]
    fn test_coyote_window() {
        let tuning = Tuning::default();
        let mut ball = BallState::spawn(&tuning, Viewport::default(), 1000);
        ball.grounded = false;
        assert!(ball.can_jump(1100, 150));
        assert!(!ball.can_jump(1150, 150));
        assert!(!ball.can_jump(1200, 150));
    }

    #[test]
    fn test_set_direction() {
        let tuning = Tuning::default();
        let mut ball = BallState::spawn(&tuning, Viewport::default(), 0);
        ball.set_direction(true);
        assert!(ball.reversed);
        assert_eq!(ball.vel.x, -2.5);
        ball.set_direction(false);
        assert_eq!(ball.vel.x, 2.5);
    }

    #[test]
    fn test_max_x_never_negative() {
        assert_eq!(Viewport::new(10.0, 100.0).max_x(24.0), 0.0);
        assert_eq!(Viewport::new(800.0, 600.0).max_x(24.0), 776.0);
    }
}
