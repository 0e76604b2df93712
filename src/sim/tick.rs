//! Fixed timestep physics tick
//!
//! Advances the ball by one step: gravity, horizontal drift, wall bounce,
//! collision resolution. Terminal outcomes leave the ball where it was.

use glam::Vec2;

use super::abilities::AbilityState;
use super::collision::{Arena, Outcome, Probe, resolve};
use super::level::{Enemy, LevelDescriptor};
use super::state::{BallState, Effect, GameOverCause, Viewport};
use crate::tuning::Tuning;

/// Everything a tick reads but does not own
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    pub tuning: &'a Tuning,
    pub viewport: Viewport,
    pub level: &'a LevelDescriptor,
    /// Remaining enemies for this attempt
    pub enemies: &'a [Enemy],
    pub combat_idle: bool,
    /// Simulation clock (ms)
    pub now: u64,
}

/// What the tick asks the controller to do
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Ball moved (or is frozen by sleep)
    Continue,
    /// Start an encounter with the enemy at `index`
    EnemyContact { index: usize, pre_combat_pos: Vec2 },
    GoalReached,
    GameOver(GameOverCause),
}

/// Advance the ball by one fixed step
pub fn tick(
    ball: &mut BallState,
    abilities: &mut AbilityState,
    ctx: &TickContext<'_>,
    effects: &mut Vec<Effect>,
) -> TickOutcome {
    // Asleep: frozen in place, nothing integrates
    if abilities.sleep_active {
        return TickOutcome::Continue;
    }

    let t = ctx.tuning;
    let size = t.ball_size;
    let prev_pos = ball.pos;

    let vy = ball.vel.y + t.gravity;
    let vx = if abilities.reversed {
        -ball.base_speed
    } else {
        ball.base_speed
    };
    let mut next = ball.pos + Vec2::new(vx, vy);

    // Wall bounce: clamp, then point away from the wall
    let max_x = ctx.viewport.max_x(size);
    let mut vx = vx;
    if next.x < 0.0 {
        next.x = 0.0;
        if abilities.reversed {
            abilities.set_reversed(ball, false);
            vx = ball.vel.x;
            effects.push(Effect::DirectionChanged {
                pos: next,
                reversed: false,
            });
        }
    } else if next.x > max_x {
        next.x = max_x;
        if !abilities.reversed {
            abilities.set_reversed(ball, true);
            vx = ball.vel.x;
            effects.push(Effect::DirectionChanged {
                pos: next,
                reversed: true,
            });
        }
    }

    let arena = Arena {
        platforms: &ctx.level.platforms,
        portal: ctx.level.portal.as_ref(),
        enemies: ctx.enemies,
        ground_y: ctx.viewport.ground_y(t),
        portal_radius: t.portal_radius,
    };
    let probe = Probe {
        pos: next,
        vy,
        size,
        sleep_active: abilities.sleep_active,
        combat_idle: ctx.combat_idle,
    };

    let mut vy = vy;
    let mut grounded = false;
    match resolve(&probe, &arena) {
        Outcome::EnemyContact { index, snap } => {
            ball.pos = snap;
            ball.vel = Vec2::new(vx, 0.0);
            ball.grounded = false;
            return TickOutcome::EnemyContact {
                index,
                pre_combat_pos: prev_pos,
            };
        }
        Outcome::Grounded { y } | Outcome::Landed { y, .. } => {
            next.y = y;
            vy = 0.0;
            grounded = true;
            ball.last_grounded_at = ctx.now;
        }
        Outcome::Obstacle { .. } => {
            effects.push(Effect::Explosion {
                pos: ball.center(size),
            });
            return TickOutcome::GameOver(GameOverCause::Obstacle);
        }
        Outcome::GoalReached => return TickOutcome::GoalReached,
        Outcome::NoCollision => {}
    }

    if next.y > ctx.viewport.height + t.fall_margin {
        return TickOutcome::GameOver(GameOverCause::Fell);
    }

    ball.pos = next;
    ball.vel = Vec2::new(vx, vy);
    ball.grounded = grounded;
    TickOutcome::Continue
}

/// Jump if grounded or within the coyote window. Returns whether it happened.
pub fn try_jump(ball: &mut BallState, abilities: &AbilityState, now: u64, tuning: &Tuning) -> bool {
    if abilities.sleep_active || !ball.can_jump(now, tuning.coyote_ms) {
        return false;
    }
    ball.vel.y = tuning.jump_force;
    ball.grounded = false;
    ball.jumping = true;
    true
}
