//! Collision resolution against level geometry
//!
//! A pure function of the proposed ball position and the level: enemies are
//! checked first (contact pre-empts movement for the tick), then the ground
//! plane, then platforms/obstacles in list order, then the portal.

use glam::Vec2;

use super::level::{Enemy, Platform, PlatformKind, Portal};
use crate::Aabb;

/// What the proposed move runs into
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    NoCollision,
    /// Touched the enemy at `index`; `snap` puts the ball on its top edge
    EnemyContact { index: usize, snap: Vec2 },
    /// Reached the ground line; `y` is the resting ball y
    Grounded { y: f32 },
    /// Fell onto the top of a platform
    Landed { index: usize, y: f32 },
    /// Hit an obstacle without invulnerability
    Obstacle { index: usize },
    GoalReached,
}

/// The proposed move for this tick
#[derive(Debug, Clone, Copy)]
pub struct Probe {
    /// Proposed top-left corner
    pub pos: Vec2,
    /// Current vertical velocity (positive is falling)
    pub vy: f32,
    pub size: f32,
    pub sleep_active: bool,
    pub combat_idle: bool,
}

impl Probe {
    fn bounds(&self) -> Aabb {
        Aabb::new(self.pos.x, self.pos.y, self.size, self.size)
    }
}

/// Geometry the ball can collide with
#[derive(Debug, Clone, Copy)]
pub struct Arena<'a> {
    pub platforms: &'a [Platform],
    pub portal: Option<&'a Portal>,
    /// Remaining enemies for this attempt
    pub enemies: &'a [Enemy],
    pub ground_y: f32,
    pub portal_radius: f32,
}

/// Resolve a proposed move against the arena.
///
/// The ground check returns before platforms and the portal are looked at,
/// so a ball resting on the ground line never reaches a portal or touches an
/// obstacle there. Both only register while the ball is in the air.
pub fn resolve(probe: &Probe, arena: &Arena<'_>) -> Outcome {
    let ball = probe.bounds();

    if probe.combat_idle {
        if let Some((index, enemy)) = arena
            .enemies
            .iter()
            .enumerate()
            .find(|(_, e)| ball.overlaps(&e.bounds()))
        {
            return Outcome::EnemyContact {
                index,
                snap: Vec2::new(probe.pos.x, enemy.y - probe.size),
            };
        }
    }

    let rest_y = arena.ground_y - probe.size;
    if probe.pos.y >= rest_y {
        return Outcome::Grounded { y: rest_y };
    }

    for (index, platform) in arena.platforms.iter().enumerate() {
        let rect = platform.bounds();
        if !ball.overlaps(&rect) {
            continue;
        }
        match platform.kind {
            // Sleep only protects against obstacles; it never passes through platforms
            PlatformKind::Obstacle if !probe.sleep_active => {
                return Outcome::Obstacle { index };
            }
            PlatformKind::Obstacle => {}
            PlatformKind::Platform => {
                // Land only when falling onto the top; no tunneling from below
                if probe.vy > 0.0 && ball.top() < rect.top() {
                    return Outcome::Landed {
                        index,
                        y: rect.top() - probe.size,
                    };
                }
            }
        }
    }

    if let Some(portal) = arena.portal {
        if ball.center().distance(portal.center()) < arena.portal_radius {
            return Outcome::GoalReached;
        }
    }

    Outcome::NoCollision
}
