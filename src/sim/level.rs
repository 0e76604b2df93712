//! Level descriptor: static geometry consumed by the simulation
//!
//! Deserializes from the level JSON shape used by the level catalog. Optional
//! features (portal, enemies, enemy health) are simply absent when missing.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::Aabb;

/// Default enemy box side when a level omits it
pub const DEFAULT_ENEMY_SIZE: f32 = 40.0;

/// Platform types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    /// Solid top the ball can land on
    #[default]
    Platform,
    /// Touching it ends the run (unless asleep)
    Obstacle,
}

/// A rectangular platform or obstacle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(rename = "type", default)]
    pub kind: PlatformKind,
}

impl Platform {
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.x, self.y, self.width, self.height)
    }
}

/// The goal portal (x, y is its center)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Portal {
    pub x: f32,
    pub y: f32,
}

impl Portal {
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

fn default_enemy_size() -> f32 {
    DEFAULT_ENEMY_SIZE
}

/// An enemy that starts an encounter on contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub x: f32,
    pub y: f32,
    #[serde(default = "default_enemy_size")]
    pub width: f32,
    #[serde(default = "default_enemy_size")]
    pub height: f32,
    /// Presentation tag ("goblin", "dragon", ...)
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Starting health; encounters treat `None` as full health
    #[serde(default)]
    pub health: Option<i32>,
}

impl Enemy {
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.x, self.y, self.width, self.height)
    }
}

/// Immutable per-level description
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDescriptor {
    #[serde(rename = "Id", alias = "id", default)]
    pub id: u32,
    #[serde(default)]
    pub name: Option<String>,
    /// Checked in list order; first match wins
    #[serde(default)]
    pub platforms: Vec<Platform>,
    #[serde(default)]
    pub portal: Option<Portal>,
    #[serde(default)]
    pub enemies: Vec<Enemy>,
    /// Seconds; used for star rating
    #[serde(default)]
    pub par_time: f32,
    #[serde(default)]
    pub background_theme: String,
}

impl LevelDescriptor {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn has_enemies(&self) -> bool {
        !self.enemies.is_empty()
    }
}
