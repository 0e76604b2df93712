//! Turn-based enemy encounters
//!
//! `Idle -> Active(Player) -> Active(Enemy) -> Active(Player) | resolved`.
//! Damage rolls come from an injected RNG so encounters replay exactly.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::level::Enemy;

/// Whose move it is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Turn {
    Player,
    Enemy,
}

/// One active encounter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    /// Unique within a simulation; tags the enemy-turn task
    pub id: u32,
    /// Index into the attempt's enemy list
    pub enemy_index: usize,
    pub enemy: Enemy,
    pub player_health: i32,
    pub enemy_health: i32,
    pub turn: Turn,
    /// Where the ball was before the contact tick
    pub pre_combat_pos: Vec2,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum CombatState {
    #[default]
    Idle,
    Active(Encounter),
}

/// How an attack left the encounter
#[derive(Debug, Clone, PartialEq)]
pub enum StrikeOutcome {
    /// Encounter continues; turn has passed to the other side
    Continue,
    Victory(Encounter),
    Defeat(Encounter),
}

/// Result of an attack that was accepted
#[derive(Debug, Clone, PartialEq)]
pub struct Strike {
    pub damage: i32,
    pub outcome: StrikeOutcome,
}

/// Uniform integer damage in `[lo, hi]`
pub fn roll_damage<R: Rng + ?Sized>(rng: &mut R, (lo, hi): (i32, i32)) -> i32 {
    rng.random_range(lo..=hi)
}

impl CombatState {
    pub fn is_idle(&self) -> bool {
        matches!(self, CombatState::Idle)
    }

    pub fn encounter(&self) -> Option<&Encounter> {
        match self {
            CombatState::Active(encounter) => Some(encounter),
            CombatState::Idle => None,
        }
    }

    /// Start an encounter. Ignored if one is already running.
    pub fn begin(
        &mut self,
        id: u32,
        enemy_index: usize,
        enemy: &Enemy,
        pre_combat_pos: Vec2,
        max_health: i32,
    ) -> bool {
        if !self.is_idle() {
            return false;
        }
        let enemy_health = enemy.health.unwrap_or(max_health).clamp(0, max_health);
        *self = CombatState::Active(Encounter {
            id,
            enemy_index,
            enemy: enemy.clone(),
            player_health: max_health,
            enemy_health,
            turn: Turn::Player,
            pre_combat_pos,
        });
        true
    }

    /// Player attack; `None` unless it is the player's turn
    pub fn player_attack<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        range: (i32, i32),
        max_health: i32,
    ) -> Option<Strike> {
        let CombatState::Active(encounter) = self else {
            return None;
        };
        if encounter.turn != Turn::Player {
            return None;
        }
        let damage = roll_damage(rng, range);
        encounter.enemy_health = (encounter.enemy_health - damage).clamp(0, max_health);
        encounter.turn = Turn::Enemy;
        Some(self.settle(damage))
    }

    /// Enemy attack for encounter `id`; `None` if that encounter is gone or
    /// it is not the enemy's turn
    pub fn enemy_attack<R: Rng + ?Sized>(
        &mut self,
        id: u32,
        rng: &mut R,
        range: (i32, i32),
        max_health: i32,
    ) -> Option<Strike> {
        let CombatState::Active(encounter) = self else {
            return None;
        };
        if encounter.id != id || encounter.turn != Turn::Enemy {
            return None;
        }
        let damage = roll_damage(rng, range);
        encounter.player_health = (encounter.player_health - damage).clamp(0, max_health);
        encounter.turn = Turn::Player;
        Some(self.settle(damage))
    }

    /// Check resolution after a health change
    fn settle(&mut self, damage: i32) -> Strike {
        let (enemy_down, player_down) = match self {
            CombatState::Active(e) => (e.enemy_health <= 0, e.player_health <= 0),
            CombatState::Idle => (false, false),
        };
        let outcome = if enemy_down || player_down {
            match std::mem::take(self) {
                CombatState::Active(e) if enemy_down => StrikeOutcome::Victory(e),
                CombatState::Active(e) => StrikeOutcome::Defeat(e),
                CombatState::Idle => StrikeOutcome::Continue,
            }
        } else {
            StrikeOutcome::Continue
        };
        Strike { damage, outcome }
    }
}
