//! Level progress book
//!
//! Best time, best star rating and attempt count per level. Completing a
//! level with at least one star unlocks the next one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Highest level id; nothing unlocks past it
pub const MAX_LEVEL: u32 = 20;

/// Stars for a completion time: 3 within par, 2 within 1.5x par, else 1.
/// Levels without a par time always give 1 star.
pub fn star_rating(elapsed_secs: f32, par_time: f32) -> u8 {
    if par_time <= 0.0 {
        return 1;
    }
    if elapsed_secs <= par_time {
        3
    } else if elapsed_secs <= par_time * 1.5 {
        2
    } else {
        1
    }
}

/// One finished run, as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub stars: u8,
    pub time_secs: u32,
}

/// Progress for one level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    pub level_id: u32,
    pub best_time_secs: Option<u32>,
    pub stars: u8,
    pub unlocked: bool,
    pub attempts: u32,
}

impl LevelProgress {
    fn locked(level_id: u32) -> Self {
        Self {
            level_id,
            best_time_secs: None,
            stars: 0,
            unlocked: false,
            attempts: 0,
        }
    }
}

/// Progress for every level the player has touched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressBook {
    levels: BTreeMap<u32, LevelProgress>,
}

impl Default for ProgressBook {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressBook {
    /// Fresh book with level 1 unlocked
    pub fn new() -> Self {
        let mut levels = BTreeMap::new();
        levels.insert(
            1,
            LevelProgress {
                unlocked: true,
                ..LevelProgress::locked(1)
            },
        );
        Self { levels }
    }

    pub fn get(&self, level_id: u32) -> Option<&LevelProgress> {
        self.levels.get(&level_id)
    }

    pub fn is_unlocked(&self, level_id: u32) -> bool {
        self.levels.get(&level_id).is_some_and(|p| p.unlocked)
    }

    pub fn total_stars(&self) -> u32 {
        self.levels.values().map(|p| p.stars as u32).sum()
    }

    /// Merge a completion: best time and stars are kept, attempts accumulate
    pub fn record_completion(&mut self, level_id: u32, completion: Completion) -> &LevelProgress {
        let stars = completion.stars.min(3);
        {
            let entry = self
                .levels
                .entry(level_id)
                .or_insert_with(|| LevelProgress::locked(level_id));
            entry.unlocked = true;
            entry.attempts += 1;
            entry.stars = entry.stars.max(stars);
            entry.best_time_secs = Some(match entry.best_time_secs {
                Some(best) => best.min(completion.time_secs),
                None => completion.time_secs,
            });
        }

        if stars > 0 && level_id < MAX_LEVEL {
            let next = self
                .levels
                .entry(level_id + 1)
                .or_insert_with(|| LevelProgress::locked(level_id + 1));
            if !next.unlocked {
                next.unlocked = true;
                log::info!("Level {} unlocked", level_id + 1);
            }
        }

        &self.levels[&level_id]
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
