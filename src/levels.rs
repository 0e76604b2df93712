//! Level catalog
//!
//! Level descriptors keyed by id, loaded from a JSON array. Lookups hand out
//! copies; the simulation never sees the catalog itself.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::sim::{Enemy, LevelDescriptor, Platform, PlatformKind, Portal};

#[derive(Debug, Clone, Default)]
pub struct LevelCatalog {
    levels: BTreeMap<u32, LevelDescriptor>,
}

impl LevelCatalog {
    pub fn new(levels: impl IntoIterator<Item = LevelDescriptor>) -> Self {
        Self {
            levels: levels.into_iter().map(|l| (l.id, l)).collect(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let levels: Vec<LevelDescriptor> = serde_json::from_str(json)?;
        Ok(Self::new(levels))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let catalog = Self::from_json(&std::fs::read_to_string(path)?)?;
        log::info!("Loaded {} levels from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Copy of the level with this id
    pub fn get_level(&self, id: u32) -> Result<LevelDescriptor> {
        self.levels.get(&id).cloned().ok_or(Error::LevelNotFound(id))
    }

    /// Levels in ascending id order
    pub fn all(&self) -> impl Iterator<Item = &LevelDescriptor> {
        self.levels.values()
    }

    pub fn next_level_id(&self, id: u32) -> Option<u32> {
        self.levels.range(id + 1..).next().map(|(&next, _)| next)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Small built-in set for the headless driver
    pub fn demo() -> Self {
        let platform = |x, y, width, height, kind| Platform {
            x,
            y,
            width,
            height,
            kind,
        };
        Self::new([
            LevelDescriptor {
                id: 1,
                name: Some("First Bounce".into()),
                platforms: vec![
                    platform(220.0, 420.0, 140.0, 16.0, PlatformKind::Platform),
                    platform(300.0, 380.0, 24.0, 24.0, PlatformKind::Obstacle),
                ],
                portal: Some(Portal { x: 620.0, y: 420.0 }),
                enemies: Vec::new(),
                par_time: 10.0,
                background_theme: "nature".into(),
            },
            LevelDescriptor {
                id: 2,
                name: Some("Goblin Gate".into()),
                platforms: vec![platform(
                    420.0,
                    380.0,
                    30.0,
                    40.0,
                    PlatformKind::Obstacle,
                )],
                portal: Some(Portal { x: 700.0, y: 420.0 }),
                enemies: vec![Enemy {
                    x: 260.0,
                    y: 460.0,
                    width: 40.0,
                    height: 40.0,
                    kind: "goblin".into(),
                    health: Some(60),
                }],
                par_time: 15.0,
                background_theme: "forest".into(),
            },
        ])
    }
}
