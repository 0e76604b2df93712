//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only, simulation clock only
//! - Seeded RNG only
//! - Stable iteration order (level list order)
//! - No rendering or platform dependencies

pub mod abilities;
pub mod collision;
pub mod combat;
pub mod level;
pub mod simulation;
pub mod state;
pub mod tick;
pub mod timers;

pub use abilities::AbilityState;
pub use collision::{Arena, Outcome, Probe, resolve};
pub use combat::{CombatState, Encounter, Strike, StrikeOutcome, Turn, roll_damage};
pub use level::{Enemy, LevelDescriptor, Platform, PlatformKind, Portal};
pub use simulation::{
    Callbacks, EventQueue, LifecycleHandler, MAX_PENDING_EFFECTS, Simulation, create_simulation,
};
pub use state::{
    BallState, Effect, GameOverCause, LevelResult, LifecycleEvent, RunState, RunStatus,
    SimSnapshot, Viewport,
};
pub use tick::{TickContext, TickOutcome, tick, try_jump};
pub use timers::{TaskId, TaskKind, TaskRegistry};
