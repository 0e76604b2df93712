//! Bounce Quest headless driver
//!
//! Plays one level at the fixed cadence with a simple autopilot and logs
//! the outcome.
//!
//! Usage: `bounce-quest [levels.json|-] [level-id] [tuning.json]`

use bounce_quest::sim::{
    Effect, EventQueue, LevelDescriptor, LifecycleEvent, PlatformKind, RunStatus, Simulation,
    Turn, Viewport,
};
use bounce_quest::{Completion, LevelCatalog, ProgressBook, Tuning};

/// Attempts before giving up on a level
const MAX_ATTEMPTS: u32 = 5;
/// Frames before an attempt counts as stuck (about a minute of play)
const MAX_FRAMES: u32 = 3750;
/// Jump once the portal is this close ahead (horizontal, center to center)
const PORTAL_JUMP_RANGE: f32 = 40.0;
/// How many ticks ahead the autopilot looks for obstacles in the air
const LOOKAHEAD_TICKS: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Jump,
    Reverse,
    Attack,
}

/// Picks at most one command per frame from the current state
fn autopilot(sim: &Simulation) -> Option<Command> {
    if let Some(encounter) = sim.combat().encounter() {
        return (encounter.turn == Turn::Player).then_some(Command::Attack);
    }

    let tuning = sim.tuning();
    let ball = sim.ball();
    let size = tuning.ball_size;

    // Obstacles only bite while airborne; turn away from one in the path
    if !ball.grounded {
        let mut ahead = ball.bounds(size);
        ahead.min += ball.vel * LOOKAHEAD_TICKS;
        let hit = sim
            .level()
            .platforms
            .iter()
            .any(|p| p.kind == PlatformKind::Obstacle && p.bounds().overlaps(&ahead));
        if hit {
            return Some(Command::Reverse);
        }
    }

    if ball.grounded {
        if let Some(portal) = sim.level().portal {
            let dir = if ball.reversed { -1.0 } else { 1.0 };
            let dx = (portal.x - ball.center(size).x) * dir;
            if dx > 0.0 && dx <= PORTAL_JUMP_RANGE {
                return Some(Command::Jump);
            }
        }
    }
    None
}

/// Outcome of one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Completed(Completion),
    Failed,
    Stuck,
}

fn play_attempt(sim: &mut Simulation) -> Attempt {
    let tick_ms = sim.tuning().tick_ms;
    for _ in 0..MAX_FRAMES {
        match autopilot(sim) {
            Some(Command::Jump) => {
                sim.jump();
            }
            Some(Command::Reverse) => {
                sim.toggle_reverse();
            }
            Some(Command::Attack) => {
                sim.attack();
            }
            None => {}
        }
        sim.advance(tick_ms);

        for effect in sim.drain_effects() {
            match effect {
                Effect::EnemyHit { damage } => log::debug!("Enemy takes {} damage", damage),
                Effect::PlayerHit { damage } => log::debug!("Ball takes {} damage", damage),
                Effect::Explosion { pos } => log::debug!("Explosion at {:?}", pos),
                _ => {}
            }
        }

        for event in sim.handler_mut().drain() {
            match event {
                LifecycleEvent::LevelComplete(result) => {
                    return Attempt::Completed(Completion {
                        stars: result.stars,
                        time_secs: (result.elapsed_ms / 1000) as u32,
                    });
                }
                LifecycleEvent::GameOver(_) => return Attempt::Failed,
                LifecycleEvent::Score(delta) => log::info!("Score +{}", delta),
            }
        }

        if sim.status() != RunStatus::Playing {
            break;
        }
    }
    Attempt::Stuck
}

fn play_level(
    level: LevelDescriptor,
    tuning: Tuning,
    seed: u64,
    book: &mut ProgressBook,
) -> Option<Completion> {
    let id = level.id;
    let mut sim = Simulation::new(
        level,
        Viewport::default(),
        tuning,
        seed,
        EventQueue::default(),
    );

    for attempt in 1..=MAX_ATTEMPTS {
        match play_attempt(&mut sim) {
            Attempt::Completed(completion) => {
                let progress = book.record_completion(id, completion);
                log::info!(
                    "Level {} cleared on attempt {}: {} stars, best {:?}s",
                    id,
                    attempt,
                    completion.stars,
                    progress.best_time_secs
                );
                return Some(completion);
            }
            Attempt::Failed => log::warn!("Attempt {} failed", attempt),
            Attempt::Stuck => log::warn!("Attempt {} stalled, restarting", attempt),
        }
        sim.restart();
    }

    log::warn!(
        "Level {} not cleared after {} attempts ({} deaths)",
        id,
        MAX_ATTEMPTS,
        sim.run().death_count
    );
    None
}

fn run() -> bounce_quest::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let catalog = match args.first().map(String::as_str) {
        Some(path) if path != "-" => LevelCatalog::load(path)?,
        _ => LevelCatalog::demo(),
    };
    let level_id = match args.get(1) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("Invalid level id {:?}, using 1", raw);
            1
        }),
        None => 1,
    };
    let tuning = args.get(2).map(Tuning::load).unwrap_or_default();

    let level = catalog.get_level(level_id)?;
    log::info!(
        "Playing level {} ({})",
        level.id,
        level.name.as_deref().unwrap_or("untitled")
    );

    let mut book = ProgressBook::new();
    if play_level(level, tuning, u64::from(level_id), &mut book).is_some() {
        if let Some(next) = catalog.next_level_id(level_id) {
            log::info!(
                "Next level {} is {}",
                next,
                if book.is_unlocked(next) { "unlocked" } else { "locked" }
            );
        }
    }
    log::debug!("Progress: {}", book.to_json()?);
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Bounce Quest (headless) starting...");

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Hosts on wasm embed the library directly
}
