//! Simulation controller
//!
//! Owns every piece of per-attempt state and is the only writer to it.
//! Hosts push commands (jump, sleep, reverse, attack), drive time with
//! `advance`/`tick`, render from `snapshot`, and receive lifecycle callbacks
//! through a [`LifecycleHandler`].

use glam::Vec2;
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg32;

use super::abilities::AbilityState;
use super::combat::{CombatState, StrikeOutcome};
use super::level::{Enemy, LevelDescriptor};
use super::state::{
    BallState, Effect, GameOverCause, LevelResult, LifecycleEvent, RunState, RunStatus,
    SimSnapshot, Viewport,
};
use super::tick::{TickContext, TickOutcome, tick, try_jump};
use super::timers::{TaskKind, TaskRegistry};
use crate::progress::star_rating;
use crate::tuning::Tuning;

/// Undrained effects kept before the oldest are dropped
pub const MAX_PENDING_EFFECTS: usize = 256;

/// Receives the three lifecycle events
pub trait LifecycleHandler {
    fn on_level_complete(&mut self, _result: LevelResult) {}
    fn on_game_over(&mut self, _cause: GameOverCause) {}
    fn on_score(&mut self, _delta: i64) {}
}

/// Collects events for hosts that poll instead of reacting
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<LifecycleEvent>,
}

impl EventQueue {
    pub fn events(&self) -> &[LifecycleEvent] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<LifecycleEvent> {
        std::mem::take(&mut self.events)
    }
}

impl LifecycleHandler for EventQueue {
    fn on_level_complete(&mut self, result: LevelResult) {
        self.events.push(LifecycleEvent::LevelComplete(result));
    }

    fn on_game_over(&mut self, cause: GameOverCause) {
        self.events.push(LifecycleEvent::GameOver(cause));
    }

    fn on_score(&mut self, delta: i64) {
        self.events.push(LifecycleEvent::Score(delta));
    }
}

/// Three closures as a handler
pub struct Callbacks<C, G, S> {
    pub on_level_complete: C,
    pub on_game_over: G,
    pub on_score: S,
}

impl<C, G, S> LifecycleHandler for Callbacks<C, G, S>
where
    C: FnMut(LevelResult),
    G: FnMut(GameOverCause),
    S: FnMut(i64),
{
    fn on_level_complete(&mut self, result: LevelResult) {
        (self.on_level_complete)(result)
    }

    fn on_game_over(&mut self, cause: GameOverCause) {
        (self.on_game_over)(cause)
    }

    fn on_score(&mut self, delta: i64) {
        (self.on_score)(delta)
    }
}

/// Build a simulation with default tuning that reports through closures.
///
/// Cosmetic effects still queue up; hosts should call
/// [`Simulation::drain_effects`] every frame. Undrained effects are capped at
/// [`MAX_PENDING_EFFECTS`], oldest dropped first.
pub fn create_simulation<C, G, S>(
    level: LevelDescriptor,
    viewport: Viewport,
    on_level_complete: C,
    on_game_over: G,
    on_score: S,
) -> Simulation<Callbacks<C, G, S>>
where
    C: FnMut(LevelResult),
    G: FnMut(GameOverCause),
    S: FnMut(i64),
{
    Simulation::new(
        level,
        viewport,
        Tuning::default(),
        0,
        Callbacks {
            on_level_complete,
            on_game_over,
            on_score,
        },
    )
}

/// Damage rolls of one attempt never depend on earlier attempts
fn attempt_rng(seed: u64, attempt: u32) -> Pcg32 {
    Pcg32::seed_from_u64(seed.wrapping_add(u64::from(attempt) - 1))
}

/// The simulation core for one level
pub struct Simulation<H: LifecycleHandler = EventQueue> {
    level: LevelDescriptor,
    /// Copy of the level's enemies; defeated ones are removed here only
    enemies: Vec<Enemy>,
    tuning: Tuning,
    viewport: Viewport,
    ball: BallState,
    abilities: AbilityState,
    combat: CombatState,
    run: RunState,
    /// Attempt-relative clock; advances only while playing
    clock_ms: u64,
    accumulator_ms: u64,
    tasks: TaskRegistry,
    next_encounter: u32,
    /// Set for seeded simulations; every attempt re-seeds from it
    seed: Option<u64>,
    rng: Box<dyn RngCore>,
    effects: Vec<Effect>,
    handler: H,
}

impl<H: LifecycleHandler> Simulation<H> {
    /// Start the first attempt with a seeded RNG
    pub fn new(
        level: LevelDescriptor,
        viewport: Viewport,
        tuning: Tuning,
        seed: u64,
        handler: H,
    ) -> Self {
        let mut sim = Self::with_rng(
            level,
            viewport,
            tuning,
            Box::new(attempt_rng(seed, 1)),
            handler,
        );
        sim.seed = Some(seed);
        sim
    }

    /// Start the first attempt with a caller-supplied random source.
    /// The source is shared by all attempts; it is never re-seeded.
    pub fn with_rng(
        level: LevelDescriptor,
        viewport: Viewport,
        tuning: Tuning,
        rng: Box<dyn RngCore>,
        handler: H,
    ) -> Self {
        let mut sim = Self {
            enemies: Vec::new(),
            ball: BallState::spawn(&tuning, viewport, 0),
            level,
            tuning,
            viewport,
            abilities: AbilityState::default(),
            combat: CombatState::Idle,
            run: RunState::default(),
            clock_ms: 0,
            accumulator_ms: 0,
            tasks: TaskRegistry::new(),
            next_encounter: 1,
            seed: None,
            rng,
            effects: Vec::new(),
            handler,
        };
        sim.start_attempt();
        sim
    }

    // === Lifecycle ===

    fn start_attempt(&mut self) {
        self.run.attempt += 1;
        if let Some(seed) = self.seed {
            self.rng = Box::new(attempt_rng(seed, self.run.attempt));
        }
        self.tasks.clear();
        self.clock_ms = 0;
        self.accumulator_ms = 0;
        self.ball = BallState::spawn(&self.tuning, self.viewport, self.clock_ms);
        self.abilities = AbilityState::default();
        self.combat = CombatState::Idle;
        self.enemies = self.level.enemies.clone();
        self.effects.clear();
        self.run.status = RunStatus::Playing;
        self.run.score = 0;
        self.run.elapsed_ms = 0;
        log::info!(
            "Level {} attempt {} started ({} enemies)",
            self.level.id,
            self.run.attempt,
            self.enemies.len()
        );
    }

    /// Begin a fresh attempt from any state
    pub fn restart(&mut self) {
        self.start_attempt();
    }

    pub fn pause(&mut self) -> bool {
        if self.run.status != RunStatus::Playing {
            return false;
        }
        self.run.status = RunStatus::Paused;
        self.accumulator_ms = 0;
        log::debug!("Paused at {} ms", self.clock_ms);
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.run.status != RunStatus::Paused {
            return false;
        }
        self.run.status = RunStatus::Playing;
        log::debug!("Resumed at {} ms", self.clock_ms);
        true
    }

    /// New viewport; picked up by the next tick
    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport = Viewport::new(width, height);
    }

    fn fail(&mut self, cause: GameOverCause) {
        self.run.status = RunStatus::Failed;
        self.run.death_count += 1;
        self.tasks.clear();
        self.combat = CombatState::Idle;
        log::info!(
            "Game over on level {} ({:?}), deaths: {}",
            self.level.id,
            cause,
            self.run.death_count
        );
        self.handler.on_game_over(cause);
    }

    fn complete(&mut self) {
        self.run.status = RunStatus::Completed;
        self.tasks.clear();
        let result = LevelResult {
            level_id: self.level.id,
            elapsed_ms: self.run.elapsed_ms,
            // Rated on whole seconds, the same value hosts persist
            stars: star_rating((self.run.elapsed_ms / 1000) as f32, self.level.par_time),
        };
        log::info!(
            "Level {} complete in {} ms ({} stars)",
            result.level_id,
            result.elapsed_ms,
            result.stars
        );
        self.handler.on_level_complete(result);
    }

    // === Time ===

    /// Feed host time; runs as many fixed ticks as fit (bounded). Returns ticks run.
    pub fn advance(&mut self, elapsed_ms: u64) -> u32 {
        if self.run.status != RunStatus::Playing {
            return 0;
        }
        let tick_ms = self.tuning.tick_ms;
        let budget = tick_ms * self.tuning.max_substeps as u64;
        self.accumulator_ms += elapsed_ms.min(budget);

        let mut substeps = 0;
        while self.accumulator_ms >= tick_ms && substeps < self.tuning.max_substeps {
            self.tick();
            self.accumulator_ms -= tick_ms;
            substeps += 1;
            if self.run.status != RunStatus::Playing {
                self.accumulator_ms = 0;
                break;
            }
        }
        substeps
    }

    /// Run exactly one fixed step
    pub fn tick(&mut self) {
        if self.run.status != RunStatus::Playing {
            return;
        }
        self.clock_ms += self.tuning.tick_ms;
        self.run.elapsed_ms += self.tuning.tick_ms;

        self.fire_due_tasks();
        if self.run.status != RunStatus::Playing || !self.combat.is_idle() {
            return;
        }

        let ctx = TickContext {
            tuning: &self.tuning,
            viewport: self.viewport,
            level: &self.level,
            enemies: &self.enemies,
            combat_idle: self.combat.is_idle(),
            now: self.clock_ms,
        };
        match tick(&mut self.ball, &mut self.abilities, &ctx, &mut self.effects) {
            TickOutcome::Continue => {}
            TickOutcome::EnemyContact {
                index,
                pre_combat_pos,
            } => self.enter_combat(index, pre_combat_pos),
            TickOutcome::GoalReached => self.complete(),
            TickOutcome::GameOver(cause) => self.fail(cause),
        }
        self.trim_effects();
    }

    fn trim_effects(&mut self) {
        if self.effects.len() > MAX_PENDING_EFFECTS {
            let excess = self.effects.len() - MAX_PENDING_EFFECTS;
            self.effects.drain(..excess);
        }
    }

    fn fire_due_tasks(&mut self) {
        while let Some(kind) = self.tasks.pop_due(self.run.attempt, self.clock_ms) {
            match kind {
                TaskKind::SleepExpiry => {
                    if self.abilities.end_sleep() {
                        self.effects.push(Effect::SleepEnded);
                    }
                }
                TaskKind::JumpSettled => self.ball.jumping = false,
                TaskKind::EnemyTurn { encounter } => self.enemy_turn(encounter),
            }
            if self.run.status != RunStatus::Playing {
                break;
            }
        }
    }

    // === Combat ===

    fn enter_combat(&mut self, index: usize, pre_combat_pos: Vec2) {
        let Some(enemy) = self.enemies.get(index) else {
            return;
        };
        let id = self.next_encounter;
        if self
            .combat
            .begin(id, index, enemy, pre_combat_pos, self.tuning.max_health)
        {
            self.next_encounter += 1;
            self.effects.push(Effect::EncounterStarted { enemy_index: index });
            log::info!("Encounter {} started against {:?}", id, enemy.kind);
        }
    }

    fn enemy_turn(&mut self, encounter: u32) {
        let Some(strike) = self.combat.enemy_attack(
            encounter,
            &mut *self.rng,
            self.tuning.enemy_damage,
            self.tuning.max_health,
        ) else {
            log::debug!("Ignoring enemy turn for finished encounter {}", encounter);
            return;
        };
        self.effects.push(Effect::PlayerHit {
            damage: strike.damage,
        });
        if let StrikeOutcome::Defeat(e) = strike.outcome {
            log::info!("Encounter {} lost", e.id);
            self.fail(GameOverCause::Defeated);
        }
    }

    // === Commands ===

    /// Jump (grounded or within the coyote window)
    pub fn jump(&mut self) -> bool {
        if self.run.status != RunStatus::Playing || !self.combat.is_idle() {
            return false;
        }
        if !try_jump(&mut self.ball, &self.abilities, self.clock_ms, &self.tuning) {
            log::debug!("Jump rejected at {} ms", self.clock_ms);
            return false;
        }
        self.tasks
            .cancel_where(|k| matches!(k, TaskKind::JumpSettled));
        self.tasks.schedule(
            self.run.attempt,
            self.clock_ms + self.tuning.jump_anim_ms,
            TaskKind::JumpSettled,
        );
        self.effects.push(Effect::Jumped {
            pos: self.ball.center(self.tuning.ball_size),
        });
        true
    }

    /// Use the one-shot sleep ability
    pub fn toggle_sleep(&mut self) -> bool {
        let Some(expires_at) =
            self.abilities
                .activate_sleep(self.run.status, self.clock_ms, self.tuning.sleep_ms)
        else {
            return false;
        };
        self.tasks
            .schedule(self.run.attempt, expires_at, TaskKind::SleepExpiry);
        self.effects.push(Effect::SleepStarted {
            pos: self.ball.center(self.tuning.ball_size),
        });
        log::info!("Sleep active until {} ms", expires_at);
        true
    }

    /// Flip horizontal direction
    pub fn toggle_reverse(&mut self) -> bool {
        if !self
            .abilities
            .toggle_reverse(&mut self.ball, self.run.status)
        {
            return false;
        }
        self.effects.push(Effect::DirectionChanged {
            pos: self.ball.center(self.tuning.ball_size),
            reversed: self.abilities.reversed,
        });
        true
    }

    /// Attack during the player's turn
    pub fn attack(&mut self) -> bool {
        if self.run.status != RunStatus::Playing {
            return false;
        }
        let Some(strike) = self.combat.player_attack(
            &mut *self.rng,
            self.tuning.player_damage,
            self.tuning.max_health,
        ) else {
            return false;
        };
        self.effects.push(Effect::EnemyHit {
            damage: strike.damage,
        });
        match strike.outcome {
            StrikeOutcome::Continue => {
                if let Some(e) = self.combat.encounter() {
                    self.tasks.schedule(
                        self.run.attempt,
                        self.clock_ms + self.tuning.enemy_think_ms,
                        TaskKind::EnemyTurn { encounter: e.id },
                    );
                }
            }
            StrikeOutcome::Victory(e) => {
                self.tasks
                    .cancel_where(|k| matches!(k, TaskKind::EnemyTurn { .. }));
                if e.enemy_index < self.enemies.len() {
                    self.enemies.remove(e.enemy_index);
                }
                self.ball.pos = e.pre_combat_pos;
                self.ball.vel.y = 0.0;
                self.effects.push(Effect::EnemyDefeated {
                    pos: e.enemy.bounds().center(),
                });
                let bonus = self.tuning.victory_bonus;
                self.run.score += bonus;
                log::info!("Encounter {} won, +{} points", e.id, bonus);
                self.handler.on_score(bonus);
            }
            StrikeOutcome::Defeat(_) => self.fail(GameOverCause::Defeated),
        }
        true
    }

    // === Read-only access ===

    pub fn snapshot(&self) -> SimSnapshot {
        SimSnapshot {
            ball: self.ball.clone(),
            abilities: self.abilities.clone(),
            combat: self.combat.clone(),
            run: self.run.clone(),
            enemies: self.enemies.clone(),
            viewport: self.viewport,
            clock_ms: self.clock_ms,
        }
    }

    /// Cosmetic effects since the last drain
    pub fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn ball(&self) -> &BallState {
        &self.ball
    }

    pub fn abilities(&self) -> &AbilityState {
        &self.abilities
    }

    pub fn combat(&self) -> &CombatState {
        &self.combat
    }

    pub fn run(&self) -> &RunState {
        &self.run
    }

    pub fn status(&self) -> RunStatus {
        self.run.status
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub fn level(&self) -> &LevelDescriptor {
        &self.level
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::combat::Turn;
    use crate::sim::level::{Platform, PlatformKind, Portal};
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn sim(level: LevelDescriptor, seed: u64) -> Simulation {
        Simulation::new(
            level,
            Viewport::default(),
            Tuning::default(),
            seed,
            EventQueue::default(),
        )
    }

    fn run_ticks<H: LifecycleHandler>(sim: &mut Simulation<H>, n: usize) {
        for _ in 0..n {
            sim.tick();
        }
    }

    fn goblin(x: f32, y: f32, health: i32) -> Enemy {
        Enemy {
            x,
            y,
            width: 40.0,
            height: 40.0,
            kind: "goblin".into(),
            health: Some(health),
        }
    }

    /// Enemy the ball touches on its first tick
    fn level_with_adjacent_enemy(health: i32) -> LevelDescriptor {
        LevelDescriptor {
            id: 3,
            enemies: vec![goblin(60.0, 450.0, health), goblin(600.0, 450.0, 80)],
            ..Default::default()
        }
    }

    /// Hazard the ball rolls under but hits on a jump
    fn obstacle_level() -> LevelDescriptor {
        LevelDescriptor {
            id: 2,
            platforms: vec![Platform {
                x: 80.0,
                y: 400.0,
                width: 20.0,
                height: 70.0,
                kind: PlatformKind::Obstacle,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_initial_state() {
        let sim = sim(LevelDescriptor::default(), 1);
        assert_eq!(sim.status(), RunStatus::Playing);
        assert_eq!(sim.ball().pos, Vec2::new(50.0, 476.0));
        assert_eq!(sim.ball().vel.x, 2.5);
        assert!(sim.combat().is_idle());
        assert_eq!(sim.run().attempt, 1);
    }

    #[test]
    fn test_gravity_while_playing() {
        let mut sim = sim(LevelDescriptor::default(), 1);
        assert!(sim.jump());
        let vy = sim.ball().vel.y;
        sim.tick();
        assert_eq!(sim.ball().vel.y, vy + 0.5);
    }

    #[test]
    fn test_advance_runs_fixed_ticks() {
        let mut sim = sim(LevelDescriptor::default(), 1);
        assert_eq!(sim.advance(40), 2);
        assert_eq!(sim.clock_ms(), 32);
        assert_eq!(sim.advance(10), 1);
        assert_eq!(sim.clock_ms(), 48);
        // Large frame gaps are capped
        assert_eq!(sim.advance(10_000), 8);
    }

    #[test]
    fn test_coyote_jump_accepted_at_100ms() {
        let mut sim = sim(LevelDescriptor::default(), 1);
        sim.ball.pos.y = 100.0;
        sim.ball.grounded = false;
        sim.ball.last_grounded_at = sim.clock_ms;
        run_ticks(&mut sim, 6); // 96 ms
        assert!(!sim.ball().grounded);
        assert!(sim.jump());
        assert_eq!(sim.ball().vel.y, -12.0);
    }

    #[test]
    fn test_coyote_jump_rejected_at_200ms() {
        let mut sim = sim(LevelDescriptor::default(), 1);
        sim.ball.pos.y = 100.0;
        sim.ball.grounded = false;
        sim.ball.last_grounded_at = sim.clock_ms;
        run_ticks(&mut sim, 13); // 208 ms
        let before = sim.ball().clone();
        assert!(!sim.jump());
        assert_eq!(sim.ball(), &before);
    }

    #[test]
    fn test_jump_flag_settles() {
        let mut sim = sim(LevelDescriptor::default(), 1);
        assert!(sim.jump());
        assert!(sim.ball().jumping);
        run_ticks(&mut sim, 13);
        assert!(!sim.ball().jumping);
    }

    #[test]
    fn test_sleep_one_shot_and_expiry() {
        let mut sim = sim(LevelDescriptor::default(), 1);
        assert!(sim.toggle_sleep());
        let before = sim.abilities().clone();
        assert!(!sim.toggle_sleep());
        assert_eq!(sim.abilities(), &before);

        let pos = sim.ball().pos;
        run_ticks(&mut sim, 10);
        assert_eq!(sim.ball().pos, pos, "ball is frozen while asleep");

        run_ticks(&mut sim, 120); // past 2000 ms
        assert!(!sim.abilities().sleep_active);
        assert!(sim.abilities().sleep_used);
        assert_ne!(sim.ball().pos, pos);
    }

    #[test]
    fn test_reverse_blocked_while_asleep() {
        let mut sim = sim(LevelDescriptor::default(), 1);
        sim.toggle_sleep();
        assert!(!sim.toggle_reverse());
        assert!(!sim.ball().reversed);
    }

    #[test]
    fn test_obstacle_without_sleep_is_game_over() {
        let mut sim = sim(obstacle_level(), 1);
        assert!(sim.jump());
        run_ticks(&mut sim, 20);
        assert_eq!(sim.status(), RunStatus::Failed);
        assert_eq!(sim.run().death_count, 1);
        assert_eq!(
            sim.handler().events(),
            &[LifecycleEvent::GameOver(GameOverCause::Obstacle)]
        );
    }

    #[test]
    fn test_obstacle_overlap_while_asleep_is_safe() {
        let mut sim = sim(obstacle_level(), 1);
        // Park the ball inside the obstacle, then sleep
        sim.ball.pos = Vec2::new(85.0, 430.0);
        sim.toggle_sleep();
        run_ticks(&mut sim, 100);
        assert_eq!(sim.status(), RunStatus::Playing);
        assert!(sim.handler().events().is_empty());
    }

    #[test]
    fn test_goal_fires_once() {
        let level = LevelDescriptor {
            id: 4,
            portal: Some(Portal { x: 84.0, y: 400.0 }),
            par_time: 10.0,
            ..Default::default()
        };
        let mut sim = sim(level, 1);
        assert!(sim.jump());
        run_ticks(&mut sim, 60);
        assert_eq!(sim.status(), RunStatus::Completed);
        let events = sim.handler().events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            LifecycleEvent::LevelComplete(LevelResult {
                level_id: 4,
                stars: 3,
                ..
            })
        ));
        run_ticks(&mut sim, 60);
        assert_eq!(sim.handler().events().len(), 1);
    }

    #[test]
    fn test_wall_bounce_via_simulation() {
        let mut sim = sim(LevelDescriptor::default(), 1);
        sim.resize(120.0, 600.0);
        run_ticks(&mut sim, 30);
        assert!(sim.ball().reversed);
        assert!(sim.ball().pos.x <= 96.0);
        assert!(
            sim.drain_effects()
                .iter()
                .any(|e| matches!(e, Effect::DirectionChanged { reversed: true, .. }))
        );
    }

    #[test]
    fn test_contact_starts_encounter_and_freezes_physics() {
        let mut sim = sim(level_with_adjacent_enemy(40), 7);
        sim.tick();
        let e = sim.combat().encounter().expect("encounter");
        assert_eq!(e.enemy_index, 0);
        assert_eq!(e.enemy_health, 40);
        assert_eq!(e.player_health, 100);
        assert_eq!(sim.ball().pos.y, 426.0);

        let pos = sim.ball().pos;
        run_ticks(&mut sim, 30);
        assert_eq!(sim.ball().pos, pos);
        assert!(!sim.jump());
    }

    #[test]
    fn test_attack_ignored_outside_player_turn() {
        let mut sim = sim(level_with_adjacent_enemy(100), 7);
        assert!(!sim.attack(), "no encounter yet");
        sim.tick();
        assert!(sim.attack());
        assert!(!sim.attack(), "enemy's turn");
    }

    #[test]
    fn test_full_encounter_to_victory() {
        let mut sim = sim(level_with_adjacent_enemy(100), 11);
        sim.tick();
        let mut rounds = 0;
        while !sim.combat().is_idle() && sim.status() == RunStatus::Playing {
            assert!(sim.attack());
            // Enemy thinks for 1000 ms
            run_ticks(&mut sim, 63);
            rounds += 1;
            assert!(rounds < 20);
        }
        match sim.status() {
            RunStatus::Playing => {
                assert_eq!(sim.enemies().len(), 1);
                assert_eq!(sim.enemies()[0].x, 600.0);
                assert_eq!(sim.run().score, 50);
                assert!(sim.handler().events().contains(&LifecycleEvent::Score(50)));
                // Descriptor untouched
                assert_eq!(sim.level().enemies.len(), 2);
            }
            RunStatus::Failed => {
                assert_eq!(
                    sim.handler().events(),
                    &[LifecycleEvent::GameOver(GameOverCause::Defeated)]
                );
            }
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn test_victory_restores_pre_combat_position() {
        let mut sim = sim(level_with_adjacent_enemy(1), 3);
        let start = sim.ball().pos;
        sim.tick();
        assert!(sim.attack());
        assert!(sim.combat().is_idle());
        assert_eq!(sim.ball().pos, start);
        assert_eq!(sim.ball().vel.y, 0.0);
        assert_eq!(sim.pending_tasks(), 0);
    }

    #[test]
    fn test_restart_discards_pending_enemy_turn() {
        let mut sim = sim(level_with_adjacent_enemy(100), 5);
        sim.tick();
        assert!(sim.attack());
        assert_eq!(sim.pending_tasks(), 1);
        sim.restart();
        assert_eq!(sim.pending_tasks(), 0);
        run_ticks(&mut sim, 70);
        // New attempt: fresh encounter from contact, never hit by the old timer
        let e = sim.combat().encounter().expect("new encounter");
        assert_eq!(e.player_health, 100);
        assert_eq!(e.turn, Turn::Player);
    }

    #[test]
    fn test_stale_task_from_old_attempt_is_noop() {
        let mut sim = sim(LevelDescriptor::default(), 5);
        let old_attempt = sim.run().attempt;
        sim.restart();
        // Simulate a callback that escaped cancellation
        sim.tasks.schedule(old_attempt, 16, TaskKind::SleepExpiry);
        sim.abilities.sleep_active = true;
        sim.tick();
        assert!(sim.abilities().sleep_active);
    }

    #[test]
    fn test_pause_freezes_time_and_timers() {
        let mut sim = sim(LevelDescriptor::default(), 1);
        sim.toggle_sleep();
        assert!(sim.pause());
        assert_eq!(sim.advance(5000), 0);
        run_ticks(&mut sim, 200);
        assert_eq!(sim.clock_ms(), 0);
        assert!(sim.abilities().sleep_active);
        assert!(!sim.jump());
        assert!(!sim.toggle_reverse());
        assert!(sim.resume());
        run_ticks(&mut sim, 126);
        assert!(!sim.abilities().sleep_active);
    }

    #[test]
    fn test_restart_twice_is_identical() {
        let mut a = sim(obstacle_level(), 1);
        run_ticks(&mut a, 40);
        a.restart();
        let first = a.snapshot();
        a.restart();
        let second = a.snapshot();
        assert_eq!(first.ball, second.ball);
        assert_eq!(first.abilities, second.abilities);
        assert_eq!(first.combat, second.combat);

        let mut b = sim(obstacle_level(), 99);
        b.toggle_sleep();
        b.toggle_reverse();
        b.restart();
        let fresh = b.snapshot();
        assert_eq!(fresh.ball, first.ball);
        assert_eq!(fresh.abilities, first.abilities);
        assert_eq!(fresh.ball.pos, Vec2::new(50.0, 476.0));
        assert_eq!(fresh.ball.vel.x, 2.5);
        assert!(!fresh.abilities.sleep_used);
        assert!(fresh.combat.is_idle());
    }

    #[test]
    fn test_death_count_survives_restart() {
        let mut sim = sim(obstacle_level(), 1);
        sim.jump();
        run_ticks(&mut sim, 20);
        sim.restart();
        sim.jump();
        run_ticks(&mut sim, 20);
        assert_eq!(sim.run().death_count, 2);
        assert_eq!(sim.run().attempt, 2);
    }

    #[test]
    fn test_create_simulation_with_closures() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let (a, b, c) = (log.clone(), log.clone(), log.clone());
        let mut sim = create_simulation(
            obstacle_level(),
            Viewport::default(),
            move |r| a.borrow_mut().push(format!("complete {}", r.stars)),
            move |cause| b.borrow_mut().push(format!("over {cause:?}")),
            move |d| c.borrow_mut().push(format!("score {d}")),
        );
        assert!(sim.jump());
        run_ticks(&mut sim, 20);
        assert_eq!(*log.borrow(), vec!["over Obstacle".to_string()]);
    }

    #[test]
    fn test_stars_rated_on_whole_seconds() {
        let level = LevelDescriptor {
            id: 6,
            par_time: 10.0,
            ..Default::default()
        };
        let mut sim = sim(level, 1);
        sim.run.elapsed_ms = 10_400;
        sim.complete();
        assert_eq!(
            sim.handler().events(),
            &[LifecycleEvent::LevelComplete(LevelResult {
                level_id: 6,
                elapsed_ms: 10_400,
                stars: 3,
            })]
        );
    }

    fn first_enemy_hit<H: LifecycleHandler>(sim: &mut Simulation<H>) -> i32 {
        sim.drain_effects();
        sim.tick();
        assert!(sim.attack());
        sim.drain_effects()
            .iter()
            .find_map(|e| match e {
                Effect::EnemyHit { damage } => Some(*damage),
                _ => None,
            })
            .expect("enemy hit")
    }

    #[test]
    fn test_attempt_rolls_ignore_earlier_attempts() {
        let mut quiet = sim(level_with_adjacent_enemy(100), 21);
        quiet.restart();
        let expected = first_enemy_hit(&mut quiet);

        let mut busy = sim(level_with_adjacent_enemy(100), 21);
        first_enemy_hit(&mut busy);
        run_ticks(&mut busy, 63);
        if busy.combat().encounter().is_some_and(|e| e.turn == Turn::Player) {
            busy.attack();
        }
        busy.restart();
        assert_eq!(first_enemy_hit(&mut busy), expected);
    }

    #[test]
    fn test_undrained_effects_are_capped() {
        let mut sim = sim(LevelDescriptor::default(), 1);
        // Narrow viewport: a wall bounce every few ticks
        sim.resize(30.0, 600.0);
        run_ticks(&mut sim, 3000);
        assert_eq!(sim.effects.len(), MAX_PENDING_EFFECTS);
        assert!(matches!(
            sim.drain_effects().last(),
            Some(Effect::DirectionChanged { .. })
        ));
    }

    #[test]
    fn test_taller_viewport_moves_ground_line() {
        let mut sim = sim(LevelDescriptor::default(), 1);
        sim.tick();
        assert_eq!(sim.ball().pos.y, 476.0);
        sim.resize(800.0, 700.0);
        sim.tick();
        assert!(!sim.ball().grounded);
        run_ticks(&mut sim, 40);
        assert!(sim.ball().grounded);
        assert_eq!(sim.ball().pos.y, 576.0);
    }

    proptest! {
        #[test]
        fn forty_health_encounter(seed in any::<u64>()) {
            let mut sim = sim(level_with_adjacent_enemy(40), seed);
            sim.tick();
            prop_assert!(sim.attack());
            if sim.combat().is_idle() {
                prop_assert_eq!(sim.enemies().len(), 1);
                prop_assert_eq!(sim.run().score, 50);
            } else {
                prop_assert_eq!(sim.combat().encounter().unwrap().turn, Turn::Enemy);
                run_ticks(&mut sim, 63);
                let e = sim.combat().encounter().unwrap();
                prop_assert!((60..=85).contains(&e.player_health));
                prop_assert_eq!(e.turn, Turn::Player);
            }
        }
    }
}
