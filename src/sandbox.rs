//! Headless demo world.
//!
//! A walled arena with a player on autopilot, bats that drift around until
//! their lifetime runs out and slimes driven by a two-state machine that
//! chase the player when it comes close. A spawner on the scene helper keeps
//! the bat population topped up.
//!
//! The binary runs this for a number of frames and prints a
//! [`SimulationReport`]; the integration tests use it as a realistic load.
//!
//! # Related
//!
//! - [`crate::components::statemachine`] – slime behaviour
//! - [`crate::components::coroutine`] – wander and blink routines

use std::sync::Arc;

use fastrand::Rng;
use log::{debug, info, trace, warn};
use serde::Serialize;

use crate::colliders::{Circle, Grid, Hitbox};
use crate::components::Component;
use crate::components::coroutine::{Coroutine, Step, routine_fn};
use crate::components::statemachine::StateMachine;
use crate::entity::{Entity, EntityKind};
use crate::error::CoreResult;
use crate::math::Vec2;
use crate::resources::entitylist::EntityId;
use crate::resources::gameconfig::GameConfig;
use crate::resources::taglist::Tag;
use crate::resources::tracker::TrackerRegistry;
use crate::scene::Scene;
use crate::scene::context::{DrawContext, UpdateContext};
use crate::systems::render::{self, RecordingCanvas};

pub const SOLID: Tag = 0;
pub const PLAYER: Tag = 1;
pub const ENEMY: Tag = 2;
pub const ALERT: Tag = 3;

pub const CELL: f32 = 16.0;
pub const ARENA_CELLS_X: usize = 20;
pub const ARENA_CELLS_Y: usize = 15;

pub const WANDER: usize = 0;
pub const CHASE: usize = 1;

const CHASE_RADIUS: f32 = 64.0;
const GIVE_UP_RADIUS: f32 = 96.0;
const SLIME_SPEED: f32 = 40.0;
const BAT_SPEED: f32 = 60.0;
const SPAWN_INTERVAL: f32 = 2.0;
const REPORT_EVERY: u32 = 300;

// ==================== KINDS ====================

/// Family marker shared by every hostile kind.
pub struct Enemy;

#[derive(Debug, Default)]
pub struct Player {
    pub hits: u32,
    invulnerable: f32,
}

impl EntityKind for Player {
    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        if self.invulnerable > 0.0 {
            self.invulnerable -= ctx.delta;
            return;
        }
        match ctx.collide_first_kind::<Enemy>() {
            Ok(Some(enemy)) => {
                self.hits += 1;
                self.invulnerable = 1.0;
                debug!("player hit by {enemy:?}, {} hits so far", self.hits);
                if let Err(err) = ctx.entity.add_component(blinker(6)) {
                    warn!("cannot start blinking: {err}");
                }
            }
            Ok(None) => {}
            Err(err) => warn!("player collision check failed: {err}"),
        }
    }

    fn draw(&mut self, ctx: &mut DrawContext<'_>) {
        if let Some(collider) = ctx.entity.collider() {
            collider.debug_draw(ctx.entity.position, ctx.canvas);
        }
    }
}

#[derive(Debug)]
pub struct Bat {
    pub ttl: f32,
}

impl EntityKind for Bat {
    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        self.ttl -= ctx.delta;
        if self.ttl <= 0.0 {
            ctx.remove_entity();
        }
    }
}

#[derive(Debug, Default)]
pub struct Slime {
    /// Times this slime started chasing.
    pub chases: u32,
}

impl EntityKind for Slime {}

/// Registry for the sandbox kinds and components.
pub fn registry() -> TrackerRegistry {
    TrackerRegistry::builder()
        .entity::<Player>()
        .entity::<Bat>()
        .entity::<Slime>()
        .entity_into::<Bat, Enemy>()
        .entity_into::<Slime, Enemy>()
        .component::<StateMachine>()
        .component::<Mover>()
        .component::<Spawner>()
        .build()
}

// ==================== COMPONENTS ====================

/// Moves its entity by `velocity`, bouncing off anything tagged [`SOLID`].
#[derive(Debug, Clone, Copy)]
pub struct Mover {
    pub velocity: Vec2,
}

impl Mover {
    pub fn new(velocity: Vec2) -> Self {
        Self { velocity }
    }
}

impl Component for Mover {
    fn starts_visible(&self) -> bool {
        false
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        let step = self.velocity * ctx.delta;
        for (axis, delta) in [(Vec2::X, step.x), (Vec2::Y, step.y)] {
            if delta == 0.0 {
                continue;
            }
            let next = ctx.entity.position + axis * delta;
            match ctx.scene.collide_check_at(&*ctx.entity, SOLID, next) {
                Ok(true) => self.velocity -= 2.0 * axis * self.velocity.dot(axis),
                Ok(false) => ctx.entity.position = next,
                Err(err) => warn!("mover cannot probe walls: {err}"),
            }
        }
    }
}

/// Scene-level spawner: adds a bat every few seconds while the enemy count
/// is under `limit`.
#[derive(Debug)]
pub struct Spawner {
    interval: f32,
    timer: f32,
    limit: usize,
    cells: Vec<Vec2>,
    rng: Rng,
    pub spawned: u32,
}

impl Spawner {
    pub fn new(limit: usize, cells: Vec<Vec2>, rng: Rng) -> Self {
        Self {
            interval: SPAWN_INTERVAL,
            timer: SPAWN_INTERVAL,
            limit,
            cells,
            rng,
            spawned: 0,
        }
    }
}

impl Component for Spawner {
    fn starts_visible(&self) -> bool {
        false
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        self.timer -= ctx.delta;
        if self.timer > 0.0 {
            return;
        }
        self.timer += self.interval;
        if self.cells.is_empty() || ctx.scene.tagged(ENEMY).len() >= self.limit {
            return;
        }
        let at = self.cells[self.rng.usize(..self.cells.len())];
        ctx.scene.add(bat(at, &mut self.rng));
        self.spawned += 1;
        trace!("spawned bat at {at}");
    }
}

/// Toggles visibility `times` times, a tenth of a second apart, then
/// leaves the entity visible.
pub fn blinker(times: u32) -> Coroutine {
    let mut left = times;
    Coroutine::from_fn(move |ctx| {
        if left == 0 {
            ctx.entity.visible = true;
            return Step::Done;
        }
        left -= 1;
        ctx.entity.visible = !ctx.entity.visible;
        Step::Wait(0.1)
    })
}

fn player_centre(scene: &Scene) -> Option<Vec2> {
    scene.tracked::<Player>().ok()?.next().map(Entity::centre)
}

/// WANDER picks a new heading every half second; CHASE heads for the player
/// and raises [`ALERT`] while it lasts.
pub fn slime_brain(mut rng: Rng) -> StateMachine {
    StateMachine::new(2)
        .on_update(WANDER, |ctx| match player_centre(&*ctx.scene) {
            Some(player) if player.distance(ctx.entity.centre()) < CHASE_RADIUS => CHASE,
            _ => WANDER,
        })
        .on_coroutine(WANDER, move || {
            let mut rng = rng.fork();
            routine_fn(move |ctx| {
                let angle = rng.f32() * std::f32::consts::TAU;
                if let Some(mover) = ctx.entity.component_mut::<Mover>() {
                    mover.velocity = Vec2::from_angle(angle) * SLIME_SPEED * 0.5;
                }
                Step::Wait(0.5)
            })
        })
        .on_begin(CHASE, |ctx| {
            ctx.entity.tag(ALERT);
            if let Some(slime) = ctx.entity.kind_mut::<Slime>() {
                slime.chases += 1;
            }
        })
        .on_update(CHASE, |ctx| {
            let centre = ctx.entity.centre();
            match player_centre(&*ctx.scene) {
                Some(player) if player.distance(centre) <= GIVE_UP_RADIUS => {
                    if let Some(mover) = ctx.entity.component_mut::<Mover>() {
                        mover.velocity = (player - centre).normalize_or_zero() * SLIME_SPEED;
                    }
                    CHASE
                }
                _ => WANDER,
            }
        })
        .on_end(CHASE, |ctx| ctx.entity.untag(ALERT))
}

// ==================== BUILDERS ====================

pub fn player(at: Vec2) -> Entity {
    let mut entity = Entity::with_kind(at, Player::default());
    entity.set_collider(Hitbox::new(12.0, 12.0).with_offset(Vec2::splat(-6.0)));
    entity.tag(PLAYER);
    entity.set_depth(-10);
    // Adding to an entity that is not in a scene never fails.
    let _ = entity.add_component(Mover::new(Vec2::new(70.0, 45.0)));
    entity
}

pub fn bat(at: Vec2, rng: &mut Rng) -> Entity {
    let mut entity = Entity::with_kind(at, Bat {
        ttl: 4.0 + rng.f32() * 6.0,
    });
    entity.set_collider(Circle::new(4.0));
    entity.tag(ENEMY);
    let heading = Vec2::from_angle(rng.f32() * std::f32::consts::TAU);
    let _ = entity.add_component(Mover::new(heading * BAT_SPEED));
    entity
}

pub fn slime(at: Vec2, rng: &mut Rng) -> Entity {
    let mut entity = Entity::with_kind(at, Slime::default());
    entity.set_collider(Hitbox::new(10.0, 8.0).with_offset(Vec2::new(-5.0, -4.0)));
    entity.tag(ENEMY);
    let _ = entity.add_component(Mover::new(Vec2::ZERO));
    let _ = entity.add_component(slime_brain(rng.fork()));
    entity
}

/// Border walls plus a few random 2x2 pillars away from the top-left corner.
pub fn arena(rng: &mut Rng) -> Grid {
    let (w, h) = (ARENA_CELLS_X as i32, ARENA_CELLS_Y as i32);
    let mut grid = Grid::new(ARENA_CELLS_X, ARENA_CELLS_Y, CELL, CELL);
    grid.set_rect(0, 0, w, 1, true);
    grid.set_rect(0, h - 1, w, 1, true);
    grid.set_rect(0, 0, 1, h, true);
    grid.set_rect(w - 1, 0, 1, h, true);
    for _ in 0..4 {
        let x = rng.i32(5..w - 3);
        let y = rng.i32(5..h - 3);
        grid.set_rect(x, y, 2, 2, true);
    }
    grid
}

/// Centres of the free cells at least four cells away from the player's
/// corner.
fn free_cells(grid: &Grid) -> Vec<Vec2> {
    let mut cells = Vec::new();
    for y in 0..grid.cells_y() as i32 {
        for x in 0..grid.cells_x() as i32 {
            if !grid.get(x, y) && (x >= 5 || y >= 5) {
                cells.push(Vec2::new((x as f32 + 0.5) * CELL, (y as f32 + 0.5) * CELL));
            }
        }
    }
    cells
}

// ==================== SANDBOX ====================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub seed: u64,
    pub frames: u32,
    pub elapsed: f32,
    pub live_entities: usize,
    pub enemies: usize,
    pub bats_spawned: u32,
    pub player_hits: u32,
    pub player_position: [f32; 2],
    pub chases: u32,
    pub chasing_now: usize,
    pub alerted: usize,
    pub draw_commands: usize,
}

pub struct Sandbox {
    scene: Scene,
    player: EntityId,
    seed: u64,
    delta: f32,
    frames: u32,
}

impl Sandbox {
    pub fn new(config: &GameConfig) -> CoreResult<Self> {
        let mut scene = Scene::with_registry(Arc::new(registry()), config.scene_config());
        scene.time_mut().time_scale = config.time_scale;
        let mut rng = Rng::with_seed(config.seed);

        let grid = arena(&mut rng);
        let cells = free_cells(&grid);
        let mut walls = Entity::new(Vec2::ZERO);
        walls.set_collider(grid);
        walls.tag(SOLID);
        walls.set_depth(100);
        scene.add(walls);

        let player = scene.add(player(Vec2::splat(2.5 * CELL)));

        let count = config.entities as usize;
        for index in 0..count {
            if cells.is_empty() {
                break;
            }
            let at = cells[rng.usize(..cells.len())];
            let enemy = if index % 2 == 0 {
                bat(at, &mut rng)
            } else {
                slime(at, &mut rng)
            };
            scene.add(enemy);
        }

        scene.flush()?;
        let helper = scene.helper();
        if let Some(mut helper) = scene.entity_mut(helper) {
            helper.add_component(Spawner::new(count.max(1), cells, rng.fork()))?;
        }

        info!(
            "Sandbox ready: seed {}, {} enemies queued",
            config.seed, count
        );
        Ok(Self {
            scene,
            player,
            seed: config.seed,
            delta: config.delta,
            frames: 0,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn player(&self) -> EntityId {
        self.player
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn step(&mut self) -> CoreResult<()> {
        self.scene.update(self.delta)?;
        self.frames += 1;
        if self.frames % REPORT_EVERY == 0 {
            info!(
                "frame {}: {} entities, {} enemies, {} alerted",
                self.frames,
                self.scene.entities().len(),
                self.scene.tagged(ENEMY).len(),
                self.scene.tagged(ALERT).len()
            );
        }
        Ok(())
    }

    pub fn run(&mut self, frames: u32) -> CoreResult<SimulationReport> {
        for _ in 0..frames {
            self.step()?;
        }
        self.report()
    }

    /// Draws one frame with the debug overlay and summarises the world.
    pub fn report(&mut self) -> CoreResult<SimulationReport> {
        let mut canvas = RecordingCanvas::new();
        self.scene.draw(&mut canvas)?;
        render::debug_overlay(&self.scene, &mut canvas);

        let scene = &self.scene;
        let player = scene.entity(self.player);
        let bats_spawned = scene
            .entity(scene.helper())
            .and_then(|helper| helper.component::<Spawner>())
            .map_or(0, |spawner| spawner.spawned);
        let chases = scene
            .tracked::<Slime>()?
            .filter_map(|entity| entity.kind::<Slime>())
            .map(|slime| slime.chases)
            .sum();
        let chasing_now = scene
            .tracked_components::<StateMachine>()?
            .filter(|(_, machine)| machine.state() == Some(CHASE))
            .count();

        Ok(SimulationReport {
            seed: self.seed,
            frames: self.frames,
            elapsed: scene.time().elapsed,
            live_entities: scene.entities().len(),
            enemies: scene.tracker().entities::<Enemy>()?.len(),
            bats_spawned,
            player_hits: player
                .and_then(|entity| entity.kind::<Player>())
                .map_or(0, |player| player.hits),
            player_position: player.map_or([0.0; 2], |entity| entity.position.to_array()),
            chases,
            chasing_now,
            alerted: scene.tagged(ALERT).len(),
            draw_commands: canvas.len(),
        })
    }
}
