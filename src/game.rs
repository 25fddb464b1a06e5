use crate::config::GameConfig;
use crate::error::{DinoError, Result};
use crate::geometry::Rect;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Frames per running/ducking image; the animation cycles over two images.
const FRAMES_PER_IMAGE: u32 = 5;
/// Upward motion feels floatier than the fall.
const RISE_GRAVITY_SCALE: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Jump,
    Duck,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Posture {
    Running,
    Jumping,
    Ducking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceClass {
    Sky,
    Floor,
    Cactus,
    Bird,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleKind {
    SmallCactus,
    LargeCactus,
    Bird,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleProfile {
    pub top: f32,
    pub width: f32,
    pub height: f32,
    pub type_id: u8,
    pub surface: SurfaceClass,
}

impl ObstacleKind {
    pub const ALL: [ObstacleKind; 3] = [ObstacleKind::SmallCactus, ObstacleKind::LargeCactus, ObstacleKind::Bird];

    pub const fn profile(self) -> ObstacleProfile {
        match self {
            ObstacleKind::SmallCactus => {
                ObstacleProfile { top: 325.0, width: 40.0, height: 71.0, type_id: 1, surface: SurfaceClass::Cactus }
            }
            ObstacleKind::LargeCactus => {
                ObstacleProfile { top: 300.0, width: 48.0, height: 95.0, type_id: 2, surface: SurfaceClass::Cactus }
            }
            ObstacleKind::Bird => {
                ObstacleProfile { top: 250.0, width: 93.0, height: 62.0, type_id: 3, surface: SurfaceClass::Bird }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub kind: ObstacleKind,
    pub rect: Rect,
}

impl Obstacle {
    pub fn spawn(kind: ObstacleKind, x: f32) -> Self {
        let p = kind.profile();
        Self { kind, rect: Rect::new(x, p.top, p.width, p.height) }
    }

    /// Fully past the left screen boundary.
    pub fn expired(&self) -> bool {
        self.rect.x < -self.rect.w
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Actor {
    pub x: f32,
    pub y: f32,
    pub velocity: f32,
    pub posture: Posture,
    pub frame: u32,
}

impl Actor {
    fn grounded(cfg: &GameConfig) -> Self {
        Self { x: cfg.actor_x, y: cfg.ground_y, velocity: 0.0, posture: Posture::Running, frame: 0 }
    }

    pub fn rect(&self, cfg: &GameConfig) -> Rect {
        let (w, h) = match self.posture {
            Posture::Ducking => cfg.duck_size,
            Posture::Running | Posture::Jumping => cfg.run_size,
        };
        Rect::new(self.x, self.y, w, h)
    }

    pub fn airborne(&self) -> bool {
        self.posture == Posture::Jumping
    }

    fn advance_frame(&mut self) {
        self.frame = (self.frame + 1) % (2 * FRAMES_PER_IMAGE);
    }

    fn update(&mut self, action: Action, cfg: &GameConfig) {
        match (self.posture, action) {
            (Posture::Jumping, _) => {}
            (_, Action::Jump) if self.y >= cfg.ground_y => {
                self.posture = Posture::Jumping;
                self.y = cfg.ground_y;
                self.velocity = -cfg.jump_impulse;
            }
            (_, Action::Duck) => {
                self.posture = Posture::Ducking;
                self.y = cfg.duck_y;
                self.advance_frame();
            }
            _ => {
                self.posture = Posture::Running;
                self.y = cfg.ground_y;
                self.advance_frame();
            }
        }

        if self.posture == Posture::Jumping {
            self.y += self.velocity;
            let scale = if self.velocity < 0.0 { RISE_GRAVITY_SCALE } else { 1.0 };
            self.velocity += cfg.gravity * scale;
            if self.y >= cfg.ground_y {
                self.y = cfg.ground_y;
                self.velocity = 0.0;
                self.posture = Posture::Running;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimState {
    pub tick: u64,
    pub speed: f32,
    pub terminal: bool,
    pub collided: bool,
    pub scroll_offset: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub spawned: Option<ObstacleKind>,
    pub collided: bool,
    pub done: bool,
}

/// Read-only view handed to a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSnapshot {
    pub tick: u64,
    pub speed: f32,
    pub actor: Rect,
    pub posture: Posture,
    /// Animation counter; wraps every `2 * FRAMES_PER_IMAGE` grounded ticks.
    pub frame: u32,
    pub obstacles: Vec<Obstacle>,
    pub scroll_offset: f32,
}

pub struct Game {
    pub config: GameConfig,
    pub actor: Actor,
    pub obstacles: Vec<Obstacle>,
    pub state: SimState,
    rng: SmallRng,
}

impl Game {
    pub fn new(config: GameConfig, seed: u64) -> Self {
        let actor = Actor::grounded(&config);
        let state = SimState {
            tick: 0,
            speed: config.initial_speed,
            terminal: false,
            collided: false,
            scroll_offset: 0.0,
        };
        Self { config, actor, obstacles: Vec::new(), state, rng: SmallRng::seed_from_u64(seed) }
    }

    pub fn reset(&mut self) {
        self.actor = Actor::grounded(&self.config);
        self.obstacles.clear();
        self.state = SimState {
            tick: 0,
            speed: self.config.initial_speed,
            terminal: false,
            collided: false,
            scroll_offset: 0.0,
        };
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
    }

    pub fn actor_rect(&self) -> Rect {
        self.actor.rect(&self.config)
    }

    pub fn score(&self) -> u64 {
        self.state.tick
    }

    pub fn step(&mut self, action: Action) -> TickReport {
        if self.state.terminal {
            return TickReport { tick: self.state.tick, spawned: None, collided: self.state.collided, done: true };
        }

        self.actor.update(action, &self.config);

        let speed = self.state.speed;
        self.state.scroll_offset -= speed;
        if self.state.scroll_offset <= -self.config.track_width {
            self.state.scroll_offset = 0.0;
        }
        self.obstacles = self
            .obstacles
            .iter()
            .map(|o| Obstacle { rect: Rect { x: o.rect.x - speed, ..o.rect }, ..*o })
            .filter(|o| !o.expired())
            .collect();

        let spawned = self.try_spawn();

        let actor = self.actor_rect();
        let collided = self.obstacles.iter().any(|o| o.rect.overlaps(&actor));

        self.state.speed = (speed + self.config.speed_increment).min(self.config.max_speed);
        self.state.tick += 1;
        self.state.collided = collided;
        self.state.terminal = collided || self.state.tick >= self.config.max_ticks;

        debug_assert!(self.check_invariants().is_ok(), "{:?}", self.check_invariants());
        TickReport { tick: self.state.tick, spawned, collided, done: self.state.terminal }
    }

    fn try_spawn(&mut self) -> Option<ObstacleKind> {
        if !self.obstacles.is_empty() || self.config.enabled_kinds.is_empty() {
            return None;
        }
        if self.rng.r#gen::<f64>() >= self.config.spawn_probability {
            return None;
        }
        let kinds = &self.config.enabled_kinds;
        let kind = kinds[self.rng.gen_range(0..kinds.len())];
        self.obstacles.push(Obstacle::spawn(kind, self.config.screen_width));
        tracing::debug!(tick = self.state.tick, ?kind, "obstacle spawned");
        Some(kind)
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        RenderSnapshot {
            tick: self.state.tick,
            speed: self.state.speed,
            actor: self.actor_rect(),
            posture: self.actor.posture,
            frame: self.actor.frame,
            obstacles: self.obstacles.clone(),
            scroll_offset: self.state.scroll_offset,
        }
    }

    pub fn check_invariants(&self) -> Result<()> {
        if self.obstacles.len() > 1 {
            return Err(DinoError::Invariant(format!("{} live obstacles", self.obstacles.len())));
        }
        let expected_y = match self.actor.posture {
            Posture::Running => Some(self.config.ground_y),
            Posture::Ducking => Some(self.config.duck_y),
            Posture::Jumping => None,
        };
        if let Some(y) = expected_y {
            if self.actor.y != y {
                return Err(DinoError::Invariant(format!(
                    "{:?} actor at y={} instead of {}",
                    self.actor.posture, self.actor.y, y
                )));
            }
        } else if self.actor.y > self.config.ground_y {
            return Err(DinoError::Invariant(format!("airborne actor below ground at y={}", self.actor.y)));
        }
        if self.state.speed > self.config.max_speed {
            return Err(DinoError::Invariant(format!("speed {} above max", self.state.speed)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> GameConfig {
        GameConfig { spawn_probability: 0.0, ..GameConfig::default() }
    }

    #[test]
    fn reset_restores_ground_state() {
        let mut game = Game::new(GameConfig { spawn_probability: 1.0, ..GameConfig::default() }, 3);
        game.step(Action::Jump);
        game.step(Action::None);
        assert_eq!(game.obstacles.len(), 1);
        game.reset();
        assert_eq!(game.actor.posture, Posture::Running);
        assert_eq!(game.actor.y, game.config.ground_y);
        assert_eq!(game.actor.velocity, 0.0);
        assert!(game.obstacles.is_empty());
        assert_eq!(game.state.tick, 0);
        assert_eq!(game.state.speed, game.config.initial_speed);
        assert!(!game.state.terminal);
    }

    #[test]
    fn duck_uses_the_low_rectangle_and_releases_to_running() {
        let mut game = Game::new(quiet_config(), 0);
        game.step(Action::Duck);
        assert_eq!(game.actor.posture, Posture::Ducking);
        assert_eq!(game.actor_rect(), Rect::new(80.0, 340.0, 118.0, 60.0));
        game.step(Action::None);
        assert_eq!(game.actor.posture, Posture::Running);
        assert_eq!(game.actor_rect(), Rect::new(80.0, 310.0, 87.0, 94.0));
    }

    #[test]
    fn inputs_are_ignored_while_airborne() {
        let mut game = Game::new(quiet_config(), 0);
        game.step(Action::Jump);
        let v = game.actor.velocity;
        game.step(Action::Duck);
        assert_eq!(game.actor.posture, Posture::Jumping);
        assert!(game.actor.velocity > v);
        game.step(Action::Jump);
        assert_eq!(game.actor.posture, Posture::Jumping);
    }

    #[test]
    fn jump_from_duck_takes_off_from_ground_level() {
        let mut game = Game::new(quiet_config(), 0);
        game.step(Action::Duck);
        game.step(Action::Jump);
        assert_eq!(game.actor.posture, Posture::Jumping);
        assert_eq!(game.actor.y, 310.0 - 26.0);
    }

    #[test]
    fn bird_hits_a_runner_but_not_a_ducker() {
        let cfg = GameConfig {
            spawn_probability: 1.0,
            enabled_kinds: vec![ObstacleKind::Bird],
            ..quiet_config()
        };
        let mut ducker = Game::new(cfg.clone(), 1);
        for _ in 0..200 {
            assert!(!ducker.step(Action::Duck).collided);
        }

        let mut runner = Game::new(cfg, 1);
        let mut report = runner.step(Action::None);
        while !report.done {
            report = runner.step(Action::None);
        }
        assert!(report.collided);
        assert!(runner.state.tick < 200);
    }

    #[test]
    fn stepping_a_finished_game_changes_nothing() {
        let cfg = GameConfig { max_ticks: 3, ..quiet_config() };
        let mut game = Game::new(cfg, 0);
        for _ in 0..3 {
            game.step(Action::None);
        }
        assert!(game.state.terminal);
        assert!(!game.state.collided);
        let report = game.step(Action::Jump);
        assert!(report.done);
        assert_eq!(game.state.tick, 3);
        assert_eq!(game.actor.posture, Posture::Running);
    }

    #[test]
    fn scroll_offset_wraps_at_track_width() {
        let cfg = GameConfig { track_width: 20.0, speed_increment: 0.0, ..quiet_config() };
        let mut game = Game::new(cfg, 0);
        game.step(Action::None);
        assert_eq!(game.state.scroll_offset, -8.0);
        game.step(Action::None);
        assert_eq!(game.state.scroll_offset, -16.0);
        game.step(Action::None);
        assert_eq!(game.state.scroll_offset, 0.0);
    }

    #[test]
    fn snapshot_mirrors_state() {
        let cfg = GameConfig { spawn_probability: 1.0, ..GameConfig::default() };
        let mut game = Game::new(cfg, 9);
        game.step(Action::Duck);
        let snap = game.snapshot();
        assert_eq!(snap.tick, 1);
        assert_eq!(snap.posture, Posture::Ducking);
        assert_eq!(snap.actor, game.actor_rect());
        assert_eq!(snap.obstacles, game.obstacles);
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"Ducking\""));
    }

    #[test]
    fn animation_frame_cycles_on_the_ground_and_holds_in_the_air() {
        let mut game = Game::new(quiet_config(), 0);
        for _ in 0..3 {
            game.step(Action::None);
        }
        assert_eq!(game.snapshot().frame, 3);

        game.step(Action::Jump);
        while game.actor.airborne() {
            assert_eq!(game.snapshot().frame, 3);
            game.step(Action::Duck);
        }
        assert_eq!(game.snapshot().frame, 3);

        for _ in 0..7 {
            game.step(Action::Duck);
        }
        assert_eq!(game.snapshot().frame, 0);
    }

    #[test]
    fn reseeding_replays_the_spawn_sequence() {
        let cfg = GameConfig { spawn_probability: 0.3, max_ticks: 400, ..GameConfig::default() };
        fn record(game: &mut Game) -> Vec<(u64, ObstacleKind)> {
            let mut spawns = Vec::new();
            loop {
                let report = game.step(Action::Duck);
                if let Some(kind) = report.spawned {
                    spawns.push((report.tick, kind));
                }
                if report.done {
                    return spawns;
                }
            }
        }
        let mut game = Game::new(cfg, 4);

        let first = record(&mut game);
        assert!(!first.is_empty());
        game.reset();
        game.reseed(4);
        assert_eq!(record(&mut game), first);
    }
}
