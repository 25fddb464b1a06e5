use crate::error::{DinoError, Result};
use crate::game::ObstacleKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub screen_width: f32,
    pub screen_height: f32,
    pub actor_x: f32,
    pub ground_y: f32,
    pub duck_y: f32,
    pub run_size: (f32, f32),
    pub duck_size: (f32, f32),
    pub jump_impulse: f32,
    pub gravity: f32,
    pub initial_speed: f32,
    pub speed_increment: f32,
    pub max_speed: f32,
    pub max_ticks: u64,
    pub spawn_probability: f64,
    pub enabled_kinds: Vec<ObstacleKind>,
    pub track_width: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            screen_width: 800.0,
            screen_height: 600.0,
            actor_x: 80.0,
            ground_y: 310.0,
            duck_y: 340.0,
            run_size: (87.0, 94.0),
            duck_size: (118.0, 60.0),
            jump_impulse: 26.0,
            gravity: 2.0,
            initial_speed: 8.0,
            speed_increment: 0.002,
            max_speed: 16.0,
            max_ticks: 5_000,
            spawn_probability: 0.85,
            enabled_kinds: ObstacleKind::ALL.to_vec(),
            track_width: 2404.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerceptionMode {
    Vision,
    Lean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    pub mode: PerceptionMode,
    pub n_rays: usize,
    pub fov_degrees: f32,
    pub ray_length: f32,
    /// Offset of the ray origin from the actor's top-right corner.
    pub origin_offset: (f32, f32),
    pub floor_y: f32,
    /// Append the actor's height above ground to lean observations.
    pub lean_height: bool,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            mode: PerceptionMode::Vision,
            n_rays: 33,
            fov_degrees: 60.0,
            ray_length: 500.0,
            origin_offset: (0.0, 20.0),
            floor_y: 404.0,
            lean_height: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub per_tick: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self { per_tick: 0.1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// 2 = {Jump, Duck}; 3 adds the explicit no-op id.
    pub num_actions: usize,
    pub hidden: usize,
    pub learning_rate: f64,
    pub gamma: f32,
    pub epsilon_start: f32,
    pub epsilon_floor: f32,
    pub epsilon_decay: f32,
    pub batch_size: usize,
    pub replay_capacity: usize,
    /// Episodes between hard target syncs.
    pub target_sync_interval: u64,
    pub seed: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            num_actions: 2,
            hidden: 64,
            learning_rate: 1e-3,
            gamma: 0.95,
            epsilon_start: 1.0,
            epsilon_floor: 0.05,
            epsilon_decay: 0.995,
            batch_size: 32,
            replay_capacity: 20_000,
            target_sync_interval: 10,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub episodes: u64,
    pub seed: u64,
    pub checkpoint_every: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self { episodes: 500, seed: 0, checkpoint_every: 50 }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DinoConfig {
    pub game: GameConfig,
    pub perception: PerceptionConfig,
    pub reward: RewardConfig,
    pub agent: AgentConfig,
    pub training: TrainingConfig,
}

fn ensure(ok: bool, msg: impl Into<String>) -> Result<()> {
    if ok { Ok(()) } else { Err(DinoError::Config(msg.into())) }
}

impl DinoConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let cfg: DinoConfig = serde_json::from_str(&raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let g = &self.game;
        ensure(g.jump_impulse > 0.0 && g.gravity > 0.0, "jump_impulse and gravity must be positive")?;
        ensure(g.duck_y >= g.ground_y, "duck_y must not be above ground_y")?;
        ensure(
            g.ground_y + g.run_size.1 <= g.screen_height && g.duck_y + g.duck_size.1 <= g.screen_height,
            "actor must fit above the bottom of the screen",
        )?;
        ensure(g.initial_speed >= 0.0 && g.initial_speed <= g.max_speed, "need 0 <= initial_speed <= max_speed")?;
        ensure(g.speed_increment >= 0.0, "speed_increment must be non-negative")?;
        ensure((0.0..=1.0).contains(&g.spawn_probability), "spawn_probability must be in [0, 1]")?;
        ensure(!g.enabled_kinds.is_empty(), "at least one obstacle kind must be enabled")?;
        ensure(g.max_ticks > 0, "max_ticks must be positive")?;
        ensure(g.track_width > 0.0, "track_width must be positive")?;

        let p = &self.perception;
        ensure(p.n_rays > 0, "n_rays must be positive")?;
        ensure(p.fov_degrees > 0.0 && p.fov_degrees < 180.0, "fov_degrees must be in (0, 180)")?;
        ensure(p.ray_length > 0.0, "ray_length must be positive")?;

        let a = &self.agent;
        ensure(matches!(a.num_actions, 2 | 3), "num_actions must be 2 or 3")?;
        ensure(a.hidden > 0, "hidden must be positive")?;
        ensure(a.learning_rate > 0.0, "learning_rate must be positive")?;
        ensure(a.gamma > 0.0 && a.gamma <= 1.0, "need 0 < gamma <= 1")?;
        ensure((0.0..=1.0).contains(&a.epsilon_start), "epsilon_start must be in [0, 1]")?;
        ensure((0.0..=1.0).contains(&a.epsilon_floor), "epsilon_floor must be in [0, 1]")?;
        ensure(a.epsilon_decay > 0.0 && a.epsilon_decay <= 1.0, "need 0 < epsilon_decay <= 1")?;
        ensure(a.batch_size > 0 && a.batch_size <= a.replay_capacity, "need 0 < batch_size <= replay_capacity")?;
        ensure(a.target_sync_interval > 0, "target_sync_interval must be positive")?;
        Ok(())
    }
}
