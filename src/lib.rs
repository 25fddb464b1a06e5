//! Headless endless-runner simulation with ray-based perception and a DQN
//! trainer that learns to jump and duck past obstacles.

pub mod checkpoint;
pub mod config;
pub mod dqn;
pub mod env;
pub mod error;
pub mod game;
pub mod geometry;
pub mod perception;
pub mod replay;
pub mod trainer;

pub use config::DinoConfig;
pub use env::{DinoEnv, RewardFn, StepOutcome, SurvivalReward};
pub use error::{DinoError, Result};
pub use game::{Action, Game, ObstacleKind, Posture};
pub use perception::{Observation, Perception};
pub use trainer::{Trainer, evaluate};
