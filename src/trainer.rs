//! Episode loop tying the environment to the DQN agent.
//!
//! Each tick the agent acts epsilon-greedily, the transition lands in the
//! replay buffer, and once a batch is available every tick also takes one
//! gradient step. The target network is hard-synced every
//! `target_sync_interval` episodes and epsilon decays once per episode.

use crate::checkpoint;
use crate::config::DinoConfig;
use crate::dqn::{DqnAgent, QNetwork};
use crate::env::{DinoEnv, RewardFn, SurvivalReward};
use crate::error::{DinoError, Result};
use crate::perception::Perception;
use crate::replay::Transition;
use candle_core::Device;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Collecting,
    Training,
    Synchronizing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeStats {
    pub episode: u64,
    pub reward: f32,
    pub score: u64,
    pub epsilon: f32,
    pub mean_loss: Option<f32>,
    pub updates: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub episodes: Vec<EpisodeStats>,
    pub best_score: u64,
    pub mean_score: f64,
    pub total_updates: u64,
}

impl TrainingReport {
    fn from_episodes(episodes: Vec<EpisodeStats>, total_updates: u64) -> Self {
        let best_score = episodes.iter().map(|e| e.score).max().unwrap_or(0);
        let mean_score = if episodes.is_empty() {
            0.0
        } else {
            episodes.iter().map(|e| e.score as f64).sum::<f64>() / episodes.len() as f64
        };
        Self { episodes, best_score, mean_score, total_updates }
    }
}

pub struct Trainer<R: RewardFn = SurvivalReward> {
    pub env: DinoEnv<R>,
    pub agent: DqnAgent,
    config: DinoConfig,
    scale: Vec<f32>,
    phase: Phase,
    episodes_done: u64,
    checkpoint_dir: Option<PathBuf>,
    checkpoints_written: u64,
}

impl Trainer<SurvivalReward> {
    pub fn new(config: DinoConfig, device: &Device) -> Result<Self> {
        let env = DinoEnv::new(&config, config.training.seed);
        Self::with_env(config, env, device)
    }
}

impl<R: RewardFn> Trainer<R> {
    pub fn with_env(config: DinoConfig, env: DinoEnv<R>, device: &Device) -> Result<Self> {
        config.validate()?;
        let perception = env.perception();
        let scale = perception.input_scale();
        let agent = DqnAgent::new(perception.observation_len(), &config.agent, device)?;
        Ok(Self {
            env,
            agent,
            config,
            scale,
            phase: Phase::Collecting,
            episodes_done: 0,
            checkpoint_dir: None,
            checkpoints_written: 0,
        })
    }

    pub fn with_checkpoints(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = Some(dir.into());
        self
    }

    pub fn config(&self) -> &DinoConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn episodes_done(&self) -> u64 {
        self.episodes_done
    }

    pub fn checkpoints_written(&self) -> u64 {
        self.checkpoints_written
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            tracing::debug!(from = ?self.phase, to = ?phase, episode = self.episodes_done, "phase change");
            self.phase = phase;
        }
    }

    pub fn run_episode(&mut self) -> Result<EpisodeStats> {
        let epsilon = self.agent.epsilon;
        let mut obs = self.env.reset().scaled(&self.scale);
        let mut reward = 0.0;
        let mut loss_sum = 0.0;
        let mut loss_count = 0u32;

        let score = loop {
            let action = self.agent.select_action(&obs)?;
            let out = self.env.step(action);
            let next_obs = out.observation.scaled(&self.scale);
            reward += out.reward;
            self.agent.remember(Transition {
                obs,
                action,
                reward: out.reward,
                next_obs: next_obs.clone(),
                done: out.done,
            });

            if self.agent.replay.len() >= self.config.agent.batch_size {
                self.set_phase(Phase::Training);
                if let Some(loss) = self.agent.train_step()? {
                    loss_sum += loss;
                    loss_count += 1;
                }
            } else {
                self.set_phase(Phase::Collecting);
            }

            obs = next_obs;
            if out.done {
                break out.score;
            }
        };

        self.episodes_done += 1;
        self.agent.decay_epsilon();
        if self.episodes_done % self.config.agent.target_sync_interval == 0 {
            self.set_phase(Phase::Synchronizing);
            self.agent.sync_target()?;
            tracing::debug!(episode = self.episodes_done, "target network synced");
        }

        let stats = EpisodeStats {
            episode: self.episodes_done,
            reward,
            score,
            epsilon,
            mean_loss: (loss_count > 0).then(|| loss_sum / loss_count as f32),
            updates: self.agent.updates(),
        };
        tracing::info!(
            episode = stats.episode,
            score = stats.score,
            reward = stats.reward,
            epsilon = stats.epsilon,
            loss = ?stats.mean_loss,
            "episode finished"
        );
        Ok(stats)
    }

    /// Runs until `episodes` episodes have completed in total, counting any
    /// restored from a checkpoint.
    pub fn run(&mut self, episodes: u64) -> Result<TrainingReport> {
        let mut stats = Vec::new();
        let mut saved_at = None;
        while self.episodes_done < episodes {
            stats.push(self.run_episode()?);
            let every = self.config.training.checkpoint_every;
            if every > 0 && self.episodes_done % every == 0 {
                self.save_checkpoint()?;
                saved_at = Some(self.episodes_done);
            }
        }
        if saved_at != Some(self.episodes_done) {
            self.save_checkpoint()?;
        }

        let report = TrainingReport::from_episodes(stats, self.agent.updates());
        tracing::info!(
            episodes = report.episodes.len(),
            best = report.best_score,
            mean = report.mean_score,
            updates = report.total_updates,
            "training finished"
        );
        Ok(report)
    }

    fn save_checkpoint(&mut self) -> Result<()> {
        if let Some(dir) = &self.checkpoint_dir {
            checkpoint::save(dir, &self.agent, self.episodes_done, &self.config)?;
            self.checkpoints_written += 1;
        }
        Ok(())
    }

    /// Continues from a checkpoint written under a compatible network shape.
    pub fn resume(&mut self, dir: &Path) -> Result<()> {
        let saved = checkpoint::load_state(dir)?.config;
        let saved_len = Perception::new(saved.perception.clone(), &saved.game).observation_len();
        let shape = |len: usize, cfg: &DinoConfig| (len, cfg.agent.hidden, cfg.agent.num_actions);
        if shape(saved_len, &saved) != shape(self.agent.obs_len(), &self.config) {
            return Err(DinoError::Config(format!(
                "checkpoint network (obs {saved_len}, hidden {}, actions {}) does not match this run (obs {}, hidden {}, actions {})",
                saved.agent.hidden,
                saved.agent.num_actions,
                self.agent.obs_len(),
                self.config.agent.hidden,
                self.config.agent.num_actions,
            )));
        }
        let state = checkpoint::restore(dir, &mut self.agent)?;
        self.episodes_done = state.episodes_done;
        tracing::info!(episode = state.episodes_done, epsilon = state.epsilon, "resumed from checkpoint");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalEpisode {
    pub seed: u64,
    pub score: u64,
    pub reward: f32,
    pub collided: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalReport {
    pub episodes: Vec<EvalEpisode>,
    pub best_score: u64,
    pub mean_score: f64,
}

/// Greedy rollouts, one per seed, each on its own environment. The network is
/// only read, so rollouts run in parallel.
pub fn evaluate(network: &QNetwork, config: &DinoConfig, seeds: &[u64]) -> Result<EvalReport> {
    let episodes: Vec<EvalEpisode> = seeds
        .par_iter()
        .map(|&seed| -> Result<EvalEpisode> {
            let mut env = DinoEnv::new(config, seed);
            let scale = env.perception().input_scale();
            let mut obs = env.reset();
            let mut reward = 0.0;
            loop {
                let action = network.greedy_action(&obs.scaled(&scale))?;
                let out = env.step(action);
                reward += out.reward;
                if out.done {
                    return Ok(EvalEpisode { seed, score: out.score, reward, collided: out.collided });
                }
                obs = out.observation;
            }
        })
        .collect::<Result<_>>()?;

    let best_score = episodes.iter().map(|e| e.score).max().unwrap_or(0);
    let mean_score = if episodes.is_empty() {
        0.0
    } else {
        episodes.iter().map(|e| e.score as f64).sum::<f64>() / episodes.len() as f64
    };
    Ok(EvalReport { episodes, best_score, mean_score })
}
