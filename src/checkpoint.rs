//! On-disk training state: online weights (safetensors), progress counters
//! plus the full config (JSON), and the replay buffer (bincode).

use crate::config::DinoConfig;
use crate::dqn::{DqnAgent, QNetwork};
use crate::error::Result;
use crate::perception::Perception;
use crate::replay::ReplayBuffer;
use candle_core::Device;
use candle_nn::VarMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const WEIGHTS_FILE: &str = "online.safetensors";
const STATE_FILE: &str = "agent.json";
const REPLAY_FILE: &str = "replay.bin";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    pub episodes_done: u64,
    pub epsilon: f32,
    pub updates: u64,
    pub config: DinoConfig,
}

pub fn save(dir: &Path, agent: &DqnAgent, episodes_done: u64, config: &DinoConfig) -> Result<()> {
    fs::create_dir_all(dir)?;
    agent.save_weights(&dir.join(WEIGHTS_FILE))?;
    let state = CheckpointState { episodes_done, epsilon: agent.epsilon, updates: agent.updates(), config: config.clone() };
    fs::write(dir.join(STATE_FILE), serde_json::to_vec_pretty(&state)?)?;
    let replay = bincode::serde::encode_to_vec(&agent.replay, bincode::config::standard())?;
    fs::write(dir.join(REPLAY_FILE), replay)?;
    tracing::debug!(dir = %dir.display(), episode = episodes_done, "checkpoint written");
    Ok(())
}

pub fn load_state(dir: &Path) -> Result<CheckpointState> {
    let raw = fs::read(dir.join(STATE_FILE))?;
    Ok(serde_json::from_slice(&raw)?)
}

/// Restores weights, epsilon, update count and replay contents into `agent`.
pub fn restore(dir: &Path, agent: &mut DqnAgent) -> Result<CheckpointState> {
    let state = load_state(dir)?;
    agent.load_weights(&dir.join(WEIGHTS_FILE))?;
    agent.epsilon = state.epsilon;
    agent.updates = state.updates;
    let replay_path = dir.join(REPLAY_FILE);
    if replay_path.exists() {
        let raw = fs::read(replay_path)?;
        let (replay, _): (ReplayBuffer, usize) = bincode::serde::decode_from_slice(&raw, bincode::config::standard())?;
        agent.replay = replay;
    }
    Ok(state)
}

/// Rebuilds the saved online network for inference, with the config it was
/// trained under.
pub fn load_policy(dir: &Path, device: &Device) -> Result<(QNetwork, DinoConfig)> {
    let state = load_state(dir)?;
    let cfg = state.config;
    let obs_len = Perception::new(cfg.perception.clone(), &cfg.game).observation_len();
    let mut vars = VarMap::new();
    let net = QNetwork::build(&vars, obs_len, &cfg.agent, device)?;
    vars.load(dir.join(WEIGHTS_FILE))?;
    Ok((net, cfg))
}
