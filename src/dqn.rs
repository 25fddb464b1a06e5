use crate::config::AgentConfig;
use crate::error::{DinoError, Result};
use crate::replay::{ReplayBuffer, Transition};
use candle_core as candle;
use candle::{DType, Device, Tensor};
use candle_nn as nn;
use candle_nn::{Module, Optimizer, VarBuilder, VarMap};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::path::Path;

/// Observation -> one value estimate per action.
#[derive(Debug)]
pub struct QNetwork {
    fc1: nn::Linear,
    fc2: nn::Linear,
    out: nn::Linear,
    device: Device,
}

impl QNetwork {
    pub fn new(vb: VarBuilder, input: usize, hidden: usize, actions: usize) -> candle::Result<Self> {
        // Scope variable names so online and target maps line up by name.
        let fc1 = nn::linear(input, hidden, vb.pp("fc1"))?;
        let fc2 = nn::linear(hidden, hidden, vb.pp("fc2"))?;
        let out = nn::linear(hidden, actions, vb.pp("out"))?;
        Ok(Self { fc1, fc2, out, device: vb.device().clone() })
    }

    pub fn build(vars: &VarMap, input: usize, config: &AgentConfig, device: &Device) -> Result<Self> {
        let vb = VarBuilder::from_varmap(vars, DType::F32, device);
        Ok(Self::new(vb, input, config.hidden, config.num_actions)?)
    }

    pub fn forward(&self, x: &Tensor) -> candle::Result<Tensor> {
        let x = self.fc1.forward(x)?.relu()?;
        let x = self.fc2.forward(&x)?.relu()?;
        self.out.forward(&x)
    }

    pub fn q_values(&self, obs: &[f32]) -> Result<Vec<f32>> {
        let x = Tensor::from_slice(obs, (1, obs.len()), &self.device)?;
        Ok(self.forward(&x)?.squeeze(0)?.to_vec1::<f32>()?)
    }

    /// Highest-valued action; ties go to the lowest id.
    pub fn greedy_action(&self, obs: &[f32]) -> Result<usize> {
        let q = self.q_values(obs)?;
        let mut best = 0;
        for (i, v) in q.iter().enumerate().skip(1) {
            if *v > q[best] {
                best = i;
            }
        }
        Ok(best)
    }
}

/// Uniform(-1/sqrt(fan_in), 1/sqrt(fan_in)) weights and zero biases, drawn in
/// variable-name order so a seed fixes the whole network.
fn init_from_rng(vars: &VarMap, rng: &mut SmallRng) -> Result<()> {
    let data = vars.data().lock().map_err(|_| DinoError::Poisoned)?;
    let mut names: Vec<&String> = data.keys().collect();
    names.sort();
    for name in names {
        let var = &data[name];
        let dims = var.dims().to_vec();
        let n: usize = dims.iter().product();
        let values: Vec<f32> = if dims.len() == 2 {
            let bound = 1.0 / (dims[1] as f32).sqrt();
            (0..n).map(|_| rng.gen_range(-bound..bound)).collect()
        } else {
            vec![0.0; n]
        };
        var.set(&Tensor::from_vec(values, dims.as_slice(), var.device())?)?;
    }
    Ok(())
}

pub struct DqnAgent {
    pub online: QNetwork,
    target: QNetwork,
    pub(crate) online_vars: VarMap,
    target_vars: VarMap,
    opt: nn::AdamW,
    pub replay: ReplayBuffer,
    pub epsilon: f32,
    pub config: AgentConfig,
    obs_len: usize,
    pub(crate) updates: u64,
    diverged: Option<(u64, f32)>,
    rng: SmallRng,
    device: Device,
}

impl DqnAgent {
    pub fn new(obs_len: usize, config: &AgentConfig, device: &Device) -> Result<Self> {
        let mut rng = SmallRng::seed_from_u64(config.seed);
        let online_vars = VarMap::new();
        let target_vars = VarMap::new();
        let online = QNetwork::build(&online_vars, obs_len, config, device)?;
        let target = QNetwork::build(&target_vars, obs_len, config, device)?;
        init_from_rng(&online_vars, &mut rng)?;
        let opt = nn::AdamW::new_lr(online_vars.all_vars(), config.learning_rate)?;
        let mut agent = Self {
            online,
            target,
            online_vars,
            target_vars,
            opt,
            replay: ReplayBuffer::new(config.replay_capacity),
            epsilon: config.epsilon_start,
            config: config.clone(),
            obs_len,
            updates: 0,
            diverged: None,
            rng,
            device: device.clone(),
        };
        agent.sync_target()?;
        Ok(agent)
    }

    pub fn obs_len(&self) -> usize {
        self.obs_len
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn q_values(&self, obs: &[f32]) -> Result<Vec<f32>> {
        self.online.q_values(obs)
    }

    pub fn target_q_values(&self, obs: &[f32]) -> Result<Vec<f32>> {
        self.target.q_values(obs)
    }

    pub fn greedy_action(&self, obs: &[f32]) -> Result<usize> {
        self.online.greedy_action(obs)
    }

    /// Epsilon-greedy over the online network.
    pub fn select_action(&mut self, obs: &[f32]) -> Result<usize> {
        if self.rng.r#gen::<f32>() < self.epsilon {
            Ok(self.rng.gen_range(0..self.config.num_actions))
        } else {
            self.greedy_action(obs)
        }
    }

    pub fn remember(&mut self, t: Transition) {
        self.replay.push(t);
    }

    /// One gradient step on a uniformly sampled batch. `Ok(None)` until the
    /// buffer holds a full batch. A non-finite loss leaves the parameters
    /// untouched and poisons the agent for the rest of the run.
    pub fn train_step(&mut self) -> Result<Option<f32>> {
        if let Some((update, loss)) = self.diverged {
            return Err(DinoError::Divergence { update, loss });
        }
        if self.replay.len() < self.config.batch_size {
            return Ok(None);
        }

        let batch = self.replay.sample(self.config.batch_size, &mut self.rng);
        let n = batch.len();
        let mut s = Vec::with_capacity(n * self.obs_len);
        let mut a = Vec::with_capacity(n);
        let mut r = Vec::with_capacity(n);
        let mut ns = Vec::with_capacity(n * self.obs_len);
        let mut not_done = Vec::with_capacity(n);
        for t in batch {
            s.extend_from_slice(&t.obs);
            a.push(t.action as u32);
            r.push(t.reward);
            ns.extend_from_slice(&t.next_obs);
            not_done.push(if t.done { 0.0f32 } else { 1.0 });
        }

        let dev = &self.device;
        let s_t = Tensor::from_vec(s, (n, self.obs_len), dev)?;           // [B, obs]
        let a_t = Tensor::from_vec(a, (n, 1), dev)?;                      // [B, 1]
        let r_t = Tensor::from_vec(r, n, dev)?;                           // [B]
        let ns_t = Tensor::from_vec(ns, (n, self.obs_len), dev)?;         // [B, obs]
        let not_done_t = Tensor::from_vec(not_done, n, dev)?;             // [B]

        let q_a = self.online.forward(&s_t)?.gather(&a_t, 1)?.squeeze(1)?; // [B]
        let max_nq = self.target.forward(&ns_t)?.max(1)?;                  // [B]
        let bootstrap = (max_nq * not_done_t)?.affine(self.config.gamma as f64, 0.0)?;
        let target = (r_t + bootstrap)?.detach();
        let loss = (q_a - target)?.sqr()?.mean_all()?; // MSE

        let value = loss.to_scalar::<f32>()?;
        if !value.is_finite() {
            tracing::warn!(update = self.updates, loss = value, "non-finite loss, halting updates");
            self.diverged = Some((self.updates, value));
            return Err(DinoError::Divergence { update: self.updates, loss: value });
        }
        self.opt.backward_step(&loss)?;
        self.updates += 1;
        Ok(Some(value))
    }

    /// Hard copy of every online parameter into the target network.
    pub fn sync_target(&mut self) -> Result<()> {
        let online = self.online_vars.data().lock().map_err(|_| DinoError::Poisoned)?;
        let target = self.target_vars.data().lock().map_err(|_| DinoError::Poisoned)?;
        for (name, var) in target.iter() {
            let src = online
                .get(name)
                .ok_or_else(|| DinoError::Invariant(format!("target variable {name} missing from online net")))?;
            var.set(&src.as_tensor().detach())?;
        }
        Ok(())
    }

    pub fn decay_epsilon(&mut self) {
        self.epsilon = (self.epsilon * self.config.epsilon_decay).max(self.config.epsilon_floor);
    }

    pub fn save_weights(&self, path: &Path) -> Result<()> {
        self.online_vars.save(path)?;
        Ok(())
    }

    /// Loads online weights and re-syncs the target.
    pub fn load_weights(&mut self, path: &Path) -> Result<()> {
        self.online_vars.load(path)?;
        self.sync_target()
    }
}

pub fn preferred_device() -> Device {
    // Try CUDA if feature enabled, else CPU
    #[cfg(feature = "dqn-gpu-cuda")]
    if let Ok(dev) = Device::new_cuda(0) {
        return dev;
    }
    Device::Cpu
}
