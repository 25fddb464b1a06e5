use crate::config::DinoConfig;
use crate::game::{Action, Game, RenderSnapshot, TickReport};
use crate::perception::{Observation, Perception};

/// Fixed mapping from external action ids; anything else is the no-op.
pub fn action_from_id(id: usize) -> Action {
    match id {
        0 => Action::Jump,
        1 => Action::Duck,
        _ => Action::None,
    }
}

pub trait RewardFn {
    fn reward(&self, report: &TickReport, game: &Game) -> f32;
}

impl<F> RewardFn for F
where
    F: Fn(&TickReport, &Game) -> f32,
{
    fn reward(&self, report: &TickReport, game: &Game) -> f32 {
        self(report, game)
    }
}

/// Flat payout for every tick that did not end in a collision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurvivalReward {
    pub per_tick: f32,
}

impl Default for SurvivalReward {
    fn default() -> Self {
        Self { per_tick: 0.1 }
    }
}

impl RewardFn for SurvivalReward {
    fn reward(&self, report: &TickReport, _game: &Game) -> f32 {
        if report.collided { 0.0 } else { self.per_tick }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub observation: Observation,
    pub reward: f32,
    pub done: bool,
    pub collided: bool,
    /// Ticks survived so far.
    pub score: u64,
}

pub struct DinoEnv<R: RewardFn = SurvivalReward> {
    game: Game,
    perception: Perception,
    reward: R,
}

impl DinoEnv<SurvivalReward> {
    pub fn new(config: &DinoConfig, seed: u64) -> Self {
        Self::with_reward(config, seed, SurvivalReward { per_tick: config.reward.per_tick })
    }
}

impl<R: RewardFn> DinoEnv<R> {
    pub fn with_reward(config: &DinoConfig, seed: u64, reward: R) -> Self {
        let game = Game::new(config.game.clone(), seed);
        let perception = Perception::new(config.perception.clone(), &config.game);
        Self { game, perception, reward }
    }

    pub fn reset(&mut self) -> Observation {
        self.game.reset();
        self.perception.observe(&self.game)
    }

    pub fn step(&mut self, action_id: usize) -> StepOutcome {
        let report = self.game.step(action_from_id(action_id));
        let reward = self.reward.reward(&report, &self.game);
        StepOutcome {
            observation: self.perception.observe(&self.game),
            reward,
            done: report.done,
            collided: report.collided,
            score: self.game.score(),
        }
    }

    pub fn observe(&self) -> Observation {
        self.perception.observe(&self.game)
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        self.game.snapshot()
    }

    pub fn score(&self) -> u64 {
        self.game.score()
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn perception(&self) -> &Perception {
        &self.perception
    }
}
