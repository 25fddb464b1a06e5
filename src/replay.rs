use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub obs: Vec<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_obs: Vec<f32>,
    pub done: bool,
}

/// Fixed-capacity ring; once full, each push overwrites the oldest slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayBuffer {
    items: Vec<Transition>,
    cap: usize,
    idx: usize,
    full: bool,
}

impl ReplayBuffer {
    pub fn new(cap: usize) -> Self {
        assert!(cap > 0, "replay capacity must be positive");
        Self { items: Vec::with_capacity(cap), cap, idx: 0, full: false }
    }

    pub fn push(&mut self, t: Transition) {
        if self.full {
            self.items[self.idx] = t;
        } else {
            self.items.push(t);
            if self.items.len() == self.cap {
                self.full = true;
            }
        }
        self.idx = (self.idx + 1) % self.cap;
    }

    pub fn len(&self) -> usize {
        if self.full { self.cap } else { self.items.len() }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        let (newer, older) = if self.full { self.items.split_at(self.idx) } else { (&self.items[..], &[][..]) };
        older.iter().chain(newer.iter())
    }

    /// `batch` distinct transitions drawn uniformly, independent of age.
    pub fn sample<R: Rng>(&self, batch: usize, rng: &mut R) -> Vec<&Transition> {
        let n = self.len();
        rand::seq::index::sample(rng, n, batch.min(n)).into_iter().map(|i| &self.items[i]).collect()
    }
}
