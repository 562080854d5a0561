//! Experience tuples and per-episode results

use serde::{Deserialize, Serialize};

use crate::{DiscreteAction, StateVector};

/// Single environment transition recorded by the training loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// State the action was taken in
    pub state: StateVector,
    /// Action taken
    pub action: DiscreteAction,
    /// State returned by the step
    pub next_state: StateVector,
    /// Reward received
    pub reward: f64,
    /// Intrinsic episode end (e.g. the pole fell)
    pub terminated: bool,
    /// External cutoff (e.g. step limit)
    pub truncated: bool,
}

impl Transition {
    /// Whether the bootstrapped future term must be dropped
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.terminated
    }
}

/// Outcome of one Reset-to-terminal trajectory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeResult {
    /// Zero-based episode index
    pub episode: usize,
    /// Exact sum of step rewards
    pub total_reward: f64,
    /// Number of step calls made
    pub steps: usize,
    /// Whether the last step reported `terminated`
    pub terminated: bool,
    /// Whether any step reported `truncated`
    pub truncated_seen: bool,
    /// Whether the loop exited on the reward threshold
    pub stopped_on_reward: bool,
}

impl EpisodeResult {
    /// Start accumulating a new episode
    #[must_use]
    pub fn begin(episode: usize) -> Self {
        Self {
            episode,
            total_reward: 0.0,
            steps: 0,
            terminated: false,
            truncated_seen: false,
            stopped_on_reward: false,
        }
    }

    /// Fold one step's outcome into the running totals
    pub fn record_step(&mut self, reward: f64, terminated: bool, truncated: bool) {
        self.total_reward += reward;
        self.steps += 1;
        self.terminated = terminated;
        self.truncated_seen |= truncated;
    }
}
