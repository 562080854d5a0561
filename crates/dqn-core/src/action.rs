//! Discrete actions and the discrete action space

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{DqnError, Result};

/// Index of a discrete action, valid in `[0, action_dim)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscreteAction(pub usize);

impl DiscreteAction {
    /// The raw action index
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for DiscreteAction {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl std::fmt::Display for DiscreteAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Discrete action space with `n` actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscreteSpace {
    /// Number of discrete actions
    pub n: usize,
}

impl DiscreteSpace {
    /// Create a new discrete action space
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    /// Uniformly sample one action
    ///
    /// The space must be non-empty; `EnvironmentDims` rejects `action_dim == 0`
    /// before a space is ever built from it.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> DiscreteAction {
        DiscreteAction(rng.gen_range(0..self.n))
    }

    /// Check if an action is valid within this space
    #[must_use]
    pub fn contains(&self, action: DiscreteAction) -> bool {
        action.0 < self.n
    }

    /// Return the action unchanged if it is in range
    pub fn check(&self, action: DiscreteAction) -> Result<DiscreteAction> {
        if self.contains(action) {
            Ok(action)
        } else {
            Err(DqnError::InvalidAction {
                action: action.0,
                action_dim: self.n,
            })
        }
    }
}
