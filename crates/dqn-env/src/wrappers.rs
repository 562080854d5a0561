//! Simulator wrappers

use dqn_core::{DiscreteAction, EnvironmentDims, StateVector, StepOutcome};

use crate::server::Simulator;

/// Time limit wrapper
///
/// Sets `truncated` on every step at or beyond `max_steps` that did not
/// terminate. The episode itself is left running.
pub struct TimeLimit<S> {
    /// Inner simulator
    pub sim: S,
    /// Maximum steps
    pub max_steps: usize,
    /// Current step count
    pub steps: usize,
}

impl<S> TimeLimit<S> {
    /// Create a new time limit wrapper
    pub fn new(sim: S, max_steps: usize) -> Self {
        Self {
            sim,
            max_steps,
            steps: 0,
        }
    }
}

impl<S: Simulator> Simulator for TimeLimit<S> {
    fn dims(&self) -> EnvironmentDims {
        self.sim.dims()
    }

    fn reset(&mut self) -> StateVector {
        self.steps = 0;
        self.sim.reset()
    }

    fn step(&mut self, action: DiscreteAction) -> StepOutcome {
        self.steps += 1;
        let mut outcome = self.sim.step(action);
        if self.steps >= self.max_steps && !outcome.terminated {
            outcome.truncated = true;
        }
        outcome
    }
}
