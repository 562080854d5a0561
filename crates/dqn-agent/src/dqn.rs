//! Deep Q-Network (DQN) learner: bootstrapped regression and target sync

use ndarray::{Array1, Array2, Axis};
use tracing::debug;

use dqn_core::{DqnError, Result, StateVector, Transition};

use crate::network::QNetwork;
use crate::optimizer::Adam;

/// Policy network, its frozen target copy and the optimizer that trains the policy
#[derive(Debug, Clone)]
pub struct DqnLearner {
    policy: QNetwork,
    target: QNetwork,
    optimizer: Adam,
    discount_factor: f32,
}

impl DqnLearner {
    /// Build a learner whose target starts as an exact copy of `policy`
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn new(policy: QNetwork, learning_rate: f64, discount_factor: f64) -> Self {
        Self {
            target: policy.clone(),
            policy,
            optimizer: Adam::new(learning_rate as f32),
            discount_factor: discount_factor as f32,
        }
    }

    /// The network being trained
    #[must_use]
    pub fn policy(&self) -> &QNetwork {
        &self.policy
    }

    /// The periodically refreshed snapshot
    #[must_use]
    pub fn target(&self) -> &QNetwork {
        &self.target
    }

    /// Number of optimizer steps taken
    #[must_use]
    pub fn updates(&self) -> i32 {
        self.optimizer.steps()
    }

    /// Overwrite the target network with the current policy parameters
    pub fn sync_target(&mut self) -> Result<()> {
        self.target.copy_from(&self.policy)?;
        debug!(updates = self.updates(), "target network synchronised");
        Ok(())
    }

    /// Regression targets `r + (1 - terminated) * gamma * max_a Q_target(s')[a]`
    ///
    /// Terminal transitions yield exactly their reward; the target network is
    /// not consulted for them at all.
    #[allow(clippy::cast_possible_truncation)]
    pub fn compute_targets(&self, batch: &[Transition]) -> Result<Array1<f32>> {
        let next_states = stack_states(batch.iter().map(|t| &t.next_state), self.target.state_dim())?;
        let next_values = self.target.forward_batch(&next_states.view())?;

        let targets = batch
            .iter()
            .zip(next_values.axis_iter(Axis(0)))
            .map(|(transition, values)| {
                let reward = transition.reward as f32;
                if transition.is_terminal() {
                    reward
                } else {
                    let best = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                    reward + self.discount_factor * best
                }
            })
            .collect();

        Ok(targets)
    }

    /// One gradient step of the policy towards the bootstrapped targets
    ///
    /// Returns the batch loss. A non-finite loss aborts before any parameter
    /// is modified.
    pub fn optimize(&mut self, batch: &[Transition]) -> Result<f32> {
        if batch.is_empty() {
            return Err(DqnError::SampleUnderflow {
                requested: 1,
                available: 0,
            });
        }

        let targets = self.compute_targets(batch)?;
        let states = stack_states(batch.iter().map(|t| &t.state), self.policy.state_dim())?;
        let actions: Vec<usize> = batch.iter().map(|t| t.action.index()).collect();

        let (loss, gradients) =
            self.policy
                .loss_and_gradients(&states.view(), &actions, &targets.view())?;
        if !loss.is_finite() {
            return Err(DqnError::NumericInstability(format!(
                "loss became {loss} after {} updates",
                self.updates()
            )));
        }

        let gradients = gradients.flatten();
        if gradients.iter().any(|g| !g.is_finite()) {
            return Err(DqnError::NumericInstability(
                "gradient contains non-finite values".into(),
            ));
        }

        let mut params = self.policy.parameters();
        self.optimizer.step(&mut params, &gradients)?;
        self.policy.set_parameters(&params)?;

        Ok(loss)
    }
}

/// Stack equally sized states into a `(batch, dim)` matrix
fn stack_states<'a>(states: impl Iterator<Item = &'a StateVector>, dim: usize) -> Result<Array2<f32>> {
    let mut flat = Vec::new();
    let mut rows = 0;
    for state in states {
        if state.len() != dim {
            return Err(DqnError::ProtocolMismatch {
                expected: dim,
                actual: state.len(),
            });
        }
        flat.extend_from_slice(state.as_slice());
        rows += 1;
    }
    let len = flat.len();
    Array2::from_shape_vec((rows, dim), flat).map_err(|_| DqnError::DimensionMismatch {
        expected: rows * dim,
        actual: len,
    })
}
