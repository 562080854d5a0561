//! Q-value network used for both the policy and the target copy
//!
//! A single ReLU hidden layer followed by a linear head with one output per
//! action. Pure ndarray, with hand-written backpropagation for the DQN loss.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use dqn_core::{DiscreteAction, DqnError, EnvironmentDims, Result, StateVector};

/// Two-layer MLP mapping a state to per-action values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QNetwork {
    /// Hidden layer weights, `(state_dim, hidden_width)`
    w1: Array2<f32>,
    /// Hidden layer biases
    b1: Array1<f32>,
    /// Output layer weights, `(hidden_width, action_dim)`
    w2: Array2<f32>,
    /// Output layer biases
    b2: Array1<f32>,
}

/// Gradients of the loss with respect to every parameter
#[derive(Debug, Clone)]
pub struct Gradients {
    /// Gradient for `w1`
    pub w1: Array2<f32>,
    /// Gradient for `b1`
    pub b1: Array1<f32>,
    /// Gradient for `w2`
    pub w2: Array2<f32>,
    /// Gradient for `b2`
    pub b2: Array1<f32>,
}

impl Gradients {
    /// Flatten in the same order as [`QNetwork::parameters`]
    #[must_use]
    pub fn flatten(&self) -> Vec<f32> {
        self.w1
            .iter()
            .chain(self.b1.iter())
            .chain(self.w2.iter())
            .chain(self.b2.iter())
            .copied()
            .collect()
    }
}

impl QNetwork {
    /// Create a freshly initialised network for the given dimensions
    pub fn new<R: Rng + ?Sized>(dims: EnvironmentDims, hidden_width: usize, rng: &mut R) -> Self {
        Self {
            w1: Self::xavier_init(dims.state_dim, hidden_width, rng),
            b1: Array1::zeros(hidden_width),
            w2: Self::xavier_init(hidden_width, dims.action_dim, rng),
            b2: Array1::zeros(dims.action_dim),
        }
    }

    /// Xavier initialization for weights
    #[allow(clippy::cast_precision_loss)]
    fn xavier_init<R: Rng + ?Sized>(in_dim: usize, out_dim: usize, rng: &mut R) -> Array2<f32> {
        let limit = (6.0 / (in_dim + out_dim) as f32).sqrt();
        Array2::from_shape_fn((in_dim, out_dim), |_| rng.gen_range(-limit..limit))
    }

    /// Input length
    #[must_use]
    pub fn state_dim(&self) -> usize {
        self.w1.nrows()
    }

    /// Number of outputs
    #[must_use]
    pub fn action_dim(&self) -> usize {
        self.w2.ncols()
    }

    /// Hidden layer width
    #[must_use]
    pub fn hidden_width(&self) -> usize {
        self.w1.ncols()
    }

    /// The shape contract this network was built for
    #[must_use]
    pub fn dims(&self) -> EnvironmentDims {
        EnvironmentDims {
            state_dim: self.state_dim(),
            action_dim: self.action_dim(),
        }
    }

    fn check_input(&self, len: usize) -> Result<()> {
        if len == self.state_dim() {
            Ok(())
        } else {
            Err(DqnError::DimensionMismatch {
                expected: self.state_dim(),
                actual: len,
            })
        }
    }

    /// Action values for a single state
    pub fn forward(&self, input: &ArrayView1<f32>) -> Result<Array1<f32>> {
        self.check_input(input.len())?;
        let hidden = (input.dot(&self.w1) + &self.b1).mapv(relu);
        Ok(hidden.dot(&self.w2) + &self.b2)
    }

    /// Action values for a batch of states, one row each
    pub fn forward_batch(&self, inputs: &ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_input(inputs.ncols())?;
        let hidden = (inputs.dot(&self.w1) + &self.b1).mapv(relu);
        Ok(hidden.dot(&self.w2) + &self.b2)
    }

    /// Highest-valued action, ties going to the lowest index
    pub fn greedy_action(&self, state: &StateVector) -> Result<DiscreteAction> {
        let q_values = self.forward(&state.view())?;
        Ok(DiscreteAction(argmax(&q_values.view())))
    }

    /// Mean squared error between `Q(s)[a]` and `targets`, with gradients
    ///
    /// Only the output of the taken action contributes to the loss.
    #[allow(clippy::cast_precision_loss)]
    pub fn loss_and_gradients(
        &self,
        states: &ArrayView2<f32>,
        actions: &[usize],
        targets: &ArrayView1<f32>,
    ) -> Result<(f32, Gradients)> {
        self.check_input(states.ncols())?;
        let batch = states.nrows();
        if actions.len() != batch || targets.len() != batch {
            return Err(DqnError::DimensionMismatch {
                expected: batch,
                actual: actions.len().min(targets.len()),
            });
        }
        if let Some(&bad) = actions.iter().find(|&&a| a >= self.action_dim()) {
            return Err(DqnError::InvalidAction {
                action: bad,
                action_dim: self.action_dim(),
            });
        }

        let pre_activation = states.dot(&self.w1) + &self.b1;
        let hidden = pre_activation.mapv(relu);
        let q_values = hidden.dot(&self.w2) + &self.b2;

        let scale = 1.0 / batch.max(1) as f32;
        let mut grad_q = Array2::<f32>::zeros(q_values.raw_dim());
        let mut loss = 0.0_f32;
        for (row, (&action, &target)) in actions.iter().zip(targets.iter()).enumerate() {
            let diff = q_values[[row, action]] - target;
            loss += diff * diff;
            grad_q[[row, action]] = 2.0 * diff * scale;
        }
        loss *= scale;

        let grad_w2 = hidden.t().dot(&grad_q);
        let grad_b2 = grad_q.sum_axis(Axis(0));
        let grad_hidden = grad_q.dot(&self.w2.t());
        let grad_pre = grad_hidden * &pre_activation.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
        let grad_w1 = states.t().dot(&grad_pre);
        let grad_b1 = grad_pre.sum_axis(Axis(0));

        Ok((
            loss,
            Gradients {
                w1: grad_w1,
                b1: grad_b1,
                w2: grad_w2,
                b2: grad_b2,
            },
        ))
    }

    /// Total number of scalar parameters
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.w1.len() + self.b1.len() + self.w2.len() + self.b2.len()
    }

    /// Flattened parameters: `w1`, `b1`, `w2`, `b2` in row-major order
    #[must_use]
    pub fn parameters(&self) -> Vec<f32> {
        self.w1
            .iter()
            .chain(self.b1.iter())
            .chain(self.w2.iter())
            .chain(self.b2.iter())
            .copied()
            .collect()
    }

    /// Overwrite every parameter from a flattened vector
    pub fn set_parameters(&mut self, params: &[f32]) -> Result<()> {
        if params.len() != self.parameter_count() {
            return Err(DqnError::DimensionMismatch {
                expected: self.parameter_count(),
                actual: params.len(),
            });
        }

        let slots = self
            .w1
            .iter_mut()
            .chain(self.b1.iter_mut())
            .chain(self.w2.iter_mut())
            .chain(self.b2.iter_mut());
        for (slot, &value) in slots.zip(params) {
            *slot = value;
        }
        Ok(())
    }

    /// Make this network an exact copy of `source`
    pub fn copy_from(&mut self, source: &QNetwork) -> Result<()> {
        if self.dims() != source.dims() || self.hidden_width() != source.hidden_width() {
            return Err(DqnError::DimensionMismatch {
                expected: self.parameter_count(),
                actual: source.parameter_count(),
            });
        }
        self.clone_from(source);
        Ok(())
    }
}

fn relu(v: f32) -> f32 {
    v.max(0.0)
}

/// Index of the largest value; the first one wins ties and NaN never wins
#[must_use]
pub fn argmax(values: &ArrayView1<f32>) -> usize {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}
