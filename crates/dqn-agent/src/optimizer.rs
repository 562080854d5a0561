//! Adam optimizer over flattened parameter vectors

use dqn_core::{DqnError, Result};

/// Adam with bias correction
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    /// First moment estimates
    momentum: Vec<f32>,
    /// Second moment estimates
    velocity: Vec<f32>,
    /// Steps taken so far
    t: i32,
}

impl Adam {
    /// Create an optimizer with the usual defaults for the moment decay rates
    #[must_use]
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            momentum: Vec::new(),
            velocity: Vec::new(),
            t: 0,
        }
    }

    /// Configured step size
    #[must_use]
    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Number of updates applied
    #[must_use]
    pub fn steps(&self) -> i32 {
        self.t
    }

    /// Apply one update in place
    pub fn step(&mut self, params: &mut [f32], grads: &[f32]) -> Result<()> {
        if params.len() != grads.len() {
            return Err(DqnError::DimensionMismatch {
                expected: params.len(),
                actual: grads.len(),
            });
        }
        if self.momentum.len() != params.len() {
            self.momentum = vec![0.0; params.len()];
            self.velocity = vec![0.0; params.len()];
            self.t = 0;
        }

        self.t = self.t.saturating_add(1);
        let bias1 = 1.0 - self.beta1.powi(self.t);
        let bias2 = 1.0 - self.beta2.powi(self.t);

        for (((param, &grad), m), v) in params
            .iter_mut()
            .zip(grads)
            .zip(self.momentum.iter_mut())
            .zip(self.velocity.iter_mut())
        {
            *m = self.beta1 * *m + (1.0 - self.beta1) * grad;
            *v = self.beta2 * *v + (1.0 - self.beta2) * grad * grad;
            let m_hat = *m / bias1;
            let v_hat = *v / bias2;
            *param -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_first_step_moves_by_learning_rate() {
        // With bias correction the first update is lr * sign(grad).
        let mut adam = Adam::new(0.1);
        let mut params = vec![1.0, -1.0, 0.0];
        adam.step(&mut params, &[2.0, -0.5, 0.0]).unwrap();

        assert_relative_eq!(params[0], 0.9, epsilon = 1e-6);
        assert_relative_eq!(params[1], -0.9, epsilon = 1e-6);
        assert_relative_eq!(params[2], 0.0, epsilon = 1e-6);
        assert_eq!(adam.steps(), 1);
    }

    #[test]
    fn test_minimises_quadratic() {
        let mut adam = Adam::new(0.05);
        let mut x = vec![3.0_f32];
        for _ in 0..500 {
            let grad = [2.0 * (x[0] - 1.0)];
            adam.step(&mut x, &grad).unwrap();
        }
        assert_relative_eq!(x[0], 1.0, epsilon = 5e-2);
    }

    #[test]
    fn test_length_mismatch() {
        let mut adam = Adam::new(0.1);
        let mut params = vec![0.0; 2];
        assert!(adam.step(&mut params, &[1.0]).is_err());
    }
}
