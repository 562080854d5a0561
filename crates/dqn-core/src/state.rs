//! State vectors and the dimensions agreed on during setup

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::{DiscreteAction, DiscreteSpace, DqnError, Result};

/// Fixed-length observation produced by the environment
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateVector(pub Vec<f32>);

impl StateVector {
    /// Create a state vector from raw values
    #[must_use]
    pub fn new(data: Vec<f32>) -> Self {
        Self(data)
    }

    /// Number of components
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the vector has no components
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the components
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// View as an ndarray vector for network input
    #[must_use]
    pub fn view(&self) -> ArrayView1<'_, f32> {
        ArrayView1::from(self.0.as_slice())
    }
}

impl From<Vec<f32>> for StateVector {
    fn from(data: Vec<f32>) -> Self {
        Self(data)
    }
}

/// Shape contract returned by setup and shared by both networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentDims {
    /// Length of every state vector
    pub state_dim: usize,
    /// Number of discrete actions
    pub action_dim: usize,
}

impl EnvironmentDims {
    /// Build dims, rejecting empty state or action spaces
    pub fn new(state_dim: usize, action_dim: usize) -> Result<Self> {
        if state_dim == 0 || action_dim == 0 {
            return Err(DqnError::Environment(format!(
                "environment reported degenerate dimensions state_dim={state_dim} action_dim={action_dim}"
            )));
        }
        Ok(Self {
            state_dim,
            action_dim,
        })
    }

    /// Action space derived from `action_dim`
    #[must_use]
    pub fn action_space(&self) -> DiscreteSpace {
        DiscreteSpace::new(self.action_dim)
    }

    /// Reject states whose length differs from `state_dim`
    pub fn check_state(&self, state: &StateVector) -> Result<()> {
        if state.len() == self.state_dim {
            Ok(())
        } else {
            Err(DqnError::ProtocolMismatch {
                expected: self.state_dim,
                actual: state.len(),
            })
        }
    }

    /// Reject actions outside `[0, action_dim)`
    pub fn check_action(&self, action: DiscreteAction) -> Result<DiscreteAction> {
        self.action_space().check(action)
    }
}

impl std::fmt::Display for EnvironmentDims {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "state_dim={}, action_dim={}",
            self.state_dim, self.action_dim
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_state_length() {
        let dims = EnvironmentDims::new(4, 2).unwrap();
        assert!(dims.check_state(&StateVector::new(vec![0.0; 4])).is_ok());

        let err = dims.check_state(&StateVector::new(vec![0.0; 3])).unwrap_err();
        assert!(matches!(
            err,
            DqnError::ProtocolMismatch { expected: 4, actual: 3 }
        ));
    }

    #[test]
    fn test_action_two_is_out_of_range_for_two_actions() {
        let dims = EnvironmentDims::new(4, 2).unwrap();
        assert!(dims.check_action(DiscreteAction(0)).is_ok());
        assert!(dims.check_action(DiscreteAction(1)).is_ok());
        assert!(dims.check_action(DiscreteAction(2)).is_err());
    }

    #[test]
    fn test_zero_dims_rejected() {
        assert!(EnvironmentDims::new(0, 2).is_err());
        assert!(EnvironmentDims::new(4, 0).is_err());
    }

    #[test]
    fn test_state_serializes_as_plain_array() {
        let state = StateVector::new(vec![0.5, -1.0]);
        assert_eq!(serde_json::to_string(&state).unwrap(), "[0.5,-1.0]");
    }
}
