//! Epsilon-greedy exploration with multiplicative decay

use rand::Rng;

use dqn_core::{DiscreteAction, DiscreteSpace, Result, StateVector};

use crate::network::QNetwork;

/// Exploration rate that decays geometrically towards a floor
#[derive(Debug, Clone, PartialEq)]
pub struct EpsilonGreedy {
    epsilon: f64,
    decay: f64,
    min: f64,
}

impl EpsilonGreedy {
    /// Start at `init`, multiply by `decay` per call to [`Self::decay`], never below `min`
    #[must_use]
    pub fn new(init: f64, decay: f64, min: f64) -> Self {
        Self {
            epsilon: init,
            decay,
            min,
        }
    }

    /// Current exploration rate
    #[must_use]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Apply one decay step and return the new rate
    pub fn decay(&mut self) -> f64 {
        self.epsilon = (self.epsilon * self.decay).max(self.min);
        self.epsilon
    }

    /// Pick an action for `state`
    ///
    /// With `explore` set, a uniformly random action is taken with probability
    /// epsilon. Otherwise the policy's greedy action is used.
    pub fn select<R: Rng + ?Sized>(
        &self,
        policy: &QNetwork,
        state: &StateVector,
        space: DiscreteSpace,
        rng: &mut R,
        explore: bool,
    ) -> Result<DiscreteAction> {
        if explore && rng.gen::<f64>() < self.epsilon {
            Ok(space.sample(rng))
        } else {
            policy.greedy_action(state)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dqn_core::EnvironmentDims;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_reaches_floor_after_919_decays() {
        let mut schedule = EpsilonGreedy::new(1.0, 0.995, 0.01);
        let mut previous = schedule.epsilon();
        for _ in 0..919 {
            let next = schedule.decay();
            assert!(next <= previous);
            assert!(next >= 0.01);
            previous = next;
        }
        assert!(schedule.epsilon() <= 0.01);

        for _ in 0..100 {
            assert_eq!(schedule.decay(), 0.01);
        }
    }

    #[test]
    fn test_still_above_floor_after_918_decays() {
        let mut schedule = EpsilonGreedy::new(1.0, 0.995, 0.01);
        for _ in 0..918 {
            schedule.decay();
        }
        assert!(schedule.epsilon() > 0.01);
    }

    #[test]
    fn test_zero_epsilon_is_greedy() {
        let dims = EnvironmentDims::new(4, 3).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let policy = QNetwork::new(dims, 6, &mut rng);
        let state = StateVector::new(vec![0.2, -0.1, 0.05, 0.3]);
        let greedy = policy.greedy_action(&state).unwrap();

        let schedule = EpsilonGreedy::new(0.0, 1.0, 0.0);
        for _ in 0..20 {
            let action = schedule
                .select(&policy, &state, dims.action_space(), &mut rng, true)
                .unwrap();
            assert_eq!(action, greedy);
        }
    }

    #[test]
    fn test_full_epsilon_explores_every_action_in_range() {
        let dims = EnvironmentDims::new(2, 3).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let policy = QNetwork::new(dims, 4, &mut rng);
        let state = StateVector::new(vec![0.0, 0.0]);

        let schedule = EpsilonGreedy::new(1.0, 1.0, 1.0);
        let mut seen = [false; 3];
        for _ in 0..200 {
            let action = schedule
                .select(&policy, &state, dims.action_space(), &mut rng, true)
                .unwrap();
            seen[action.index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_evaluation_never_explores() {
        let dims = EnvironmentDims::new(2, 4).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let policy = QNetwork::new(dims, 4, &mut rng);
        let state = StateVector::new(vec![1.0, -1.0]);
        let greedy = policy.greedy_action(&state).unwrap();

        let schedule = EpsilonGreedy::new(1.0, 1.0, 1.0);
        for _ in 0..50 {
            let action = schedule
                .select(&policy, &state, dims.action_space(), &mut rng, false)
                .unwrap();
            assert_eq!(action, greedy);
        }
    }
}
