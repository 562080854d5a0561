//! Environment contract: the three remote operations seen as local calls

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{DiscreteAction, DqnError, EnvironmentDims, EpisodeResult, Result, StateVector};

/// Why a reset is being requested
///
/// The reason travels to the environment process as an advisory string.
#[derive(Debug, Clone, PartialEq)]
pub enum ResetReason {
    /// A new episode is about to start
    EpisodeStart {
        /// Index of the episode being started
        episode: usize,
    },
    /// Acknowledge that an episode has ended
    EpisodeEnd(EpisodeResult),
}

impl std::fmt::Display for ResetReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EpisodeStart { episode } => write!(f, "episode {episode} start"),
            Self::EpisodeEnd(result) => write!(
                f,
                "episode {} ended after {} steps with reward {:.1}",
                result.episode, result.steps, result.total_reward
            ),
        }
    }
}

/// Response to a reset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetOutcome {
    /// Initial state of the fresh episode
    pub state: StateVector,
    /// Whether the environment process confirmed the reset
    pub acknowledged: bool,
}

/// Response to a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// State after the action
    pub state: StateVector,
    /// Reward signal
    pub reward: f64,
    /// Intrinsic end of episode
    pub terminated: bool,
    /// External cutoff such as a time limit
    pub truncated: bool,
}

/// Core environment trait
///
/// Every call is a single round-trip that suspends the caller until the
/// environment answers.
#[async_trait]
pub trait Environment: Send {
    /// Fetch the fixed state/action dimensionality. Called once per run.
    async fn setup(&mut self) -> Result<EnvironmentDims>;

    /// Reset the environment and return the starting state
    async fn reset(&mut self, reason: ResetReason) -> Result<ResetOutcome>;

    /// Apply one action
    async fn step(&mut self, action: DiscreteAction) -> Result<StepOutcome>;
}

/// Wrapper that enforces the shape contract established by setup
///
/// Actions outside the space are rejected before they are sent and any state
/// whose length differs from `state_dim` surfaces as
/// [`DqnError::ProtocolMismatch`].
pub struct CheckedEnvironment<E> {
    /// Inner environment
    pub env: E,
    dims: Option<EnvironmentDims>,
}

impl<E> CheckedEnvironment<E> {
    /// Wrap an environment
    pub fn new(env: E) -> Self {
        Self { env, dims: None }
    }

    /// Dimensions recorded by the last successful setup
    pub fn dims(&self) -> Option<EnvironmentDims> {
        self.dims
    }

    fn require_dims(&self) -> Result<EnvironmentDims> {
        self.dims
            .ok_or_else(|| DqnError::Environment("setup must be called before reset or step".into()))
    }
}

#[async_trait]
impl<E> Environment for CheckedEnvironment<E>
where
    E: Environment,
{
    async fn setup(&mut self) -> Result<EnvironmentDims> {
        let dims = self.env.setup().await?;
        let dims = EnvironmentDims::new(dims.state_dim, dims.action_dim)?;
        self.dims = Some(dims);
        Ok(dims)
    }

    async fn reset(&mut self, reason: ResetReason) -> Result<ResetOutcome> {
        let dims = self.require_dims()?;
        let outcome = self.env.reset(reason).await?;
        dims.check_state(&outcome.state)?;
        Ok(outcome)
    }

    async fn step(&mut self, action: DiscreteAction) -> Result<StepOutcome> {
        let dims = self.require_dims()?;
        dims.check_action(action)?;
        let outcome = self.env.step(action).await?;
        dims.check_state(&outcome.state)?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Environment that always reports a fixed state length
    struct FixedLength {
        reported: EnvironmentDims,
        state_len: usize,
        steps: usize,
    }

    #[async_trait]
    impl Environment for FixedLength {
        async fn setup(&mut self) -> Result<EnvironmentDims> {
            Ok(self.reported)
        }

        async fn reset(&mut self, _reason: ResetReason) -> Result<ResetOutcome> {
            Ok(ResetOutcome {
                state: StateVector::new(vec![0.0; self.state_len]),
                acknowledged: true,
            })
        }

        async fn step(&mut self, _action: DiscreteAction) -> Result<StepOutcome> {
            self.steps += 1;
            Ok(StepOutcome {
                state: StateVector::new(vec![0.0; self.state_len]),
                reward: 1.0,
                terminated: false,
                truncated: false,
            })
        }
    }

    fn env(state_len: usize) -> CheckedEnvironment<FixedLength> {
        CheckedEnvironment::new(FixedLength {
            reported: EnvironmentDims {
                state_dim: 4,
                action_dim: 2,
            },
            state_len,
            steps: 0,
        })
    }

    #[tokio::test]
    async fn test_reset_before_setup_fails() {
        let mut env = env(4);
        let err = env
            .reset(ResetReason::EpisodeStart { episode: 0 })
            .await
            .unwrap_err();
        assert!(matches!(err, DqnError::Environment(_)));
    }

    #[tokio::test]
    async fn test_undersized_state_is_protocol_mismatch() {
        let mut env = env(3);
        env.setup().await.unwrap();
        let err = env
            .reset(ResetReason::EpisodeStart { episode: 0 })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DqnError::ProtocolMismatch { expected: 4, actual: 3 }
        ));
    }

    #[tokio::test]
    async fn test_out_of_range_action_never_reaches_env() {
        let mut env = env(4);
        env.setup().await.unwrap();
        let err = env.step(DiscreteAction(2)).await.unwrap_err();
        assert!(matches!(err, DqnError::InvalidAction { .. }));
        assert_eq!(env.env.steps, 0);

        env.step(DiscreteAction(1)).await.unwrap();
        assert_eq!(env.env.steps, 1);
    }

    #[test]
    fn test_reset_reason_text() {
        let mut result = EpisodeResult::begin(7);
        result.record_step(2.0, true, false);
        let reason = ResetReason::EpisodeEnd(result);
        assert_eq!(
            reason.to_string(),
            "episode 7 ended after 1 steps with reward 2.0"
        );
    }
}
