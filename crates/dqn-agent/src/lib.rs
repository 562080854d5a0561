//! DQN agent for remote environments
//!
//! This crate provides the learning side of the system:
//! - Bounded FIFO experience replay
//! - Q-networks with hand-written backpropagation and an Adam optimizer
//! - Epsilon-greedy exploration
//! - The training loop with target-network synchronisation
//! - Run artifacts: milestone log, checkpoint and trend plot

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod artifacts;
pub mod buffer;
pub mod dqn;
pub mod exploration;
pub mod network;
pub mod optimizer;
pub mod plot;
pub mod trainer;

// Re-export the learning components
pub use buffer::ReplayBuffer;
pub use dqn::DqnLearner;
pub use exploration::EpsilonGreedy;
pub use network::{argmax, Gradients, QNetwork};
pub use optimizer::Adam;

// Re-export the run driver and its sinks
pub use artifacts::{PolicyCheckpoint, RunArtifacts, DATE_FORMAT};
pub use trainer::{StopCause, Trainer, TrainerOptions, TrainingSummary};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        DqnLearner, EpsilonGreedy, QNetwork, ReplayBuffer, RunArtifacts, StopCause, Trainer,
        TrainerOptions, TrainingSummary,
    };
    pub use dqn_core::prelude::*;
}
