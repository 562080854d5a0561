//! Core types for the remote-environment DQN trainer
//!
//! This crate holds the vocabulary shared by the agent and the environment
//! transport: state and action types, transitions, the [`Environment`]
//! contract, hyperparameters, the shutdown signal and the error type.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod config;
pub mod environment;
pub mod error;
pub mod shutdown;
pub mod state;
pub mod transition;

// Re-export core traits and types
pub use action::{DiscreteAction, DiscreteSpace};
pub use config::{HyperparameterSets, Hyperparameters};
pub use environment::{CheckedEnvironment, Environment, ResetOutcome, ResetReason, StepOutcome};
pub use error::{DqnError, Result};
pub use shutdown::{Shutdown, ShutdownTrigger};
pub use state::{EnvironmentDims, StateVector};
pub use transition::{EpisodeResult, Transition};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        DiscreteAction, DqnError, Environment, EnvironmentDims, EpisodeResult, Hyperparameters,
        ResetReason, Result, Shutdown, StateVector, StepOutcome, Transition,
    };
}
