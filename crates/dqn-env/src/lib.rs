//! Remote environment transport for the DQN trainer
//!
//! This crate provides both ends of the environment protocol:
//! - Wire frames and the Setup/Reset/Step operations
//! - A generic request/response client with bounded connect retry
//! - [`RemoteEnvironment`], the client seen through the `Environment` trait
//! - An environment server hosting a cart-pole simulator

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cartpole;
pub mod client;
pub mod protocol;
pub mod remote;
pub mod retry;
pub mod server;
pub mod wrappers;

// Re-export the client side
pub use client::{ClientConfig, RemoteClient};
pub use remote::RemoteEnvironment;
pub use retry::RetryPolicy;

// Re-export the server side
pub use cartpole::{CartPole, CartPoleConfig};
pub use server::{EnvironmentServer, Simulator};
pub use wrappers::TimeLimit;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        CartPole, ClientConfig, EnvironmentServer, RemoteEnvironment, RetryPolicy, Simulator,
        TimeLimit,
    };
    pub use dqn_core::prelude::*;
}
