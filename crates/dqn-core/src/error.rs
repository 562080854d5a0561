//! Error types shared by every crate in the workspace

use std::time::Duration;

use thiserror::Error;

/// Core error type for DQN training and the remote environment protocol
#[derive(Error, Debug)]
pub enum DqnError {
    /// Environment-related errors (contract misuse, degenerate setup)
    #[error("Environment error: {0}")]
    Environment(String),

    /// The environment service never became reachable within the retry policy
    #[error("Service `{service}` unavailable after {attempts} attempt(s)")]
    ServiceUnavailable {
        /// Address or name of the service
        service: String,
        /// Number of connection attempts made
        attempts: u32,
    },

    /// A remote call did not complete in time
    #[error("Remote `{operation}` call timed out after {after:?}")]
    Timeout {
        /// Protocol operation name
        operation: &'static str,
        /// Configured request timeout
        after: Duration,
    },

    /// Transport-level failure (connection reset, closed stream, ...)
    #[error("Connection error: {0}")]
    Connection(String),

    /// The environment process answered with an error reply
    #[error("Remote environment error: {0}")]
    Remote(String),

    /// A response could not be decoded into the expected shape
    #[error("Malformed response to `{operation}`: {reason}")]
    MalformedResponse {
        /// Protocol operation name
        operation: &'static str,
        /// Decoder diagnostic
        reason: String,
    },

    /// A state vector did not have the length agreed on during setup
    #[error("Protocol mismatch: expected state of length {expected}, got {actual}")]
    ProtocolMismatch {
        /// `state_dim` from setup
        expected: usize,
        /// Length actually received
        actual: usize,
    },

    /// Invalid action
    #[error("Invalid action {action}: action space has {action_dim} actions")]
    InvalidAction {
        /// Offending action index
        action: usize,
        /// Size of the discrete action space
        action_dim: usize,
    },

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected size
        expected: usize,
        /// Actual size
        actual: usize,
    },

    /// More samples requested than the replay buffer holds
    #[error("Sample underflow: requested {requested} transitions, buffer holds {available}")]
    SampleUnderflow {
        /// Requested batch size
        requested: usize,
        /// Current occupancy
        available: usize,
    },

    /// Missing or invalid hyperparameter, unknown set, unreadable config
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Non-finite loss or gradient
    #[error("Numeric instability: {0}")]
    NumericInstability(String),

    /// Checkpoint could not be written or read back
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Trend plot rendering failed
    #[error("Plot error: {0}")]
    Plot(String),

    /// Operator interrupt observed
    #[error("Cancelled by shutdown signal")]
    Cancelled,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl DqnError {
    /// Whether this error came from the operator interrupting the run
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type alias for DQN operations
pub type Result<T> = std::result::Result<T, DqnError>;
