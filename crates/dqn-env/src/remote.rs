//! [`Environment`] backed by an environment server across the network

use async_trait::async_trait;
use tracing::{debug, info};

use dqn_core::{
    DiscreteAction, Environment, EnvironmentDims, ResetOutcome, ResetReason, Result, Shutdown,
    StepOutcome,
};

use crate::client::{ClientConfig, RemoteClient};
use crate::protocol::{Reset, ResetRequest, Setup, SetupRequest, Step, StepRequest};

/// Remote environment proxy
///
/// `setup` connects first, polling an unavailable server according to the
/// client's retry policy. `reset` and `step` reuse that connection.
pub struct RemoteEnvironment {
    client: RemoteClient,
    shutdown: Shutdown,
}

impl RemoteEnvironment {
    /// Create a proxy; nothing is contacted until `setup`
    #[must_use]
    pub fn new(config: ClientConfig, shutdown: Shutdown) -> Self {
        Self {
            client: RemoteClient::new(config),
            shutdown,
        }
    }

    /// Underlying protocol client
    #[must_use]
    pub fn client(&self) -> &RemoteClient {
        &self.client
    }
}

#[async_trait]
impl Environment for RemoteEnvironment {
    async fn setup(&mut self) -> Result<EnvironmentDims> {
        if !self.client.is_connected() {
            self.client.connect(&mut self.shutdown).await?;
        }
        let dims = self.client.call::<Setup>(&SetupRequest {}).await?;
        let dims = EnvironmentDims::new(dims.state_dim, dims.action_dim)?;
        info!(%dims, "received environment dimensions");
        Ok(dims)
    }

    async fn reset(&mut self, reason: ResetReason) -> Result<ResetOutcome> {
        let reason = reason.to_string();
        debug!(%reason, "requesting reset");
        self.client.call::<Reset>(&ResetRequest { reason }).await
    }

    async fn step(&mut self, action: DiscreteAction) -> Result<StepOutcome> {
        self.client.call::<Step>(&StepRequest { action }).await
    }
}
