//! Per-run output files: milestone log, policy checkpoint and trend plot

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use uuid::Uuid;

use dqn_core::{DqnError, Result};

use crate::network::QNetwork;

/// Timestamp format used at the start of every log line
pub const DATE_FORMAT: &str = "%m-%d %H:%M:%S";

/// Paths of the files belonging to one hyperparameter set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArtifacts {
    /// Milestone text log
    pub log_file: PathBuf,
    /// Bincode checkpoint of the policy network
    pub model_file: PathBuf,
    /// Reward/epsilon trend plot
    pub graph_file: PathBuf,
    run_id: Uuid,
}

/// Saved policy network plus the context it was saved in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyCheckpoint {
    /// Run that produced the checkpoint
    pub run_id: Uuid,
    /// Episode whose reward triggered the save
    pub episode: usize,
    /// That episode's reward
    pub reward: f64,
    /// Save time
    pub created_at: DateTime<Utc>,
    /// Policy parameters
    pub network: QNetwork,
}

impl RunArtifacts {
    /// `<runs_dir>/<set>.log`, `<runs_dir>/<set>.bin` and `<runs_dir>/<set>.png`
    pub fn new(runs_dir: impl AsRef<Path>, set_name: &str) -> Self {
        let dir = runs_dir.as_ref();
        Self {
            log_file: dir.join(format!("{set_name}.log")),
            model_file: dir.join(format!("{set_name}.bin")),
            graph_file: dir.join(format!("{set_name}.png")),
            run_id: Uuid::new_v4(),
        }
    }

    /// Identifier stamped into the log and every checkpoint of this run
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    async fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    fn stamp(message: &str) -> String {
        format!("{}: {message}\n", Local::now().format(DATE_FORMAT))
    }

    /// Truncate the log and write the opening line
    pub async fn start_log(&self) -> Result<()> {
        Self::ensure_parent(&self.log_file).await?;
        let line = Self::stamp(&format!("Training starting... (run {})", self.run_id));
        fs::write(&self.log_file, line).await?;
        debug!(path = %self.log_file.display(), "milestone log truncated");
        Ok(())
    }

    /// Append one timestamped line
    pub async fn append_log(&self, message: &str) -> Result<()> {
        Self::ensure_parent(&self.log_file).await?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .await?;
        file.write_all(Self::stamp(message).as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Overwrite the checkpoint with `network`
    pub async fn save_checkpoint(&self, network: &QNetwork, episode: usize, reward: f64) -> Result<()> {
        let checkpoint = PolicyCheckpoint {
            run_id: self.run_id,
            episode,
            reward,
            created_at: Utc::now(),
            network: network.clone(),
        };
        let bytes = bincode::serialize(&checkpoint).map_err(|e| DqnError::Checkpoint(e.to_string()))?;

        Self::ensure_parent(&self.model_file).await?;
        fs::write(&self.model_file, bytes).await?;
        info!(path = %self.model_file.display(), episode, "checkpoint saved");
        Ok(())
    }

    /// Read the checkpoint back
    pub async fn load_checkpoint(&self) -> Result<PolicyCheckpoint> {
        let bytes = fs::read(&self.model_file).await.map_err(|e| {
            DqnError::Checkpoint(format!("cannot read {}: {e}", self.model_file.display()))
        })?;
        bincode::deserialize(&bytes).map_err(|e| DqnError::Checkpoint(e.to_string()))
    }
}
