// Subcommand implementations for dqnctl

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use dqn_agent::{RunArtifacts, Trainer, TrainerOptions, TrainingSummary};
use dqn_core::{HyperparameterSets, Hyperparameters, Shutdown};
use dqn_env::{CartPole, ClientConfig, EnvironmentServer, RemoteEnvironment, RetryPolicy, TimeLimit};

use crate::RunArgs;

fn load_set(run: &RunArgs, set: &str) -> Result<Hyperparameters> {
    let sets = HyperparameterSets::from_path(&run.config)
        .with_context(|| format!("Failed to load hyperparameters from {}", run.config.display()))?;
    sets.get(set)
        .with_context(|| format!("Hyperparameter set `{set}` is unusable"))
}

fn client_config(run: &RunArgs) -> ClientConfig {
    let wait = Duration::from_millis(run.retry_interval_ms);
    let retry = if run.max_attempts == 0 {
        RetryPolicy::unbounded(wait)
    } else {
        RetryPolicy::attempts(run.max_attempts, wait)
    };
    ClientConfig {
        address: run.env_addr.clone(),
        request_timeout_ms: run.request_timeout_ms,
        retry,
    }
}

async fn drive(
    params: Hyperparameters,
    run: &RunArgs,
    set: &str,
    max_episodes: Option<usize>,
    shutdown: Shutdown,
) -> Result<TrainingSummary> {
    let env = RemoteEnvironment::new(client_config(run), shutdown.clone());
    let options = TrainerOptions {
        artifacts: Some(RunArtifacts::new(&run.runs_dir, set)),
        max_episodes,
        seed: run.seed,
        ..TrainerOptions::default()
    };

    let mut trainer = Trainer::start(env, params, options, shutdown)
        .await
        .context("Failed to start the run")?;
    let summary = trainer.run().await.context("Run aborted")?;
    Ok(summary)
}

pub async fn train(set: &str, run: &RunArgs, episodes: Option<usize>, shutdown: Shutdown) -> Result<()> {
    let params = Hyperparameters {
        is_training: true,
        ..load_set(run, set)?
    };
    info!(set, env = %run.env_addr, runs_dir = %run.runs_dir.display(), "starting training");

    let summary = drive(params, run, set, episodes, shutdown).await?;
    match summary.best_reward {
        Some(best) => info!(
            episodes = summary.episodes,
            best_reward = best,
            epsilon = summary.final_epsilon,
            "training stopped"
        ),
        None => info!(episodes = summary.episodes, "training stopped before any episode completed"),
    }
    Ok(())
}

pub async fn eval(set: &str, run: &RunArgs, episodes: usize, shutdown: Shutdown) -> Result<()> {
    let params = Hyperparameters {
        is_training: false,
        ..load_set(run, set)?
    };
    info!(set, episodes, "evaluating saved policy");

    let summary = drive(params, run, set, Some(episodes), shutdown).await?;
    info!(episodes = summary.episodes, cause = ?summary.stop_cause, "evaluation finished");
    Ok(())
}

pub async fn serve(bind: &str, max_steps: usize, seed: Option<u64>, shutdown: Shutdown) -> Result<()> {
    let sim = TimeLimit::new(CartPole::new(seed), max_steps);
    let server = EnvironmentServer::bind(bind, sim, shutdown)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    server.serve().await.context("Environment server failed")?;
    Ok(())
}
