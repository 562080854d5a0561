// dqnctl: train, evaluate and host the cart-pole environment

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dqn_core::Shutdown;

mod commands;

#[derive(Parser)]
#[command(name = "dqnctl")]
#[command(about = "DQN trainer for remote environments", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a policy against a running environment server
    Train {
        /// Hyperparameter set name
        set: String,

        #[command(flatten)]
        run: RunArgs,

        /// Stop after this many episodes (default: run until Ctrl-C)
        #[arg(long)]
        episodes: Option<usize>,
    },

    /// Run the saved policy greedily, without learning
    Eval {
        /// Hyperparameter set name
        set: String,

        #[command(flatten)]
        run: RunArgs,

        /// Number of evaluation episodes
        #[arg(long, default_value = "10")]
        episodes: usize,
    },

    /// Host a cart-pole simulator over the environment protocol
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:7878")]
        bind: String,

        /// Steps after which every step reports truncation
        #[arg(long, default_value = "500")]
        max_steps: usize,

        /// Seed for episode start states
        #[arg(long)]
        seed: Option<u64>,
    },
}

/// Options shared by `train` and `eval`
#[derive(Args)]
struct RunArgs {
    /// Hyperparameter file
    #[arg(short, long, default_value = "hyperparameters.yml")]
    config: PathBuf,

    /// Environment server address
    #[arg(long, default_value = "127.0.0.1:7878")]
    env_addr: String,

    /// Directory for the log, checkpoint and plot
    #[arg(long, default_value = "runs")]
    runs_dir: PathBuf,

    /// Seed for initialisation, exploration and replay sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value = "5000")]
    request_timeout_ms: u64,

    /// Wait between connection attempts in milliseconds
    #[arg(long, default_value = "2000")]
    retry_interval_ms: u64,

    /// Connection attempts before giving up (0 waits forever)
    #[arg(long, default_value = "30")]
    max_attempts: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let (trigger, shutdown) = Shutdown::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            trigger.trigger();
        }
    });

    match cli.command {
        Commands::Train { set, run, episodes } => {
            commands::train(&set, &run, episodes, shutdown).await?;
        }

        Commands::Eval { set, run, episodes } => {
            commands::eval(&set, &run, episodes, shutdown).await?;
        }

        Commands::Serve {
            bind,
            max_steps,
            seed,
        } => {
            commands::serve(&bind, max_steps, seed, shutdown).await?;
        }
    }

    Ok(())
}
