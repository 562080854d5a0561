//! Full run against a cart-pole server on a loopback socket

use std::time::Duration;

use dqn_agent::{RunArtifacts, StopCause, Trainer, TrainerOptions};
use dqn_core::{Hyperparameters, Shutdown};
use dqn_env::{CartPole, ClientConfig, EnvironmentServer, RemoteEnvironment, RetryPolicy, TimeLimit};

#[tokio::test]
async fn test_training_against_cartpole_server() {
    let (_server_trigger, server_shutdown) = Shutdown::channel();
    let sim = TimeLimit::new(CartPole::new(Some(5)), 500);
    let server = EnvironmentServer::bind("127.0.0.1:0", sim, server_shutdown)
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.serve());

    let dir = tempfile::tempdir().unwrap();
    let artifacts = RunArtifacts::new(dir.path(), "cartpole");
    let env = RemoteEnvironment::new(
        ClientConfig {
            address: addr.to_string(),
            request_timeout_ms: 2_000,
            retry: RetryPolicy::attempts(5, Duration::from_millis(20)),
        },
        Shutdown::never(),
    );
    let params = Hyperparameters {
        replay_memory_size: 1_000,
        mini_batch_size: 16,
        network_sync_rate: 20,
        epsilon_decay: 0.9,
        stop_on_reward: 200.0,
        hidden_width: 16,
        ..Hyperparameters::default()
    };
    let options = TrainerOptions {
        artifacts: Some(artifacts.clone()),
        max_episodes: Some(5),
        seed: Some(3),
        ..TrainerOptions::default()
    };

    let mut trainer = Trainer::start(env, params, options, Shutdown::never())
        .await
        .unwrap();
    assert_eq!((trainer.dims().state_dim, trainer.dims().action_dim), (4, 2));

    let summary = trainer.run().await.unwrap();
    assert_eq!(summary.stop_cause, StopCause::EpisodeLimit);
    assert_eq!(summary.episodes, 5);
    assert_eq!(trainer.reward_history().len(), 5);
    assert!(trainer.reward_history().iter().all(|&r| r >= 1.0 && r <= 200.0));

    let stored: f64 = trainer.reward_history().iter().sum();
    #[allow(clippy::cast_precision_loss)]
    let buffered = trainer.buffer().len() as f64;
    assert_eq!(stored, buffered);

    assert!(artifacts.model_file.exists());
    assert!(artifacts.log_file.exists());
}
