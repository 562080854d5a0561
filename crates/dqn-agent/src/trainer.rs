//! Epsilon-greedy training loop driving a (usually remote) environment
//!
//! One [`Trainer`] owns everything a run needs: the environment handle, both
//! networks, the replay buffer, the RNG and the output sinks. Episodes follow
//! `Reset -> Step* -> end-of-episode bookkeeping -> Reset acknowledgement`.

use std::future::Future;
use std::time::{Duration, Instant};

use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, info, warn};

use dqn_core::{
    CheckedEnvironment, DqnError, Environment, EnvironmentDims, EpisodeResult, Hyperparameters,
    ResetReason, Result, Shutdown, StepOutcome, Transition,
};

use crate::artifacts::RunArtifacts;
use crate::buffer::ReplayBuffer;
use crate::dqn::DqnLearner;
use crate::exploration::EpsilonGreedy;
use crate::network::QNetwork;

/// Knobs that are not hyperparameters
#[derive(Debug, Clone)]
pub struct TrainerOptions {
    /// Where the log, checkpoint and plot go. Evaluation needs it to find the checkpoint.
    pub artifacts: Option<RunArtifacts>,
    /// Stop after this many episodes
    pub max_episodes: Option<usize>,
    /// Seed for initialisation, exploration and sampling
    pub seed: Option<u64>,
    /// Minimum time between trend plot refreshes
    pub graph_interval: Duration,
}

impl Default for TrainerOptions {
    fn default() -> Self {
        Self {
            artifacts: None,
            max_episodes: None,
            seed: None,
            graph_interval: Duration::from_secs(10),
        }
    }
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    /// Shutdown signal observed
    Cancelled,
    /// `max_episodes` reached
    EpisodeLimit,
}

/// Outcome of [`Trainer::run`]
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    /// Episodes fully completed, acknowledgement included
    pub episodes: usize,
    /// Highest episode reward seen
    pub best_reward: Option<f64>,
    /// Exploration rate at the end of the run
    pub final_epsilon: f64,
    /// Why the run ended
    pub stop_cause: StopCause,
}

/// DQN run context
pub struct Trainer<E> {
    env: CheckedEnvironment<E>,
    params: Hyperparameters,
    options: TrainerOptions,
    shutdown: Shutdown,
    dims: EnvironmentDims,
    rng: StdRng,
    learner: DqnLearner,
    exploration: EpsilonGreedy,
    buffer: ReplayBuffer<Transition>,
    step_count: usize,
    episodes: usize,
    best_reward: Option<f64>,
    reward_history: Vec<f64>,
    epsilon_history: Vec<f64>,
    last_graph: Instant,
}

/// Race `fut` against the shutdown signal
async fn or_cancel<T>(shutdown: &mut Shutdown, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::select! {
        biased;
        () = shutdown.triggered() => Err(DqnError::Cancelled),
        result = fut => result,
    }
}

impl<E: Environment> Trainer<E> {
    /// Validate the hyperparameters, run setup and build both networks
    ///
    /// In evaluation mode the policy comes from the checkpoint instead and
    /// must have been trained for the same dimensions.
    pub async fn start(
        env: E,
        params: Hyperparameters,
        options: TrainerOptions,
        mut shutdown: Shutdown,
    ) -> Result<Self> {
        params.validate()?;

        let checkpoint = if params.is_training {
            None
        } else {
            let artifacts = options.artifacts.as_ref().ok_or_else(|| {
                DqnError::Configuration("evaluation needs a runs directory to load the model from".into())
            })?;
            Some(artifacts.load_checkpoint().await?)
        };

        let mut env = CheckedEnvironment::new(env);
        let dims = or_cancel(&mut shutdown, env.setup()).await?;
        info!(%dims, "environment setup complete");

        let mut rng = options
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

        let policy = match checkpoint {
            Some(checkpoint) => {
                if checkpoint.network.dims() != dims {
                    return Err(DqnError::Configuration(format!(
                        "checkpoint was trained for {}, environment reports {dims}",
                        checkpoint.network.dims()
                    )));
                }
                info!(
                    episode = checkpoint.episode,
                    reward = checkpoint.reward,
                    "loaded policy checkpoint"
                );
                checkpoint.network
            }
            None => QNetwork::new(dims, params.hidden_width, &mut rng),
        };

        if params.is_training {
            if let Some(artifacts) = &options.artifacts {
                artifacts.start_log().await?;
            }
            info!("Training starting...");
        }

        Ok(Self {
            learner: DqnLearner::new(policy, params.learning_rate, params.discount_factor),
            exploration: EpsilonGreedy::new(params.epsilon_init, params.epsilon_decay, params.epsilon_min),
            buffer: ReplayBuffer::new(params.replay_memory_size),
            env,
            params,
            options,
            shutdown,
            dims,
            rng,
            step_count: 0,
            episodes: 0,
            best_reward: None,
            reward_history: Vec::new(),
            epsilon_history: Vec::new(),
            last_graph: Instant::now(),
        })
    }

    /// Run episodes until cancelled or the episode limit is hit
    pub async fn run(&mut self) -> Result<TrainingSummary> {
        let stop_cause = loop {
            if self.options.max_episodes.is_some_and(|limit| self.episodes >= limit) {
                break StopCause::EpisodeLimit;
            }
            match self.episode().await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => break StopCause::Cancelled,
                Err(e) => return Err(e),
            }
        };

        let summary = TrainingSummary {
            episodes: self.episodes,
            best_reward: self.best_reward,
            final_epsilon: self.exploration.epsilon(),
            stop_cause,
        };
        info!(
            episodes = summary.episodes,
            best_reward = ?summary.best_reward,
            epsilon = summary.final_epsilon,
            cause = ?summary.stop_cause,
            "run finished"
        );
        Ok(summary)
    }

    async fn episode(&mut self) -> Result<()> {
        let result = self.run_episode().await?;
        self.finish_episode(result).await
    }

    /// Play one episode: reset, then act until termination or the reward cap
    async fn run_episode(&mut self) -> Result<EpisodeResult> {
        let episode = self.episodes;
        let training = self.params.is_training;
        let space = self.dims.action_space();

        let mut state = or_cancel(&mut self.shutdown, self.env.reset(ResetReason::EpisodeStart { episode }))
            .await?
            .state;
        let mut result = EpisodeResult::begin(episode);

        // Truncation is recorded but does not end the episode.
        while !result.terminated && result.total_reward < self.params.stop_on_reward {
            self.shutdown.check()?;

            let action =
                self.exploration
                    .select(self.learner.policy(), &state, space, &mut self.rng, training)?;
            let StepOutcome {
                state: next_state,
                reward,
                terminated,
                truncated,
            } = or_cancel(&mut self.shutdown, self.env.step(action)).await?;

            result.record_step(reward, terminated, truncated);
            if truncated {
                debug!(episode, step = result.steps, "environment reported truncation");
            }

            let previous = std::mem::replace(&mut state, next_state);
            if training {
                self.buffer.push(Transition {
                    state: previous,
                    action,
                    next_state: state.clone(),
                    reward,
                    terminated,
                    truncated,
                });
                self.step_count += 1;
            }
        }

        result.stopped_on_reward = result.total_reward >= self.params.stop_on_reward;
        Ok(result)
    }

    /// End-of-episode bookkeeping followed by the reset acknowledgement
    async fn finish_episode(&mut self, result: EpisodeResult) -> Result<()> {
        self.reward_history.push(result.total_reward);
        debug!(
            episode = result.episode,
            reward = result.total_reward,
            steps = result.steps,
            epsilon = self.exploration.epsilon(),
            truncated = result.truncated_seen,
            "episode finished"
        );

        if self.params.is_training {
            self.record_milestone(&result).await?;

            if self.last_graph.elapsed() >= self.options.graph_interval {
                self.save_graph()?;
                self.last_graph = Instant::now();
            }

            if self.buffer.len() > self.params.mini_batch_size {
                let batch = self.buffer.sample(self.params.mini_batch_size, &mut self.rng)?;
                let loss = self.learner.optimize(&batch)?;
                let epsilon = self.exploration.decay();
                self.epsilon_history.push(epsilon);
                debug!(loss, epsilon, "policy updated");

                if self.step_count > self.params.network_sync_rate {
                    self.learner.sync_target()?;
                    self.step_count = 0;
                }
            }
        }

        let episode = result.episode;
        let ack = or_cancel(&mut self.shutdown, self.env.reset(ResetReason::EpisodeEnd(result))).await?;
        if ack.acknowledged {
            info!(episode, "Environment Reset Request acknowledged");
        } else {
            warn!(episode, "Environment Reset Request was not acknowledged");
        }

        self.episodes += 1;
        Ok(())
    }

    async fn record_milestone(&mut self, result: &EpisodeResult) -> Result<()> {
        let reward = result.total_reward;
        if self.best_reward.is_some_and(|best| reward <= best) {
            return Ok(());
        }

        let message = match self.best_reward {
            Some(best) if best != 0.0 => format!(
                "New best reward {reward:.1} ({:+.1}%) at episode {}, saving model...",
                (reward - best) / best.abs() * 100.0,
                result.episode
            ),
            _ => format!("New best reward {reward:.1} at episode {}, saving model...", result.episode),
        };
        info!("{message}");

        if let Some(artifacts) = &self.options.artifacts {
            artifacts.append_log(&message).await?;
            artifacts
                .save_checkpoint(self.learner.policy(), result.episode, reward)
                .await?;
        }
        self.best_reward = Some(reward);
        Ok(())
    }

    #[cfg(feature = "visualization")]
    fn save_graph(&self) -> Result<()> {
        if let Some(artifacts) = &self.options.artifacts {
            crate::plot::render_trend(&artifacts.graph_file, &self.reward_history, &self.epsilon_history)?;
        }
        Ok(())
    }

    #[cfg(not(feature = "visualization"))]
    #[allow(clippy::unnecessary_wraps)]
    fn save_graph(&self) -> Result<()> {
        let means = crate::plot::rolling_mean(&self.reward_history, crate::plot::ROLLING_WINDOW);
        debug!(
            mean_reward = means.last().copied(),
            epsilon = self.epsilon_history.last().copied(),
            "trend plot disabled; reporting latest values"
        );
        Ok(())
    }

    /// Dimensions reported by setup
    #[must_use]
    pub fn dims(&self) -> EnvironmentDims {
        self.dims
    }

    /// The hyperparameters this run uses
    #[must_use]
    pub fn params(&self) -> &Hyperparameters {
        &self.params
    }

    /// Learner holding the policy and target networks
    #[must_use]
    pub fn learner(&self) -> &DqnLearner {
        &self.learner
    }

    /// Replay buffer contents
    #[must_use]
    pub fn buffer(&self) -> &ReplayBuffer<Transition> {
        &self.buffer
    }

    /// Current exploration rate
    #[must_use]
    pub fn epsilon(&self) -> f64 {
        self.exploration.epsilon()
    }

    /// Steps since the last target sync
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Reward of every completed episode, in order
    #[must_use]
    pub fn reward_history(&self) -> &[f64] {
        &self.reward_history
    }

    /// Epsilon after every decay
    #[must_use]
    pub fn epsilon_history(&self) -> &[f64] {
        &self.epsilon_history
    }

    /// Inner environment
    pub fn env(&self) -> &E {
        &self.env.env
    }
}
