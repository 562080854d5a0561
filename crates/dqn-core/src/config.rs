//! Hyperparameter sets loaded once at startup

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{DqnError, Result};

/// Training hyperparameters, immutable for the duration of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// Train (explore, store, optimize) or evaluate a saved policy
    pub is_training: bool,
    /// Adam step size
    #[serde(alias = "learning_rate_a")]
    pub learning_rate: f64,
    /// Discount factor gamma
    #[serde(alias = "discount_factor_g")]
    pub discount_factor: f64,
    /// Steps between target network refreshes
    pub network_sync_rate: usize,
    /// Replay buffer capacity
    pub replay_memory_size: usize,
    /// Transitions per optimizer step
    pub mini_batch_size: usize,
    /// Starting exploration rate
    pub epsilon_init: f64,
    /// Multiplicative decay applied after each optimizer step
    pub epsilon_decay: f64,
    /// Exploration floor
    pub epsilon_min: f64,
    /// Episode reward at which an episode is cut short
    pub stop_on_reward: f64,
    /// Width of the single hidden layer
    #[serde(alias = "fc1_nodes")]
    pub hidden_width: usize,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            is_training: true,
            learning_rate: 1e-3,
            discount_factor: 0.99,
            network_sync_rate: 10,
            replay_memory_size: 100_000,
            mini_batch_size: 32,
            epsilon_init: 1.0,
            epsilon_decay: 0.9995,
            epsilon_min: 0.05,
            stop_on_reward: 100_000.0,
            hidden_width: 10,
        }
    }
}

impl Hyperparameters {
    /// Check every key for a usable value
    pub fn validate(&self) -> Result<()> {
        fn invalid(key: &str, reason: &str) -> DqnError {
            DqnError::Configuration(format!("`{key}` {reason}"))
        }

        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(invalid("learning_rate", "must be a positive finite number"));
        }
        if !(0.0..=1.0).contains(&self.discount_factor) {
            return Err(invalid("discount_factor", "must lie in [0, 1]"));
        }
        if self.replay_memory_size == 0 {
            return Err(invalid("replay_memory_size", "must be at least 1"));
        }
        if self.mini_batch_size == 0 {
            return Err(invalid("mini_batch_size", "must be at least 1"));
        }
        if self.mini_batch_size >= self.replay_memory_size {
            return Err(invalid(
                "mini_batch_size",
                "must be smaller than replay_memory_size or no optimizer step can ever run",
            ));
        }
        if !(0.0..=1.0).contains(&self.epsilon_init) {
            return Err(invalid("epsilon_init", "must lie in [0, 1]"));
        }
        if !(self.epsilon_decay > 0.0 && self.epsilon_decay <= 1.0) {
            return Err(invalid("epsilon_decay", "must lie in (0, 1]"));
        }
        if !(0.0..=self.epsilon_init).contains(&self.epsilon_min) {
            return Err(invalid("epsilon_min", "must lie in [0, epsilon_init]"));
        }
        if self.stop_on_reward.is_nan() {
            return Err(invalid("stop_on_reward", "must be a number"));
        }
        if self.hidden_width == 0 {
            return Err(invalid("hidden_width", "must be at least 1"));
        }
        Ok(())
    }
}

/// Named hyperparameter sets as stored in `hyperparameters.yml`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct HyperparameterSets {
    sets: BTreeMap<String, Hyperparameters>,
}

impl HyperparameterSets {
    /// Parse all sets from YAML text
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| DqnError::Configuration(e.to_string()))
    }

    /// Read and parse a YAML file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            DqnError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let sets = Self::from_yaml(&text)?;
        debug!(path = %path.display(), sets = sets.sets.len(), "loaded hyperparameter file");
        Ok(sets)
    }

    /// Look up and validate one set by name
    pub fn get(&self, name: &str) -> Result<Hyperparameters> {
        let params = self.sets.get(name).cloned().ok_or_else(|| {
            DqnError::Configuration(format!(
                "unknown hyperparameter set `{name}` (available: {})",
                self.names().join(", ")
            ))
        })?;
        params.validate()?;
        Ok(params)
    }

    /// Names of every set in the file
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.sets.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILE: &str = r"
cartpole1:
  env_id: CartPole-v1
  is_training: true
  learning_rate_a: 0.001
  discount_factor_g: 0.99
  network_sync_rate: 10
  replay_memory_size: 100000
  mini_batch_size: 32
  epsilon_init: 1
  epsilon_decay: 0.9995
  epsilon_min: 0.05
  stop_on_reward: 100000
  fc1_nodes: 10
evaluate:
  is_training: false
  learning_rate: 0.01
  discount_factor: 0.9
  network_sync_rate: 5
  replay_memory_size: 1000
  mini_batch_size: 16
  epsilon_init: 0.5
  epsilon_decay: 0.99
  epsilon_min: 0.01
  stop_on_reward: 500
  hidden_width: 64
";

    #[test]
    fn test_load_set_with_legacy_key_names() {
        let sets = HyperparameterSets::from_yaml(FILE).unwrap();
        let params = sets.get("cartpole1").unwrap();
        assert!(params.is_training);
        assert_eq!(params.learning_rate, 0.001);
        assert_eq!(params.discount_factor, 0.99);
        assert_eq!(params.hidden_width, 10);
        assert_eq!(params.epsilon_init, 1.0);
    }

    #[test]
    fn test_load_set_with_canonical_key_names() {
        let sets = HyperparameterSets::from_yaml(FILE).unwrap();
        let params = sets.get("evaluate").unwrap();
        assert!(!params.is_training);
        assert_eq!(params.hidden_width, 64);
        assert_eq!(sets.names(), vec!["cartpole1", "evaluate"]);
    }

    #[test]
    fn test_unknown_set_is_configuration_error() {
        let sets = HyperparameterSets::from_yaml(FILE).unwrap();
        let err = sets.get("flappybird1").unwrap_err();
        assert!(matches!(err, DqnError::Configuration(msg) if msg.contains("cartpole1")));
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let err = HyperparameterSets::from_yaml("broken:\n  is_training: true\n").unwrap_err();
        assert!(matches!(err, DqnError::Configuration(msg) if msg.contains("learning_rate")));
    }

    #[test]
    fn test_validate_rejects_each_bad_key() {
        let cases: Vec<(&str, Box<dyn Fn(&mut Hyperparameters)>)> = vec![
            ("learning_rate", Box::new(|p| p.learning_rate = 0.0)),
            ("discount_factor", Box::new(|p| p.discount_factor = 1.5)),
            ("replay_memory_size", Box::new(|p| p.replay_memory_size = 0)),
            ("mini_batch_size", Box::new(|p| p.mini_batch_size = 0)),
            ("mini_batch_size", Box::new(|p| p.mini_batch_size = p.replay_memory_size)),
            ("epsilon_init", Box::new(|p| p.epsilon_init = 1.2)),
            ("epsilon_decay", Box::new(|p| p.epsilon_decay = 0.0)),
            ("epsilon_min", Box::new(|p| p.epsilon_min = 2.0)),
            ("stop_on_reward", Box::new(|p| p.stop_on_reward = f64::NAN)),
            ("hidden_width", Box::new(|p| p.hidden_width = 0)),
        ];

        for (key, mutate) in cases {
            let mut params = Hyperparameters::default();
            mutate(&mut params);
            let err = params.validate().unwrap_err();
            assert!(
                matches!(&err, DqnError::Configuration(msg) if msg.contains(key)),
                "expected error about {key}, got {err}"
            );
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        Hyperparameters::default().validate().unwrap();
    }
}
