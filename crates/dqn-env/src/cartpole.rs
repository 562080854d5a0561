//! Cart-pole balancing simulator

use rand::{rngs::StdRng, Rng, SeedableRng};

use dqn_core::{DiscreteAction, EnvironmentDims, StateVector, StepOutcome};

use crate::server::Simulator;

/// Physical constants and episode-ending thresholds
#[derive(Debug, Clone)]
pub struct CartPoleConfig {
    /// Gravitational acceleration
    pub gravity: f64,
    /// Cart mass
    pub mass_cart: f64,
    /// Pole mass
    pub mass_pole: f64,
    /// Half the pole length
    pub length: f64,
    /// Magnitude of the push applied by either action
    pub force_mag: f64,
    /// Integration step in seconds
    pub tau: f64,
    /// Cart position beyond which the episode terminates
    pub x_threshold: f64,
    /// Pole angle (radians) beyond which the episode terminates
    pub theta_threshold: f64,
}

impl Default for CartPoleConfig {
    fn default() -> Self {
        Self {
            gravity: 9.8,
            mass_cart: 1.0,
            mass_pole: 0.1,
            length: 0.5,
            force_mag: 10.0,
            tau: 0.02,
            x_threshold: 2.4,
            theta_threshold: 12.0_f64.to_radians(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct CartPoleState {
    x: f64,         // Cart position
    x_dot: f64,     // Cart velocity
    theta: f64,     // Pole angle
    theta_dot: f64, // Pole angular velocity
}

/// CartPole: push the cart left (0) or right (1) to keep the pole upright
///
/// State is `[x, x_dot, theta, theta_dot]`, reward is 1 for every step.
pub struct CartPole {
    config: CartPoleConfig,
    state: CartPoleState,
    rng: StdRng,
}

impl CartPole {
    /// Create a simulator with default physics
    #[must_use]
    pub fn new(seed: Option<u64>) -> Self {
        Self::with_config(CartPoleConfig::default(), seed)
    }

    /// Create a simulator with custom physics
    #[must_use]
    pub fn with_config(config: CartPoleConfig, seed: Option<u64>) -> Self {
        Self {
            config,
            state: CartPoleState::default(),
            rng: seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn observation(&self) -> StateVector {
        let s = self.state;
        StateVector::new(vec![s.x as f32, s.x_dot as f32, s.theta as f32, s.theta_dot as f32])
    }

    fn is_terminal(&self) -> bool {
        self.state.x.abs() > self.config.x_threshold || self.state.theta.abs() > self.config.theta_threshold
    }
}

impl Simulator for CartPole {
    fn dims(&self) -> EnvironmentDims {
        EnvironmentDims {
            state_dim: 4,
            action_dim: 2,
        }
    }

    fn reset(&mut self) -> StateVector {
        let mut sample = || self.rng.gen_range(-0.05..0.05);
        self.state = CartPoleState {
            x: sample(),
            x_dot: sample(),
            theta: sample(),
            theta_dot: sample(),
        };
        self.observation()
    }

    fn step(&mut self, action: DiscreteAction) -> StepOutcome {
        let c = &self.config;
        let force = if action.index() == 1 { c.force_mag } else { -c.force_mag };

        let (sin_theta, cos_theta) = self.state.theta.sin_cos();
        let total_mass = c.mass_cart + c.mass_pole;
        let pole_mass_length = c.mass_pole * c.length;

        let temp = (force + pole_mass_length * self.state.theta_dot.powi(2) * sin_theta) / total_mass;
        let theta_acc = (c.gravity * sin_theta - cos_theta * temp)
            / (c.length * (4.0 / 3.0 - c.mass_pole * cos_theta.powi(2) / total_mass));
        let x_acc = temp - pole_mass_length * theta_acc * cos_theta / total_mass;

        // Explicit Euler
        let tau = c.tau;
        self.state.x += tau * self.state.x_dot;
        self.state.x_dot += tau * x_acc;
        self.state.theta += tau * self.state.theta_dot;
        self.state.theta_dot += tau * theta_acc;

        StepOutcome {
            state: self.observation(),
            reward: 1.0,
            terminated: self.is_terminal(),
            truncated: false,
        }
    }
}
