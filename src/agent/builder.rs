//! Builder for HyperPlayer construction.

use rand::{SeedableRng, rngs::StdRng};

use super::HyperPlayer;
use super::config::AgentConfig;
use crate::adapters::NullTurnLog;
use crate::ports::observer::TurnObserver;
use crate::ports::rules::RulesEngine;

/// Fluent construction of a [`HyperPlayer`].
///
/// # Examples
///
/// ```
/// use hyperplay::agent::{AgentConfig, HyperPlayerBuilder};
/// use hyperplay::games::Doors;
///
/// let agent = HyperPlayerBuilder::new("hyperplay")
///     .seed(42)
///     .config(AgentConfig::default().with_num_hyper_games(8))
///     .build(Doors::new(3, 5));
/// assert_eq!(agent.config().num_hyper_games, 8);
/// ```
pub struct HyperPlayerBuilder {
    name: String,
    config: AgentConfig,
    seed: Option<u64>,
    observer: Option<Box<dyn TurnObserver>>,
}

impl HyperPlayerBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        HyperPlayerBuilder {
            name: name.into(),
            config: AgentConfig::default(),
            seed: None,
            observer: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the configuration from a `key:value` file, retaining defaults
    /// for anything missing or malformed.
    pub fn config_file(mut self, path: impl AsRef<std::path::Path>) -> Self {
        self.config = AgentConfig::load(path);
        self
    }

    /// Seed the agent's RNG for reproducible sampling and rollouts.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Attach a turn observer (CSV log, JSONL stream, test buffer).
    pub fn observer(mut self, observer: Box<dyn TurnObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build<E: RulesEngine>(self, engine: E) -> HyperPlayer<E> {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let observer = self.observer.unwrap_or_else(|| Box::new(NullTurnLog));
        HyperPlayer::from_parts(self.name, engine, self.config, rng, observer)
    }
}
