//! Agent configuration: defaults, builder-style setters, and the
//! `key:value` per-agent config-file format.
//!
//! A missing or malformed file never fails agent construction; offending
//! lines are reported as warnings and the defaults stay in place.

use std::io::BufRead;
use std::path::Path;

use crate::error::Result;

/// Tunables for one HyperPlayer instance.
///
/// # Examples
///
/// ```
/// use hyperplay::agent::AgentConfig;
///
/// let config = AgentConfig::default()
///     .with_num_hyper_games(8)
///     .with_backtracking_depth(2)
///     .with_should_branch(true);
/// assert_eq!(config.num_hyper_games, 8);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Population cap.
    pub num_hyper_games: usize,
    /// Clones forwarded per surviving model per turn (minus the original).
    pub num_hyper_branches: usize,
    /// Upper bound on evaluator depths.
    pub max_num_probes: usize,
    /// Rollouts per candidate joint move when expanding a likelihood node.
    pub num_op_probes: usize,
    /// How far a model may recede below the current step before it is
    /// retired.
    pub backtracking_depth: usize,
    /// Exponent applied to posterior weights in the evaluator.
    pub likelihood_power_factor: f64,
    /// Enable clone-branching after each model's first update.
    pub should_branch: bool,
    /// The state-update phase gets `play_clock / inv_playtime_factor`.
    pub inv_playtime_factor: u32,
    /// Whether zero-posterior hypergames still feed evaluator rollouts.
    pub include_zero_posterior: bool,
    /// Model the opponent as uniform instead of rollout-derived: likelihood
    /// expansion assigns every candidate the same value and runs no probes.
    pub uniform_opponent: bool,
    /// Apply the state-variance diversity filter when the population
    /// exceeds the cap; when off, the overflow is truncated in insertion
    /// order instead.
    pub use_variance_filter: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            num_hyper_games: 16,
            num_hyper_branches: 16,
            max_num_probes: 16,
            num_op_probes: 8,
            backtracking_depth: 1,
            likelihood_power_factor: 1.0,
            should_branch: false,
            inv_playtime_factor: 10,
            include_zero_posterior: false,
            uniform_opponent: false,
            use_variance_filter: true,
        }
    }
}

impl AgentConfig {
    pub fn with_num_hyper_games(mut self, value: usize) -> Self {
        self.num_hyper_games = value;
        self
    }

    pub fn with_num_hyper_branches(mut self, value: usize) -> Self {
        self.num_hyper_branches = value;
        self
    }

    pub fn with_max_num_probes(mut self, value: usize) -> Self {
        self.max_num_probes = value;
        self
    }

    pub fn with_num_op_probes(mut self, value: usize) -> Self {
        self.num_op_probes = value;
        self
    }

    pub fn with_backtracking_depth(mut self, value: usize) -> Self {
        self.backtracking_depth = value;
        self
    }

    pub fn with_likelihood_power_factor(mut self, value: f64) -> Self {
        self.likelihood_power_factor = value;
        self
    }

    pub fn with_should_branch(mut self, value: bool) -> Self {
        self.should_branch = value;
        self
    }

    pub fn with_inv_playtime_factor(mut self, value: u32) -> Self {
        self.inv_playtime_factor = value;
        self
    }

    pub fn with_include_zero_posterior(mut self, value: bool) -> Self {
        self.include_zero_posterior = value;
        self
    }

    pub fn with_uniform_opponent(mut self, value: bool) -> Self {
        self.uniform_opponent = value;
        self
    }

    pub fn with_use_variance_filter(mut self, value: bool) -> Self {
        self.use_variance_filter = value;
        self
    }

    /// Parse `key:value` lines. Blank lines and `#` comments are skipped;
    /// unknown keys and unparsable values are reported as warnings while
    /// the corresponding defaults stay in place.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<(Self, Vec<String>)> {
        let mut config = AgentConfig::default();
        let mut warnings = Vec::new();

        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some((key, value)) = trimmed.split_once(':') else {
                warnings.push(format!("line {}: expected key:value, got '{trimmed}'", number + 1));
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            if let Err(message) = config.apply(key, value) {
                warnings.push(format!("line {}: {message}", number + 1));
            }
        }

        Ok((config, warnings))
    }

    /// Read a config file.
    ///
    /// # Errors
    ///
    /// Only I/O failures surface as errors; content problems come back as
    /// warnings next to the (partially applied) configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<(Self, Vec<String>)> {
        let file = std::fs::File::open(path.as_ref()).map_err(|source| crate::Error::Io {
            operation: format!("open config file {}", path.as_ref().display()),
            source,
        })?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Read a config file, retaining defaults on any failure. Warnings and
    /// a missing file are reported on stderr.
    pub fn load(path: impl AsRef<Path>) -> Self {
        match Self::from_file(path.as_ref()) {
            Ok((config, warnings)) => {
                for warning in warnings {
                    eprintln!("config {}: {warning}", path.as_ref().display());
                }
                config
            }
            Err(err) => {
                eprintln!("config {}: {err}; using defaults", path.as_ref().display());
                AgentConfig::default()
            }
        }
    }

    fn apply(&mut self, key: &str, value: &str) -> std::result::Result<(), String> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> std::result::Result<T, String> {
            value
                .parse()
                .map_err(|_| format!("invalid value '{value}' for {key}"))
        }

        match key {
            "numHyperGames" => self.num_hyper_games = parse(key, value)?,
            "numHyperBranches" => self.num_hyper_branches = parse(key, value)?,
            "maxNumProbes" => self.max_num_probes = parse(key, value)?,
            "numOPProbes" => self.num_op_probes = parse(key, value)?,
            "backtrackingDepth" => self.backtracking_depth = parse(key, value)?,
            "likelihoodPowerFactor" => self.likelihood_power_factor = parse(key, value)?,
            "shouldBranch" => self.should_branch = parse(key, value)?,
            "invPlaytimeFactor" => self.inv_playtime_factor = parse(key, value)?,
            "includeZeroPosterior" => self.include_zero_posterior = parse(key, value)?,
            "uniformOpponent" => self.uniform_opponent = parse(key, value)?,
            "useVarianceFilter" => self.use_variance_filter = parse(key, value)?,
            other => return Err(format!("unknown key '{other}'")),
        }
        Ok(())
    }
}
