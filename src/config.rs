//! Settings for the demos. Every default matches the constants of the
//! classic snippets, so the binaries simply use `DemoConfig::default()`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming an optional TOML config file.
pub const CONFIG_ENV: &str = "CHANSELECT_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for field '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// When the selector loop evaluates the value it offers to the producer
/// channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Evaluation {
    /// Before every select, whether or not the send is chosen.
    #[default]
    Eager,
    /// Only when the send case commits.
    Lazy,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub iterations: usize,
    pub read_capacity: usize,
    pub preload: Vec<i32>,
    pub evaluated: i32,
    pub evaluation: Evaluation,
    /// Spawn a task that drains the producer channel, so both cases race.
    pub with_reader: bool,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            iterations: 3,
            read_capacity: 100,
            preload: vec![1, 2, 3],
            evaluated: 42,
            evaluation: Evaluation::Eager,
            with_reader: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RendezvousConfig {
    pub count: i32,
}

impl Default for RendezvousConfig {
    fn default() -> Self {
        Self { count: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FibonacciConfig {
    pub count: usize,
    pub capacity: usize,
}

impl Default for FibonacciConfig {
    fn default() -> Self {
        Self {
            count: 10,
            capacity: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    pub ticks: usize,
    pub tick_ms: u64,
    pub timeout_ms: u64,
}

impl TimerConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            ticks: 10,
            tick_ms: 100,
            timeout_ms: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Upper bound on any single wait before a demo reports a stall.
    pub stall_ms: u64,
    pub selector: SelectorConfig,
    pub rendezvous: RendezvousConfig,
    pub fibonacci: FibonacciConfig,
    pub timer: TimerConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            stall_ms: 5_000,
            selector: SelectorConfig::default(),
            rendezvous: RendezvousConfig::default(),
            fibonacci: FibonacciConfig::default(),
            timer: TimerConfig::default(),
        }
    }
}

impl DemoConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: DemoConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Loads `path` if given, otherwise validates the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_path(path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Reads the file named by `CHANSELECT_CONFIG`, falling back to the
    /// defaults when the variable is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = env::var_os(CONFIG_ENV).map(PathBuf::from);
        Self::load(path.as_deref())
    }

    pub fn stall(&self) -> Duration {
        Duration::from_millis(self.stall_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let selector = &self.selector;
        if selector.preload.len() > selector.read_capacity {
            return Err(ConfigError::invalid(
                "selector.preload",
                format!(
                    "{} values do not fit a channel of capacity {}",
                    selector.preload.len(),
                    selector.read_capacity
                ),
            ));
        }
        if !selector.with_reader && selector.iterations > selector.preload.len() {
            // with no reader on the producer channel the loop would block forever
            return Err(ConfigError::invalid(
                "selector.iterations",
                format!(
                    "{} iterations but only {} preloaded values",
                    selector.iterations,
                    selector.preload.len()
                ),
            ));
        }
        if self.rendezvous.count < 0 {
            return Err(ConfigError::invalid("rendezvous.count", "must not be negative"));
        }
        if self.fibonacci.count > 94 {
            return Err(ConfigError::invalid(
                "fibonacci.count",
                "the 95th term overflows u64",
            ));
        }
        if self.stall_ms == 0 {
            return Err(ConfigError::invalid("stall_ms", "must be positive"));
        }
        Ok(())
    }
}
