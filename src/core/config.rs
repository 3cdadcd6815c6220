/*!
 * Runtime Configuration
 *
 * Defaults, then an optional JSON file named by `SPECRUN_CONFIG`,
 * then individual environment overrides.
 */

use super::errors::{ConfigError, ConfigResult};
use super::limits::{
    DEFAULT_PROCESSORS, DEFAULT_SOURCE_CONTEXT, DEFAULT_STEP_WARN_AFTER,
    DEFAULT_TERMINATE_TIMEOUT, MAX_PROCESSORS, MAX_SOURCE_CONTEXT,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENV_CONFIG_FILE: &str = "SPECRUN_CONFIG";
pub const ENV_PROCESSORS: &str = "SPECRUN_PROCESSORS";
pub const ENV_TERMINATE_TIMEOUT_MS: &str = "SPECRUN_TERMINATE_TIMEOUT_MS";
pub const ENV_SOURCE_CONTEXT: &str = "SPECRUN_SOURCE_CONTEXT";
pub const ENV_TRACE_JSON: &str = "SPECRUN_TRACE_JSON";

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Number of virtual processors, ids `0..processors`
    pub processors: u32,
    /// Bounded wait for threads to observe TERMINATE
    pub terminate_timeout_ms: u64,
    /// Steps running longer than this are logged as not yielding
    pub step_warn_after_ms: u64,
    /// Lines either side of the current line in a SOURCE listing
    pub source_context: usize,
    /// Emit JSON formatted logs
    pub trace_json: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            processors: DEFAULT_PROCESSORS,
            terminate_timeout_ms: DEFAULT_TERMINATE_TIMEOUT.as_millis() as u64,
            step_warn_after_ms: DEFAULT_STEP_WARN_AFTER.as_millis() as u64,
            source_context: DEFAULT_SOURCE_CONTEXT,
            trace_json: false,
        }
    }
}

impl RuntimeConfig {
    /// Load from the process environment
    pub fn from_env() -> ConfigResult<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup (tests pass a map here)
    pub fn load_with<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = match lookup(ENV_CONFIG_FILE) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = base.apply_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file; absent keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_overrides<F>(mut self, lookup: &F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_PROCESSORS) {
            self.processors = parse_number(ENV_PROCESSORS, &v)?;
        }
        if let Some(v) = lookup(ENV_TERMINATE_TIMEOUT_MS) {
            self.terminate_timeout_ms = parse_number(ENV_TERMINATE_TIMEOUT_MS, &v)?;
        }
        if let Some(v) = lookup(ENV_SOURCE_CONTEXT) {
            self.source_context = parse_number(ENV_SOURCE_CONTEXT, &v)?;
        }
        if let Some(v) = lookup(ENV_TRACE_JSON) {
            self.trace_json = v == "1" || v.eq_ignore_ascii_case("true");
        }
        Ok(self)
    }

    /// Reject configurations the scheduler cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.processors == 0 || self.processors > MAX_PROCESSORS {
            return Err(ConfigError::Invalid(format!(
                "processors must be between 1 and {}, got {}",
                MAX_PROCESSORS, self.processors
            )));
        }
        if self.terminate_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "terminate_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.step_warn_after_ms == 0 {
            return Err(ConfigError::Invalid(
                "step_warn_after_ms must be greater than zero".to_string(),
            ));
        }
        if self.source_context > MAX_SOURCE_CONTEXT {
            return Err(ConfigError::Invalid(format!(
                "source_context must be at most {}, got {}",
                MAX_SOURCE_CONTEXT, self.source_context
            )));
        }
        Ok(())
    }

    pub fn with_processors(mut self, processors: u32) -> Self {
        self.processors = processors;
        self
    }

    pub fn with_terminate_timeout(mut self, timeout: Duration) -> Self {
        self.terminate_timeout_ms = timeout.as_millis() as u64;
        self
    }

    #[inline]
    pub fn terminate_timeout(&self) -> Duration {
        Duration::from_millis(self.terminate_timeout_ms)
    }

    #[inline]
    pub fn step_warn_after(&self) -> Duration {
        Duration::from_millis(self.step_warn_after_ms)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} must be a number, got '{}'", key, value)))
}
