//! Merge engine configuration.

use std::time::Duration;

use crate::error::MergeError;

pub const DEFAULT_MAX_BUFFER_SIZE: usize = 100;

const ENV_MAX_BUFFER_SIZE: &str = "LOGMERGE_MAX_BUFFER_SIZE";
const ENV_SOURCE_ERROR_POLICY: &str = "LOGMERGE_SOURCE_ERROR_POLICY";
const ENV_MONITOR_INTERVAL_MS: &str = "LOGMERGE_MONITOR_INTERVAL_MS";

/// What the driver does when a source fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceErrorPolicy {
    /// Record the error, retire the source, keep merging the rest.
    #[default]
    Continue,
    /// Stop the merge and return the error.
    Abort,
}

impl std::str::FromStr for SourceErrorPolicy {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(SourceErrorPolicy::Continue),
            "abort" => Ok(SourceErrorPolicy::Abort),
            other => Err(MergeError::Config(format!(
                "unknown source error policy '{other}', expected 'continue' or 'abort'"
            ))),
        }
    }
}

/// Configuration for the asynchronous merge.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Maximum number of fetch results buffered ahead of consumption, per source.
    pub max_buffer_size: usize,

    pub source_error_policy: SourceErrorPolicy,

    /// When set, buffer occupancy of every source is logged at this interval.
    pub monitor_interval: Option<Duration>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            source_error_policy: SourceErrorPolicy::default(),
            monitor_interval: None,
        }
    }
}

impl MergeConfig {
    pub fn with_max_buffer_size(mut self, max_buffer_size: usize) -> Self {
        self.max_buffer_size = max_buffer_size;
        self
    }

    pub fn with_source_error_policy(mut self, policy: SourceErrorPolicy) -> Self {
        self.source_error_policy = policy;
        self
    }

    pub fn with_monitor_interval(mut self, interval: Duration) -> Self {
        self.monitor_interval = Some(interval);
        self
    }

    pub fn validate(&self) -> Result<(), MergeError> {
        if self.max_buffer_size == 0 {
            return Err(MergeError::Config(
                "max_buffer_size must be at least 1".to_string(),
            ));
        }
        if self.monitor_interval == Some(Duration::ZERO) {
            return Err(MergeError::Config(
                "monitor_interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Reads overrides from `LOGMERGE_*` environment variables on top of the defaults.
    pub fn from_env() -> Result<Self, MergeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, MergeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = MergeConfig::default();

        if let Some(raw) = lookup(ENV_MAX_BUFFER_SIZE) {
            config.max_buffer_size = raw.trim().parse().map_err(|e| {
                MergeError::Config(format!("{ENV_MAX_BUFFER_SIZE}='{raw}': {e}"))
            })?;
        }
        if let Some(raw) = lookup(ENV_SOURCE_ERROR_POLICY) {
            config.source_error_policy = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_MONITOR_INTERVAL_MS) {
            let millis: u64 = raw.trim().parse().map_err(|e| {
                MergeError::Config(format!("{ENV_MONITOR_INTERVAL_MS}='{raw}': {e}"))
            })?;
            config.monitor_interval = Some(Duration::from_millis(millis));
        }

        config.validate()?;
        Ok(config)
    }
}
