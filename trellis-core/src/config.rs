//! Runtime configuration.
//!
//! A [`Config`] is fixed when a [`Runtime`](crate::reactive::Runtime) is
//! created. The defaults follow the build: development checks are on unless
//! the crate is compiled with the `production` feature.

use serde::{Deserialize, Serialize};

/// Default cap on flush passes before a flush is abandoned.
pub const DEFAULT_MAX_FLUSH_PASSES: usize = 100;

/// Configuration for a reactive runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Validate collection shapes, reject writes to computeds without a
    /// setter and reject per-key queries on collections.
    pub dev_checks: bool,

    /// Maximum number of passes over the reaction queue in one flush.
    ///
    /// Reactions that keep invalidating their own dependencies would
    /// otherwise never settle.
    pub max_flush_passes: usize,
}

impl Config {
    /// Enable or disable development checks.
    pub fn with_dev_checks(mut self, enabled: bool) -> Self {
        self.dev_checks = enabled;
        self
    }

    /// Set the flush pass limit. Zero is treated as one.
    pub fn with_max_flush_passes(mut self, passes: usize) -> Self {
        self.max_flush_passes = passes.max(1);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dev_checks: !cfg!(feature = "production"),
            max_flush_passes: DEFAULT_MAX_FLUSH_PASSES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_follows_build() {
        let config = Config::default();
        assert_eq!(config.dev_checks, !cfg!(feature = "production"));
        assert_eq!(config.max_flush_passes, DEFAULT_MAX_FLUSH_PASSES);
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: Config = serde_json::from_str(r#"{ "dev_checks": false }"#).unwrap();
        assert!(!config.dev_checks);
        assert_eq!(config.max_flush_passes, DEFAULT_MAX_FLUSH_PASSES);
    }

    #[test]
    fn pass_limit_is_at_least_one() {
        let config = Config::default().with_max_flush_passes(0);
        assert_eq!(config.max_flush_passes, 1);
    }
}
