// Core configuration models
// Typed access to survey policy values: timeouts, node identity, reserved channel prefixes

use std::time::Duration;

use chorus_common::TESTDATA_CHANNEL_PREFIX;

/// Default timeout for re-validating leadership on the subscribe path
pub const DEFAULT_LEADER_CHECK_TIMEOUT_MS: u64 = 250;

/// Default timeout for a leader routed subscribe survey
pub const DEFAULT_SUBSCRIBE_TIMEOUT_MS: u64 = 500;

/// Default timeout for a cluster-wide managed channels survey
pub const DEFAULT_MANAGED_STREAMS_TIMEOUT_MS: u64 = 1000;

/// Application configuration wrapper
/// Provides access to configuration values for survey coordination
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: config::Config,
}

impl Configuration {
    /// Create a new configuration from a Config instance
    pub fn from_config(config: config::Config) -> Self {
        Self { config }
    }

    /// This node's cluster identity; a random one is generated when unset
    pub fn node_id(&self) -> String {
        self.config
            .get_string("chorus.node.id")
            .ok()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }

    // ===================== Survey Configuration =====================

    /// Leader re-check timeout in milliseconds (default: 250ms)
    pub fn leader_check_timeout_ms(&self) -> u64 {
        self.timeout_ms("chorus.survey.leader-check-timeout", DEFAULT_LEADER_CHECK_TIMEOUT_MS)
    }

    /// Leader routed subscribe timeout in milliseconds (default: 500ms)
    pub fn subscribe_timeout_ms(&self) -> u64 {
        self.timeout_ms("chorus.survey.subscribe-timeout", DEFAULT_SUBSCRIBE_TIMEOUT_MS)
    }

    /// Managed channels aggregation timeout in milliseconds (default: 1000ms)
    pub fn managed_streams_timeout_ms(&self) -> u64 {
        self.timeout_ms("chorus.survey.managed-streams-timeout", DEFAULT_MANAGED_STREAMS_TIMEOUT_MS)
    }

    /// Channel prefix whose rates are not summed across nodes
    pub fn testdata_prefix(&self) -> String {
        self.config
            .get_string("chorus.survey.testdata-prefix")
            .ok()
            .filter(|prefix| !prefix.is_empty())
            .unwrap_or_else(|| TESTDATA_CHANNEL_PREFIX.to_string())
    }

    /// Positive millisecond value for `key`; zero, negative or missing values use the default
    fn timeout_ms(&self, key: &str, default: u64) -> u64 {
        self.config
            .get_int(key)
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(default)
    }
}

/// Survey policy values
#[derive(Clone, Debug)]
pub struct SurveyConfig {
    pub leader_check_timeout: Duration,
    pub subscribe_timeout: Duration,
    pub managed_streams_timeout: Duration,
    /// Duplicates of channels under this prefix are dropped instead of summed
    pub testdata_prefix: String,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            leader_check_timeout: Duration::from_millis(DEFAULT_LEADER_CHECK_TIMEOUT_MS),
            subscribe_timeout: Duration::from_millis(DEFAULT_SUBSCRIBE_TIMEOUT_MS),
            managed_streams_timeout: Duration::from_millis(DEFAULT_MANAGED_STREAMS_TIMEOUT_MS),
            testdata_prefix: TESTDATA_CHANNEL_PREFIX.to_string(),
        }
    }
}

impl SurveyConfig {
    /// Create a SurveyConfig from application Configuration
    pub fn from_configuration(config: &Configuration) -> Self {
        Self {
            leader_check_timeout: Duration::from_millis(config.leader_check_timeout_ms()),
            subscribe_timeout: Duration::from_millis(config.subscribe_timeout_ms()),
            managed_streams_timeout: Duration::from_millis(config.managed_streams_timeout_ms()),
            testdata_prefix: config.testdata_prefix(),
        }
    }
}
