//! Configuration management for the Chorus demo server
//!
//! Values come from an optional YAML file, `CHORUS_` environment variables and
//! command line flags, in increasing order of precedence. Nested keys use `__`
//! in variable names, e.g. `CHORUS_DEMO__NODES=5`.

use clap::Parser;
use config::{Config, ConfigError, Environment, File, Map, Source, Value};

use chorus_core::{Configuration, SurveyConfig};

/// Default number of nodes in the demo cluster
pub const DEFAULT_DEMO_NODES: usize = 3;

/// Default log level when neither config nor `RUST_LOG` sets one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default configuration file, loaded only when present
pub const DEFAULT_CONFIG_FILE: &str = "conf/application.yml";

/// Command line arguments for the server
#[derive(Debug, Default, Parser)]
#[command(name = "chorus-server", about = "Run an in-process Chorus survey cluster")]
pub struct Cli {
    /// Number of cluster nodes to start
    #[arg(short = 'n', long = "nodes")]
    pub nodes: Option<usize>,
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
    #[arg(short = 'c', long = "config", env = "CHORUS_CONFIG_FILE")]
    pub config_file: Option<String>,
}

/// `CHORUS_`-prefixed environment variables, nested under the `chorus` key
#[derive(Clone, Debug)]
struct ChorusEnvironment(Environment);

impl ChorusEnvironment {
    fn new() -> Self {
        Self(
            Environment::with_prefix("chorus")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
    }
}

impl Source for ChorusEnvironment {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> Result<Map<String, Value>, ConfigError> {
        Ok(self
            .0
            .collect()?
            .into_iter()
            .map(|(key, value)| (format!("chorus.{}", key), value))
            .collect())
    }
}

/// Server configuration
/// Wraps the core configuration and adds the demo and logging settings
#[derive(Clone, Debug, Default)]
pub struct ServerConfiguration {
    core: Configuration,
}

impl ServerConfiguration {
    /// Load configuration using the process command line
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_cli(Cli::parse())
    }

    pub fn from_cli(args: Cli) -> Result<Self, ConfigError> {
        let config_file = args
            .config_file
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let mut config_builder = Config::builder()
            .add_source(File::with_name(&config_file).required(false))
            .add_source(ChorusEnvironment::new());

        if let Some(v) = args.nodes {
            config_builder = config_builder.set_override("chorus.demo.nodes", v as i64)?;
        }
        if let Some(v) = args.log_level {
            config_builder = config_builder.set_override("chorus.log.level", v)?;
        }

        Ok(Self::from_config(config_builder.build()?))
    }

    pub fn from_config(config: Config) -> Self {
        Self {
            core: Configuration::from_config(config),
        }
    }

    pub fn core(&self) -> &Configuration {
        &self.core
    }

    pub fn survey_config(&self) -> SurveyConfig {
        SurveyConfig::from_configuration(&self.core)
    }

    /// Number of demo nodes, at least one
    pub fn demo_nodes(&self) -> usize {
        self.core
            .config
            .get_int("chorus.demo.nodes")
            .ok()
            .and_then(|v| usize::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_DEMO_NODES)
    }

    /// Node IDs for the demo cluster, derived from `chorus.node.id` when set
    pub fn node_ids(&self) -> Vec<String> {
        let base = self
            .core
            .config
            .get_string("chorus.node.id")
            .ok()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| "node".to_string());
        (0..self.demo_nodes())
            .map(|i| format!("{}-{}", base, i))
            .collect()
    }

    pub fn log_level(&self) -> String {
        self.core
            .config
            .get_string("chorus.log.level")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
    }
}
