//! Data models module
//!
//! - `config` - Configuration loading from file, environment and command line

pub mod config;

pub use config::{Cli, ServerConfiguration};
