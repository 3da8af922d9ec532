// Chorus server library
// Demo cluster wiring, configuration and logging setup for the chorus-server binary

pub mod cluster; // In-process demo cluster
pub mod model; // Configuration
pub mod startup; // Logging initialization
pub mod testdata; // Built-in testdata channel handler

pub use cluster::{DemoCluster, DemoNode};
pub use model::{Cli, ServerConfiguration};
