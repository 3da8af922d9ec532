//! Application startup utilities module.

mod logging;

pub use logging::{LoggingConfig, init_logging};
