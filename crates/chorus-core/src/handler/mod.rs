//! Inbound survey handling
//!
//! This module provides the survey dispatcher and the handlers for each
//! survey operation a node answers.

pub mod dispatcher;
pub mod managed_streams;
pub mod subscribe;

pub use dispatcher::{SurveyDispatcher, SurveyOperationHandler};
pub use managed_streams::ManagedStreamsHandler;
pub use subscribe::PluginSubscribeStreamHandler;
