//! Chorus Core - Cluster survey coordination
//!
//! This crate provides:
//! - The survey envelope and transport abstraction, plus an in-process cluster
//! - Wire protocol for the managed-channels and leader-subscribe operations
//! - The inbound survey dispatcher and its operation handlers
//! - Outbound callers that aggregate or route survey replies
//! - In-memory collaborators (leader store, identity store, stream tracker,
//!   channel handler registry)

pub mod error;
pub mod handler;
pub mod model;
pub mod protocol;
pub mod service;
pub mod transport;

// Re-export commonly used types
pub use error::SurveyError;
pub use model::{Configuration, SurveyConfig};
pub use service::caller::{SurveyCaller, SurveyContext, merge_managed_channels};
pub use transport::{
    SurveyCallback, SurveyEvent, SurveyHandler, SurveyReply, SurveyTransport, TransportError,
};

// Re-export common crate
pub use chorus_common as common;
