//! Chorus Common - Shared types, traits, and utilities
//!
//! This crate provides the foundational types used across all Chorus components:
//! - Error types
//! - Collaborator traits for dependency injection (leader store, identity lookup,
//!   channel handlers, managed stream tracking)
//! - Channel addressing and org scoping helpers
//! - Common constants

pub mod channel;
pub mod error;
pub mod model;
pub mod traits;
pub mod utils;

// Re-exports for convenience
pub use channel::Channel;
pub use error::ChorusError;
pub use model::{
    LeaderInfo, ManagedChannel, SignedInUser, SubscribeEvent, SubscribeReply, SubscribeStatus,
};
pub use traits::*;
pub use utils::{prepend_org_id, strip_org_id};

/// Channel prefix whose minute rate is produced out of band by the testdata plugin
pub const TESTDATA_CHANNEL_PREFIX: &str = "plugin/testdata/";
