//! Collaborator traits for dependency injection
//!
//! The survey layer talks to leader election, identity lookup, channel
//! handling, and managed stream tracking only through these traits, so each
//! can be backed by a real service or by an in-memory fake.

use std::sync::Arc;

use crate::{
    channel::Channel,
    model::{
        LeaderInfo, ManagedChannel, SignedInUser, SubscribeEvent, SubscribeReply, SubscribeStatus,
    },
};

/// Leader election store
///
/// Implementations must be safe to query concurrently from many nodes.
#[async_trait::async_trait]
pub trait LeaderManager: Send + Sync {
    /// Current leader and leadership token for an org scoped channel key,
    /// or `None` when nobody holds leadership
    async fn get_leader(&self, key: &str) -> anyhow::Result<Option<LeaderInfo>>;
}

/// User/session resolution
#[async_trait::async_trait]
pub trait IdentityLookup: Send + Sync {
    /// Resolve a user within an organization
    async fn get_signed_in_user(&self, user_id: i64, org_id: i64) -> anyhow::Result<SignedInUser>;
}

/// Per-channel subscription logic
#[async_trait::async_trait]
pub trait ChannelHandler: Send + Sync {
    /// Called when a user subscribes to a channel served by this handler
    async fn on_subscribe(
        &self,
        user: &SignedInUser,
        event: SubscribeEvent,
    ) -> anyhow::Result<(SubscribeReply, SubscribeStatus)>;
}

/// Resolves a channel name to its handler
#[async_trait::async_trait]
pub trait ChannelHandlerGetter: Send + Sync {
    async fn get_channel_handler(
        &self,
        user: &SignedInUser,
        channel: &str,
    ) -> anyhow::Result<(Arc<dyn ChannelHandler>, Channel)>;
}

/// Local tracker of managed channels and their rates
pub trait ManagedStreamTracker: Send + Sync {
    /// Channels currently tracked for an organization, in tracker order
    fn get_managed_channels(&self, org_id: i64) -> anyhow::Result<Vec<ManagedChannel>>;
}
