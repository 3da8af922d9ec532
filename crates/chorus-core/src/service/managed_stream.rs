// In-memory managed stream tracker
// Tracks per-organization channels this node publishes and their minute rates

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use chorus_common::{ManagedChannel, ManagedStreamTracker};

#[derive(Clone, Default)]
pub struct MemoryManagedStreams {
    orgs: Arc<DashMap<i64, DashMap<String, ManagedChannel>>>,
}

impl MemoryManagedStreams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest rate (and optionally the last payload) for a channel
    pub fn update(
        &self,
        org_id: i64,
        channel: &str,
        minute_rate: f64,
        data: Option<serde_json::Value>,
    ) {
        let org = self.orgs.entry(org_id).or_default();
        org.insert(
            channel.to_string(),
            ManagedChannel {
                channel: channel.to_string(),
                minute_rate,
                data,
            },
        );
        debug!(org_id, channel = %channel, minute_rate, "Managed channel updated");
    }

    /// Stop tracking a channel
    pub fn remove(&self, org_id: i64, channel: &str) -> bool {
        self.orgs
            .get(&org_id)
            .is_some_and(|org| org.remove(channel).is_some())
    }
}

impl ManagedStreamTracker for MemoryManagedStreams {
    fn get_managed_channels(&self, org_id: i64) -> anyhow::Result<Vec<ManagedChannel>> {
        let mut channels: Vec<ManagedChannel> = self
            .orgs
            .get(&org_id)
            .map(|org| org.iter().map(|e| e.value().clone()).collect())
            .unwrap_or_default();
        channels.sort_by(|a, b| a.channel.cmp(&b.channel));
        Ok(channels)
    }
}
