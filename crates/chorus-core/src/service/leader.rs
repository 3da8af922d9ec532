// In-memory leader election store
// Holds the current leader node and leadership token per org scoped channel key

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use tracing::{debug, info};

use chorus_common::{LeaderInfo, LeaderManager};

/// In-memory leader store using DashMap
///
/// Every `elect` mints a fresh leadership token, so a token identifies one
/// leadership term.
#[derive(Clone, Default)]
pub struct MemoryLeaderManager {
    leaders: Arc<DashMap<String, LeaderInfo>>,
    latency: Option<Duration>,
}

impl MemoryLeaderManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every `get_leader` call, for exercising caller timeouts
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            leaders: Arc::new(DashMap::new()),
            latency: Some(latency),
        }
    }

    /// Make `node_id` the leader for `key` and return the new leadership token
    pub fn elect(&self, key: &str, node_id: &str) -> String {
        let leadership_id = uuid::Uuid::new_v4().to_string();

        self.leaders.insert(
            key.to_string(),
            LeaderInfo {
                node_id: node_id.to_string(),
                leadership_id: leadership_id.clone(),
            },
        );

        info!(key = %key, node_id = %node_id, leadership_id = %leadership_id, "Leader elected");
        leadership_id
    }

    /// Give up leadership for `key`
    ///
    /// Returns `true` if the leadership was released, `false` if not held by this node
    pub fn resign(&self, key: &str, node_id: &str) -> bool {
        // Owner check and removal happen under one shard lock.
        let released = self
            .leaders
            .remove_if(key, |_, leader| leader.node_id == node_id)
            .is_some();
        if released {
            debug!(key = %key, node_id = %node_id, "Leadership released");
        }
        released
    }

    pub fn current(&self, key: &str) -> Option<LeaderInfo> {
        self.leaders.get(key).map(|entry| entry.value().clone())
    }
}

#[async_trait::async_trait]
impl LeaderManager for MemoryLeaderManager {
    async fn get_leader(&self, key: &str) -> anyhow::Result<Option<LeaderInfo>> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self.current(key))
    }
}
