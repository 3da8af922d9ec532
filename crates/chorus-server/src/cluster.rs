//! In-process demo cluster
//!
//! Boots a set of nodes on one `MemoryCluster`. Every node gets its own
//! survey caller, managed stream tracker and channel registry, while the
//! leader store and identity store are shared the way a real deployment
//! shares them through external services.

use std::sync::Arc;

use tracing::info;

use chorus_common::prepend_org_id;
use chorus_core::{
    SurveyConfig, SurveyError,
    service::{
        ChannelHandlerRegistry, MemoryCluster, MemoryIdentityStore, MemoryLeaderManager,
        MemoryManagedStreams, SurveyCaller, SurveyContext,
    },
};

use crate::testdata::TestdataChannelHandler;

/// One node of the demo cluster
pub struct DemoNode {
    pub caller: SurveyCaller,
    pub streams: MemoryManagedStreams,
    pub channels: ChannelHandlerRegistry,
}

impl DemoNode {
    pub fn node_id(&self) -> &str {
        self.caller.node_id()
    }
}

pub struct DemoCluster {
    cluster: MemoryCluster,
    leaders: MemoryLeaderManager,
    identities: MemoryIdentityStore,
    nodes: Vec<DemoNode>,
}

impl DemoCluster {
    /// Start one node per ID and install their survey handlers
    pub fn start(node_ids: &[String], config: SurveyConfig) -> Result<Self, SurveyError> {
        let cluster = MemoryCluster::new();
        let leaders = MemoryLeaderManager::new();
        let identities = MemoryIdentityStore::new();

        let mut nodes = Vec::with_capacity(node_ids.len());
        for node_id in node_ids {
            let streams = MemoryManagedStreams::new();
            let channels = ChannelHandlerRegistry::new();
            channels.register(
                "plugin",
                "testdata",
                TestdataChannelHandler::new(node_id.clone(), streams.clone()),
            );

            let caller = SurveyCaller::new(
                Arc::new(cluster.node(node_id.clone())),
                SurveyContext {
                    leader_manager: Arc::new(leaders.clone()),
                    identity_lookup: Arc::new(identities.clone()),
                    channel_handlers: Arc::new(channels.clone()),
                    managed_streams: Arc::new(streams.clone()),
                },
                config.clone(),
            );
            caller.setup_handlers()?;

            nodes.push(DemoNode {
                caller,
                streams,
                channels,
            });
        }

        info!(nodes = nodes.len(), "Demo cluster started");

        Ok(Self {
            cluster,
            leaders,
            identities,
            nodes,
        })
    }

    pub fn nodes(&self) -> &[DemoNode] {
        &self.nodes
    }

    pub fn node(&self, node_id: &str) -> Option<&DemoNode> {
        self.nodes.iter().find(|n| n.node_id() == node_id)
    }

    pub fn cluster(&self) -> &MemoryCluster {
        &self.cluster
    }

    pub fn leaders(&self) -> &MemoryLeaderManager {
        &self.leaders
    }

    pub fn identities(&self) -> &MemoryIdentityStore {
        &self.identities
    }

    /// Make `node_id` the leader of an org channel and return the new
    /// leadership token
    pub fn elect(&self, org_id: i64, channel: &str, node_id: &str) -> String {
        let token = self.leaders.elect(&prepend_org_id(org_id, channel), node_id);
        info!(org_id, channel = %channel, node_id = %node_id, "Leader elected");
        token
    }
}
