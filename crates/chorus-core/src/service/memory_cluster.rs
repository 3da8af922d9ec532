//! In-process survey transport
//!
//! `MemoryCluster` connects any number of `MemoryNode`s living in the same
//! process. Surveys fan out to the addressed nodes on spawned tasks and the
//! replies are collected per node ID, the same shape a networked cluster
//! transport returns.

use std::{collections::HashMap, sync::Arc};

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::transport::{SurveyEvent, SurveyHandler, SurveyReply, SurveyTransport, TransportError};

/// Registry of survey handlers keyed by node ID
#[derive(Clone, Default)]
pub struct MemoryCluster {
    nodes: Arc<DashMap<String, Arc<dyn SurveyHandler>>>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node handle; the node becomes reachable once it installs a
    /// survey handler
    pub fn node(&self, node_id: impl Into<String>) -> MemoryNode {
        MemoryNode {
            node_id: node_id.into(),
            cluster: self.clone(),
        }
    }

    /// Remove a node from the cluster
    pub fn leave(&self, node_id: &str) -> bool {
        let removed = self.nodes.remove(node_id).is_some();
        if removed {
            info!(node_id = %node_id, "Node left survey cluster");
        }
        removed
    }

    /// IDs of all reachable nodes, sorted
    pub fn node_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.nodes.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn register(&self, node_id: &str, handler: Arc<dyn SurveyHandler>) {
        if self.nodes.insert(node_id.to_string(), handler).is_some() {
            warn!(node_id = %node_id, "Replaced survey handler for node");
        } else {
            info!(node_id = %node_id, "Node joined survey cluster");
        }
    }

    fn targets(&self, to_node: &str) -> Result<Vec<(String, Arc<dyn SurveyHandler>)>, TransportError> {
        if to_node.is_empty() {
            let targets: Vec<_> = self
                .nodes
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect();
            if targets.is_empty() {
                return Err(TransportError::NoNodesReachable);
            }
            return Ok(targets);
        }

        self.nodes
            .get(to_node)
            .map(|handler| vec![(to_node.to_string(), handler.clone())])
            .ok_or_else(|| TransportError::NodeNotFound(to_node.to_string()))
    }
}

/// A node's view of a `MemoryCluster`
#[derive(Clone)]
pub struct MemoryNode {
    node_id: String,
    cluster: MemoryCluster,
}

impl MemoryNode {
    pub fn cluster(&self) -> &MemoryCluster {
        &self.cluster
    }
}

#[async_trait::async_trait]
impl SurveyTransport for MemoryNode {
    fn node_id(&self) -> &str {
        &self.node_id
    }

    async fn survey(
        &self,
        op: &str,
        data: Vec<u8>,
        to_node: &str,
    ) -> Result<HashMap<String, SurveyReply>, TransportError> {
        let targets = self.cluster.targets(to_node)?;

        let mut handles = Vec::with_capacity(targets.len());
        for (node_id, handler) in targets {
            let event = SurveyEvent::new(op, data.clone());

            let handle = tokio::spawn(async move {
                let (tx, rx) = oneshot::channel();
                handler
                    .on_survey(
                        event,
                        Box::new(move |reply| {
                            let _ = tx.send(reply);
                        }),
                    )
                    .await;
                (node_id, rx.await.ok())
            });

            handles.push(handle);
        }

        let mut replies = HashMap::with_capacity(handles.len());
        for result in futures::future::join_all(handles).await {
            match result {
                Ok((node_id, Some(reply))) => {
                    replies.insert(node_id, reply);
                }
                Ok((node_id, None)) => {
                    debug!(node_id = %node_id, op = %op, "Node dropped survey without replying");
                }
                Err(e) => {
                    warn!(op = %op, error = %e, "Survey task failed");
                }
            }
        }

        Ok(replies)
    }

    fn on_survey(&self, handler: Arc<dyn SurveyHandler>) {
        self.cluster.register(&self.node_id, handler);
    }
}
