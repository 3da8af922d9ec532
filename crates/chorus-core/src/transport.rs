//! Survey envelope and transport abstraction
//!
//! A survey is a scatter-gather request: one node sends an operation name and
//! an opaque payload to every node (or to a single node) and collects one
//! reply per responder, keyed by node ID.

use std::{collections::HashMap, sync::Arc};

/// Reply code for a successful survey operation
pub const SURVEY_CODE_OK: u32 = 0;

/// Reply code for any failed survey operation
pub const SURVEY_CODE_FAILED: u32 = 1;

/// Inbound survey as seen by a responding node
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SurveyEvent {
    pub op: String,
    pub data: Vec<u8>,
}

impl SurveyEvent {
    pub fn new(op: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            op: op.into(),
            data,
        }
    }
}

/// Per-node survey reply
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SurveyReply {
    pub code: u32,
    pub data: Vec<u8>,
}

impl SurveyReply {
    pub fn ok(data: Vec<u8>) -> Self {
        Self {
            code: SURVEY_CODE_OK,
            data,
        }
    }

    /// Failure reply; never carries a payload
    pub fn failed() -> Self {
        Self {
            code: SURVEY_CODE_FAILED,
            data: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == SURVEY_CODE_OK
    }
}

/// Reply sink handed to the inbound survey handler; consumed on use
pub type SurveyCallback = Box<dyn FnOnce(SurveyReply) + Send + 'static>;

/// Transport-level failures
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("no nodes reachable")]
    NoNodesReachable,

    #[error("node '{0}' not found")]
    NodeNotFound(String),
}

/// Handler for every inbound survey on a node
#[async_trait::async_trait]
pub trait SurveyHandler: Send + Sync {
    /// Must invoke `callback` exactly once
    async fn on_survey(&self, event: SurveyEvent, callback: SurveyCallback);
}

/// Broadcast-RPC primitive provided by the cluster node
#[async_trait::async_trait]
pub trait SurveyTransport: Send + Sync {
    /// This node's identity in the cluster
    fn node_id(&self) -> &str;

    /// Send `op` to `to_node`, or to every node when `to_node` is empty
    async fn survey(
        &self,
        op: &str,
        data: Vec<u8>,
        to_node: &str,
    ) -> Result<HashMap<String, SurveyReply>, TransportError>;

    /// Install the single handler for inbound surveys on this node
    fn on_survey(&self, handler: Arc<dyn SurveyHandler>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_codes() {
        let ok = SurveyReply::ok(b"{}".to_vec());
        assert!(ok.is_ok());
        assert_eq!(ok.code, SURVEY_CODE_OK);

        let failed = SurveyReply::failed();
        assert!(!failed.is_ok());
        assert_eq!(failed.code, SURVEY_CODE_FAILED);
        assert!(failed.data.is_empty());
    }
}
