// Managed streams survey handler
// Answers which channels this node tracks for an organization

use std::sync::Arc;

use tracing::error;

use chorus_common::ManagedStreamTracker;

use crate::{
    error::SurveyError,
    handler::dispatcher::SurveyOperationHandler,
    protocol::{
        MANAGED_STREAMS_CALL, NodeManagedChannelsRequest, NodeManagedChannelsResponse,
        SurveyOperation,
    },
};

/// Handler for NodeManagedChannelsRequest - reports local managed channels as-is
#[derive(Clone)]
pub struct ManagedStreamsHandler {
    pub tracker: Arc<dyn ManagedStreamTracker>,
}

impl ManagedStreamsHandler {
    pub fn new(tracker: Arc<dyn ManagedStreamTracker>) -> Self {
        Self { tracker }
    }

    pub fn process(
        &self,
        request: NodeManagedChannelsRequest,
    ) -> Result<NodeManagedChannelsResponse, SurveyError> {
        let channels = self
            .tracker
            .get_managed_channels(request.org_id)
            .map_err(|e| {
                error!(org_id = request.org_id, error = %e, "Error getting managed channels");
                SurveyError::ManagedChannels(e)
            })?;

        Ok(NodeManagedChannelsResponse { channels })
    }
}

#[async_trait::async_trait]
impl SurveyOperationHandler for ManagedStreamsHandler {
    fn can_handle(&self) -> &'static str {
        MANAGED_STREAMS_CALL
    }

    async fn handle(&self, data: &[u8]) -> Result<Vec<u8>, SurveyError> {
        let request = NodeManagedChannelsRequest::from_payload(data)?;
        let response = self.process(request)?;
        NodeManagedChannelsRequest::response_to_payload(&response)
    }
}
