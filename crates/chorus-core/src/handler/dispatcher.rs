// Survey dispatcher for inbound cluster surveys
// Routes each survey to its operation handler and turns the outcome into a wire reply

use std::{collections::HashMap, sync::Arc};

use tracing::{Instrument, Span, info, warn};

use crate::{
    error::SurveyError,
    transport::{SurveyCallback, SurveyEvent, SurveyHandler, SurveyReply},
};

// Trait for handling a single survey operation
#[async_trait::async_trait]
pub trait SurveyOperationHandler: Send + Sync {
    /// Operation name this handler answers
    fn can_handle(&self) -> &'static str;

    /// Decode the payload, run the operation and encode its response
    async fn handle(&self, data: &[u8]) -> Result<Vec<u8>, SurveyError>;
}

// Dispatch table for inbound surveys
// The set of operations is fixed when the dispatcher is built
pub struct SurveyDispatcher {
    handlers: HashMap<&'static str, Arc<dyn SurveyOperationHandler>>,
    span: Span,
}

impl SurveyDispatcher {
    pub(crate) fn new(handlers: Vec<Arc<dyn SurveyOperationHandler>>, span: Span) -> Self {
        let mut table = HashMap::with_capacity(handlers.len());
        for handler in handlers {
            let op = handler.can_handle();
            info!(parent: &span, op = %op, "Registering survey handler for operation '{}'", op);
            table.insert(op, handler);
        }

        Self {
            handlers: table,
            span,
        }
    }

    /// Operations this dispatcher answers
    pub fn registered_operations(&self) -> Vec<&'static str> {
        let mut ops: Vec<&'static str> = self.handlers.keys().copied().collect();
        ops.sort_unstable();
        ops
    }

    /// Run the survey and build the reply sent back to the surveying node.
    ///
    /// Any error becomes a bare failure code; the error itself is only logged
    /// here and never leaves the node.
    pub async fn dispatch(&self, event: &SurveyEvent) -> SurveyReply {
        let result = match self.handlers.get(event.op.as_str()) {
            Some(handler) => handler.handle(&event.data).await,
            None => Err(SurveyError::MethodNotFound(event.op.clone())),
        };

        match result {
            Ok(data) => {
                metrics::counter!("chorus_survey_requests_total", "op" => event.op.clone(), "outcome" => "ok")
                    .increment(1);
                SurveyReply::ok(data)
            }
            Err(e) => {
                if matches!(e, SurveyError::MethodNotFound(_)) {
                    warn!(op = %event.op, "Received survey for unknown operation");
                } else {
                    warn!(op = %event.op, error = %e, "Survey operation failed");
                }
                metrics::counter!("chorus_survey_requests_total", "op" => event.op.clone(), "outcome" => "failed")
                    .increment(1);
                SurveyReply::failed()
            }
        }
    }
}

#[async_trait::async_trait]
impl SurveyHandler for SurveyDispatcher {
    async fn on_survey(&self, event: SurveyEvent, callback: SurveyCallback) {
        let reply = self.dispatch(&event).instrument(self.span.clone()).await;
        callback(reply);
    }
}
