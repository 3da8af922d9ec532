// Survey caller for cluster-wide requests
// Issues surveys to peer nodes and routes, selects or aggregates their replies

use std::{collections::HashMap, sync::Arc, time::Duration};

use tracing::{Instrument, Span, debug, info_span, warn};

use chorus_common::{
    ChannelHandlerGetter, IdentityLookup, LeaderManager, ManagedChannel, ManagedStreamTracker,
    SignedInUser, SubscribeReply, SubscribeStatus,
};

use crate::{
    error::SurveyError,
    handler::{
        ManagedStreamsHandler, PluginSubscribeStreamHandler, SurveyDispatcher,
        SurveyOperationHandler,
    },
    model::SurveyConfig,
    protocol::{NodeManagedChannelsRequest, PluginSubscribeStreamRequest, SurveyOperation},
    transport::{SurveyReply, SurveyTransport},
};

/// Collaborators the survey handlers call into
#[derive(Clone)]
pub struct SurveyContext {
    pub leader_manager: Arc<dyn LeaderManager>,
    pub identity_lookup: Arc<dyn IdentityLookup>,
    pub channel_handlers: Arc<dyn ChannelHandlerGetter>,
    pub managed_streams: Arc<dyn ManagedStreamTracker>,
}

/// Survey caller
/// Both answers inbound surveys on this node and issues surveys to peers
pub struct SurveyCaller {
    transport: Arc<dyn SurveyTransport>,
    dispatcher: Arc<SurveyDispatcher>,
    config: SurveyConfig,
    span: Span,
}

impl SurveyCaller {
    pub fn new(
        transport: Arc<dyn SurveyTransport>,
        context: SurveyContext,
        config: SurveyConfig,
    ) -> Self {
        let span = info_span!("survey", node_id = %transport.node_id());

        let handlers: Vec<Arc<dyn SurveyOperationHandler>> = vec![
            Arc::new(ManagedStreamsHandler::new(context.managed_streams)),
            Arc::new(PluginSubscribeStreamHandler::new(
                transport.node_id().to_string(),
                context.leader_manager,
                context.identity_lookup,
                context.channel_handlers,
                config.leader_check_timeout,
            )),
        ];

        Self {
            transport,
            dispatcher: Arc::new(SurveyDispatcher::new(handlers, span.clone())),
            config,
            span,
        }
    }

    /// Install this caller's dispatcher as the node's inbound survey handler
    pub fn setup_handlers(&self) -> Result<(), SurveyError> {
        self.transport.on_survey(self.dispatcher.clone());
        Ok(())
    }

    pub fn node_id(&self) -> &str {
        self.transport.node_id()
    }

    pub fn dispatcher(&self) -> Arc<SurveyDispatcher> {
        self.dispatcher.clone()
    }

    pub fn config(&self) -> &SurveyConfig {
        &self.config
    }

    /// Subscribe through the leader node of a channel.
    ///
    /// Any failure reported by a responder is a hard failure: a non-zero code
    /// from the leader means the leader refused or failed the subscribe.
    pub async fn call_plugin_subscribe_stream(
        &self,
        user: &SignedInUser,
        channel: &str,
        leader_node_id: &str,
        leadership_id: &str,
    ) -> Result<(SubscribeReply, SubscribeStatus), SurveyError> {
        let request = PluginSubscribeStreamRequest {
            org_id: user.org_id,
            user_id: user.user_id,
            channel: channel.to_string(),
            leader_node_id: leader_node_id.to_string(),
            leadership_id: leadership_id.to_string(),
        };

        let replies = self
            .survey(&request, leader_node_id, self.config.subscribe_timeout)
            .await?;

        for (node_id, reply) in replies {
            if !reply.is_ok() {
                return Err(SurveyError::UnexpectedCode(reply.code));
            }
            if node_id != leader_node_id {
                continue;
            }
            let response = PluginSubscribeStreamRequest::response_from_payload(&reply.data)?;
            return Ok((response.reply, response.status));
        }

        Err(SurveyError::LeaderNodeNotResponded)
    }

    /// Managed channels for an organization across the whole cluster.
    ///
    /// One failing node fails the whole call; a partial list would misreport
    /// total load.
    pub async fn call_managed_streams(
        &self,
        org_id: i64,
    ) -> Result<Vec<ManagedChannel>, SurveyError> {
        let request = NodeManagedChannelsRequest { org_id };

        let replies = self
            .survey(&request, "", self.config.managed_streams_timeout)
            .await?;

        let mut answers = Vec::with_capacity(replies.len());
        for (_, reply) in replies {
            if !reply.is_ok() {
                return Err(SurveyError::UnexpectedCode(reply.code));
            }
            let response = NodeManagedChannelsRequest::response_from_payload(&reply.data)?;
            answers.push(response.channels);
        }

        Ok(merge_managed_channels(answers, &self.config.testdata_prefix))
    }

    async fn survey<R: SurveyOperation>(
        &self,
        request: &R,
        to_node: &str,
        timeout: Duration,
    ) -> Result<HashMap<String, SurveyReply>, SurveyError> {
        let payload = request.to_payload()?;

        let replies = tokio::time::timeout(timeout, self.transport.survey(R::OP, payload, to_node))
            .instrument(self.span.clone())
            .await
            .map_err(|_| {
                warn!(parent: &self.span, op = R::OP, to_node = %to_node, ?timeout, "Survey timed out");
                SurveyError::SurveyTimeout {
                    op: R::OP,
                    timeout,
                }
            })??;

        debug!(parent: &self.span, op = R::OP, replies = replies.len(), "Survey completed");
        Ok(replies)
    }
}

/// Merge per-node channel lists into one list sorted by channel name.
///
/// Rates of a channel reported by several nodes are summed, except for
/// channels under `testdata_prefix` whose later duplicates are dropped.
pub fn merge_managed_channels<I>(answers: I, testdata_prefix: &str) -> Vec<ManagedChannel>
where
    I: IntoIterator<Item = Vec<ManagedChannel>>,
{
    let mut channels: HashMap<String, ManagedChannel> = HashMap::new();

    for answer in answers {
        for ch in answer {
            match channels.get_mut(&ch.channel) {
                Some(existing) => {
                    // Testdata rates are fixed per stream, not per node.
                    if !testdata_prefix.is_empty() && ch.channel.starts_with(testdata_prefix) {
                        continue;
                    }
                    existing.minute_rate += ch.minute_rate;
                }
                None => {
                    channels.insert(ch.channel.clone(), ch);
                }
            }
        }
    }

    let mut result: Vec<ManagedChannel> = channels.into_values().collect();
    result.sort_by(|a, b| a.channel.cmp(&b.channel));
    result
}
