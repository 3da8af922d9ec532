// Leader-fenced subscribe survey handler
// Runs a channel subscribe on the leader node, guarded by the leadership token the caller routed with

use std::{sync::Arc, time::Duration};

use tracing::{debug, error, warn};

use chorus_common::{
    ChannelHandlerGetter, IdentityLookup, LeaderManager, SignedInUser, SubscribeEvent,
    prepend_org_id,
};

use crate::{
    error::SurveyError,
    handler::dispatcher::SurveyOperationHandler,
    protocol::{
        PLUGIN_SUBSCRIBE_STREAM, PluginSubscribeStreamRequest, PluginSubscribeStreamResponse,
        SurveyOperation,
    },
};

/// Handler for PluginSubscribeStreamRequest
///
/// The subscribe side effect only runs when this node is the addressed leader
/// and the leadership token in the request is still the current one. Repeating
/// a valid request runs the side effect again; callers that need exactly-once
/// must de-duplicate upstream.
#[derive(Clone)]
pub struct PluginSubscribeStreamHandler {
    node_id: String,
    leader_manager: Arc<dyn LeaderManager>,
    identity_lookup: Arc<dyn IdentityLookup>,
    channel_handlers: Arc<dyn ChannelHandlerGetter>,
    leader_check_timeout: Duration,
}

impl PluginSubscribeStreamHandler {
    pub fn new(
        node_id: String,
        leader_manager: Arc<dyn LeaderManager>,
        identity_lookup: Arc<dyn IdentityLookup>,
        channel_handlers: Arc<dyn ChannelHandlerGetter>,
        leader_check_timeout: Duration,
    ) -> Self {
        Self {
            node_id,
            leader_manager,
            identity_lookup,
            channel_handlers,
            leader_check_timeout,
        }
    }

    pub async fn process(
        &self,
        request: PluginSubscribeStreamRequest,
    ) -> Result<PluginSubscribeStreamResponse, SurveyError> {
        debug!(
            org_id = request.org_id,
            user_id = request.user_id,
            channel = %request.channel,
            leader_node_id = %request.leader_node_id,
            leadership_id = %request.leadership_id,
            "Handle plugin subscribe stream survey"
        );

        if request.leader_node_id != self.node_id {
            // The transport addresses subscribe surveys to the leader only.
            warn!(
                channel = %request.channel,
                leader_node_id = %request.leader_node_id,
                "Subscribe survey reached a non-leader node"
            );
            metrics::counter!("chorus_survey_misrouted_total").increment(1);
            return Ok(PluginSubscribeStreamResponse::default());
        }

        self.check_leadership(&request).await?;

        let user = self.resolve_user(&request).await?;

        let (handler, channel) = self
            .channel_handlers
            .get_channel_handler(&user, &request.channel)
            .await
            .map_err(|e| {
                error!(channel = %request.channel, error = %e, "Error getting channel handler");
                SurveyError::ChannelResolution(e)
            })?;

        let event = SubscribeEvent {
            channel: request.channel.clone(),
            path: channel.path,
            leadership_id: request.leadership_id.clone(),
        };

        let (reply, status) = handler.on_subscribe(&user, event).await.map_err(|e| {
            error!(channel = %request.channel, error = %e, "Error calling subscribe handler");
            SurveyError::Subscribe(e)
        })?;

        Ok(PluginSubscribeStreamResponse { status, reply })
    }

    /// Fencing check: the leadership the request was routed under must still be current
    async fn check_leadership(
        &self,
        request: &PluginSubscribeStreamRequest,
    ) -> Result<(), SurveyError> {
        let key = prepend_org_id(request.org_id, &request.channel);

        let leader = match tokio::time::timeout(
            self.leader_check_timeout,
            self.leader_manager.get_leader(&key),
        )
        .await
        {
            Ok(Ok(leader)) => leader,
            Ok(Err(e)) => {
                error!(channel = %request.channel, error = %e, "Error checking leader");
                return Err(SurveyError::LeaderCheck(e));
            }
            Err(_) => {
                error!(
                    channel = %request.channel,
                    timeout = ?self.leader_check_timeout,
                    "Timed out checking leader"
                );
                return Err(SurveyError::LeaderCheckTimeout(self.leader_check_timeout));
            }
        };

        match leader {
            Some(current) if current.leadership_id == request.leadership_id => Ok(()),
            _ => {
                error!(channel = %request.channel, "Leader changed");
                metrics::counter!("chorus_survey_leader_changed_total").increment(1);
                Err(SurveyError::LeaderChanged(request.channel.clone()))
            }
        }
    }

    async fn resolve_user(
        &self,
        request: &PluginSubscribeStreamRequest,
    ) -> Result<SignedInUser, SurveyError> {
        if request.user_id <= 0 {
            return Ok(SignedInUser::anonymous(request.org_id));
        }

        self.identity_lookup
            .get_signed_in_user(request.user_id, request.org_id)
            .await
            .map_err(|e| {
                error!(
                    channel = %request.channel,
                    user_id = request.user_id,
                    error = %e,
                    "Error getting signed in user"
                );
                SurveyError::Identity(e)
            })
    }
}

#[async_trait::async_trait]
impl SurveyOperationHandler for PluginSubscribeStreamHandler {
    fn can_handle(&self) -> &'static str {
        PLUGIN_SUBSCRIBE_STREAM
    }

    async fn handle(&self, data: &[u8]) -> Result<Vec<u8>, SurveyError> {
        let request = PluginSubscribeStreamRequest::from_payload(data)?;
        let response = self.process(request).await?;
        PluginSubscribeStreamRequest::response_to_payload(&response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use chorus_common::{Channel, ChannelHandler, LeaderInfo, SubscribeReply, SubscribeStatus};

    use super::*;

    const NODE: &str = "node-a";
    const CHANNEL: &str = "plugin/testdata/random-flakey-stream";

    #[derive(Default)]
    struct FakeLeaders {
        leader: Mutex<Option<LeaderInfo>>,
        fail: bool,
        delay: Option<Duration>,
        calls: AtomicUsize,
        keys: Mutex<Vec<String>>,
    }

    impl FakeLeaders {
        fn with_token(token: &str) -> Self {
            Self {
                leader: Mutex::new(Some(LeaderInfo {
                    node_id: NODE.to_string(),
                    leadership_id: token.to_string(),
                })),
                ..Default::default()
            }
        }
    }

    #[async_trait::async_trait]
    impl LeaderManager for FakeLeaders {
        async fn get_leader(&self, key: &str) -> anyhow::Result<Option<LeaderInfo>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.keys.lock().unwrap().push(key.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                anyhow::bail!("leader store unavailable");
            }
            Ok(self.leader.lock().unwrap().clone())
        }
    }

    struct FakeIdentity;

    #[async_trait::async_trait]
    impl IdentityLookup for FakeIdentity {
        async fn get_signed_in_user(
            &self,
            user_id: i64,
            org_id: i64,
        ) -> anyhow::Result<SignedInUser> {
            if user_id == 404 {
                anyhow::bail!("user {} not found", user_id);
            }
            Ok(SignedInUser {
                org_id,
                user_id,
                login: format!("user{}", user_id),
                ..Default::default()
            })
        }
    }

    #[derive(Default)]
    struct RecordingChannelHandler {
        events: Mutex<Vec<(SignedInUser, SubscribeEvent)>>,
    }

    #[async_trait::async_trait]
    impl ChannelHandler for RecordingChannelHandler {
        async fn on_subscribe(
            &self,
            user: &SignedInUser,
            event: SubscribeEvent,
        ) -> anyhow::Result<(SubscribeReply, SubscribeStatus)> {
            if event.path == "broken" {
                anyhow::bail!("stream runner crashed");
            }
            self.events.lock().unwrap().push((user.clone(), event));
            Ok((
                SubscribeReply {
                    presence: true,
                    data: Some(serde_json::json!({"frame": 1})),
                    ..Default::default()
                },
                SubscribeStatus::Ok,
            ))
        }
    }

    struct FakeGetter {
        handler: Arc<RecordingChannelHandler>,
    }

    #[async_trait::async_trait]
    impl ChannelHandlerGetter for FakeGetter {
        async fn get_channel_handler(
            &self,
            _user: &SignedInUser,
            channel: &str,
        ) -> anyhow::Result<(Arc<dyn ChannelHandler>, Channel)> {
            let parsed = Channel::parse(channel)?;
            Ok((self.handler.clone(), parsed))
        }
    }

    struct Fixture {
        leaders: Arc<FakeLeaders>,
        channel_handler: Arc<RecordingChannelHandler>,
        handler: PluginSubscribeStreamHandler,
    }

    fn fixture(leaders: FakeLeaders) -> Fixture {
        let leaders = Arc::new(leaders);
        let channel_handler = Arc::new(RecordingChannelHandler::default());
        let handler = PluginSubscribeStreamHandler::new(
            NODE.to_string(),
            leaders.clone(),
            Arc::new(FakeIdentity),
            Arc::new(FakeGetter {
                handler: channel_handler.clone(),
            }),
            Duration::from_millis(50),
        );
        Fixture {
            leaders,
            channel_handler,
            handler,
        }
    }

    fn request(user_id: i64, leader: &str, token: &str) -> PluginSubscribeStreamRequest {
        PluginSubscribeStreamRequest {
            org_id: 1,
            user_id,
            channel: CHANNEL.to_string(),
            leader_node_id: leader.to_string(),
            leadership_id: token.to_string(),
        }
    }

    #[tokio::test]
    async fn test_subscribe_as_current_leader() {
        let f = fixture(FakeLeaders::with_token("t1"));

        let response = f.handler.process(request(7, NODE, "t1")).await.unwrap();
        assert_eq!(response.status, SubscribeStatus::Ok);
        assert!(response.reply.presence);

        let events = f.channel_handler.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        let (user, event) = &events[0];
        assert_eq!(user.user_id, 7);
        assert_eq!(user.login, "user7");
        assert_eq!(event.channel, CHANNEL);
        assert_eq!(event.path, "random-flakey-stream");
        assert_eq!(event.leadership_id, "t1");
        assert_eq!(
            f.leaders.keys.lock().unwrap().as_slice(),
            &[format!("1/{}", CHANNEL)]
        );
    }

    #[tokio::test]
    async fn test_anonymous_user_gets_org_only_identity() {
        let f = fixture(FakeLeaders::with_token("t1"));

        f.handler.process(request(0, NODE, "t1")).await.unwrap();

        let events = f.channel_handler.events.lock().unwrap();
        assert_eq!(events[0].0, SignedInUser::anonymous(1));
    }

    #[tokio::test]
    async fn test_stale_token_is_fenced() {
        let f = fixture(FakeLeaders::with_token("t2"));

        let err = f.handler.process(request(7, NODE, "t1")).await.unwrap_err();
        assert!(err.is_leader_changed());
        assert!(f.channel_handler.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_leader_is_fenced() {
        let f = fixture(FakeLeaders::default());

        let err = f.handler.process(request(7, NODE, "t1")).await.unwrap_err();
        assert!(err.is_leader_changed());
        assert!(f.channel_handler.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_leader_returns_empty_answer() {
        let f = fixture(FakeLeaders::with_token("t1"));

        let response = f
            .handler
            .process(request(7, "node-b", "t1"))
            .await
            .unwrap();
        assert_eq!(response, PluginSubscribeStreamResponse::default());
        assert_eq!(f.leaders.calls.load(Ordering::SeqCst), 0);
        assert!(f.channel_handler.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_leader_store_error_aborts() {
        let f = fixture(FakeLeaders {
            fail: true,
            ..FakeLeaders::with_token("t1")
        });

        let err = f.handler.process(request(7, NODE, "t1")).await.unwrap_err();
        assert!(matches!(err, SurveyError::LeaderCheck(_)));
        assert!(f.channel_handler.events.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_leader_store_timeout_aborts() {
        let f = fixture(FakeLeaders {
            delay: Some(Duration::from_secs(5)),
            ..FakeLeaders::with_token("t1")
        });

        let err = f.handler.process(request(7, NODE, "t1")).await.unwrap_err();
        assert!(matches!(err, SurveyError::LeaderCheckTimeout(_)));
        assert!(f.channel_handler.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_identity_error_aborts() {
        let f = fixture(FakeLeaders::with_token("t1"));

        let err = f.handler.process(request(404, NODE, "t1")).await.unwrap_err();
        assert!(matches!(err, SurveyError::Identity(_)));
        assert!(f.channel_handler.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_channel_resolution_error_aborts() {
        let f = fixture(FakeLeaders::with_token("t1"));
        let mut req = request(7, NODE, "t1");
        req.channel = "not-a-channel".to_string();

        let err = f.handler.process(req).await.unwrap_err();
        assert!(matches!(err, SurveyError::ChannelResolution(_)));
    }

    #[tokio::test]
    async fn test_subscribe_handler_error_propagates() {
        let f = fixture(FakeLeaders::with_token("t1"));
        let mut req = request(7, NODE, "t1");
        req.channel = "plugin/testdata/broken".to_string();

        let err = f.handler.process(req).await.unwrap_err();
        assert!(matches!(err, SurveyError::Subscribe(_)));
        assert!(err.to_string().contains("stream runner crashed"));
    }

    #[tokio::test]
    async fn test_repeated_valid_request_runs_side_effect_each_time() {
        let f = fixture(FakeLeaders::with_token("t1"));

        f.handler.process(request(7, NODE, "t1")).await.unwrap();
        f.handler.process(request(7, NODE, "t1")).await.unwrap();

        assert_eq!(f.channel_handler.events.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_handle_round_trips_wire_payload() {
        let f = fixture(FakeLeaders::with_token("t1"));
        let payload = request(7, NODE, "t1").to_payload().unwrap();

        let data = f.handler.handle(&payload).await.unwrap();
        let response = PluginSubscribeStreamRequest::response_from_payload(&data).unwrap();
        assert!(response.reply.presence);
        assert_eq!(response.reply.data, Some(serde_json::json!({"frame": 1})));
    }
}
