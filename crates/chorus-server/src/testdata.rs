// Built-in testdata channel handler
// Serves the fixed-rate demo streams under `plugin/testdata/`

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use chorus_common::{
    ChannelHandler, SignedInUser, SubscribeEvent, SubscribeReply, SubscribeStatus,
    TESTDATA_CHANNEL_PREFIX,
};
use chorus_core::service::MemoryManagedStreams;

/// Known testdata streams and their fixed rate in messages per minute
pub const TESTDATA_STREAMS: &[(&str, f64)] = &[
    ("random-2s-stream", 30.0),
    ("random-flakey-stream", 60.0),
    ("random-20Hz-stream", 1200.0),
];

/// Full channel name of a testdata stream
pub fn testdata_channel(path: &str) -> String {
    format!("{TESTDATA_CHANNEL_PREFIX}{path}")
}

/// Channel handler for the testdata streams
///
/// A successful subscribe starts publishing the stream on the handling node,
/// which shows up in that node's managed channels.
pub struct TestdataChannelHandler {
    node_id: String,
    streams: MemoryManagedStreams,
}

impl TestdataChannelHandler {
    pub fn new(node_id: impl Into<String>, streams: MemoryManagedStreams) -> Arc<Self> {
        Arc::new(Self {
            node_id: node_id.into(),
            streams,
        })
    }

    fn rate(path: &str) -> Option<f64> {
        TESTDATA_STREAMS
            .iter()
            .find(|(name, _)| *name == path)
            .map(|(_, rate)| *rate)
    }
}

#[async_trait::async_trait]
impl ChannelHandler for TestdataChannelHandler {
    async fn on_subscribe(
        &self,
        user: &SignedInUser,
        event: SubscribeEvent,
    ) -> anyhow::Result<(SubscribeReply, SubscribeStatus)> {
        let Some(rate) = Self::rate(&event.path) else {
            debug!(path = %event.path, "Unknown testdata stream");
            return Ok((SubscribeReply::default(), SubscribeStatus::NotFound));
        };

        let data = json!({
            "node": self.node_id,
            "stream": event.path,
            "leadershipId": event.leadership_id,
        });

        self.streams
            .update(user.org_id, &event.channel, rate, Some(data.clone()));

        info!(
            node_id = %self.node_id,
            org_id = user.org_id,
            channel = %event.channel,
            "Testdata stream started"
        );

        Ok((
            SubscribeReply {
                presence: false,
                join_leave: false,
                recover: false,
                data: Some(data),
            },
            SubscribeStatus::Ok,
        ))
    }
}

#[cfg(test)]
mod tests {
    use chorus_common::ManagedStreamTracker;

    use super::*;

    fn event(path: &str) -> SubscribeEvent {
        SubscribeEvent {
            channel: testdata_channel(path),
            path: path.to_string(),
            leadership_id: "token".to_string(),
        }
    }

    #[tokio::test]
    async fn test_subscribe_starts_stream() {
        let streams = MemoryManagedStreams::new();
        let handler = TestdataChannelHandler::new("node-0", streams.clone());

        let (reply, status) = handler
            .on_subscribe(&SignedInUser::anonymous(1), event("random-20Hz-stream"))
            .await
            .unwrap();

        assert_eq!(status, SubscribeStatus::Ok);
        assert_eq!(reply.data.unwrap()["node"], "node-0");

        let channels = streams.get_managed_channels(1).unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].channel, "plugin/testdata/random-20Hz-stream");
        assert_eq!(channels[0].minute_rate, 1200.0);
    }

    #[tokio::test]
    async fn test_unknown_stream() {
        let streams = MemoryManagedStreams::new();
        let handler = TestdataChannelHandler::new("node-0", streams.clone());

        let (_, status) = handler
            .on_subscribe(&SignedInUser::anonymous(1), event("nope"))
            .await
            .unwrap();

        assert_eq!(status, SubscribeStatus::NotFound);
        assert!(streams.get_managed_channels(1).unwrap().is_empty());
    }
}
