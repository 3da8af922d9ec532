//! Survey wire protocol
//!
//! Request/response payloads for the two cluster survey operations. Payloads
//! are JSON; field names are shared by every node in the cluster and must not
//! change without versioning the operation name. Missing fields decode to
//! their defaults and unknown fields are ignored.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use chorus_common::{ManagedChannel, SubscribeReply, SubscribeStatus};

use crate::error::SurveyError;

/// Operation name for the managed channels listing
pub const MANAGED_STREAMS_CALL: &str = "managed_streams";

/// Operation name for the leader routed subscribe
pub const PLUGIN_SUBSCRIBE_STREAM: &str = "plugin_subscribe_stream";

/// A typed survey request and its typed response
pub trait SurveyOperation: Serialize + DeserializeOwned {
    type Response: Serialize + DeserializeOwned;

    /// Operation name carried in the survey envelope
    const OP: &'static str;

    fn to_payload(&self) -> Result<Vec<u8>, SurveyError> {
        encode(Self::OP, self)
    }

    fn from_payload(data: &[u8]) -> Result<Self, SurveyError> {
        decode(Self::OP, data)
    }

    fn response_to_payload(response: &Self::Response) -> Result<Vec<u8>, SurveyError> {
        encode(Self::OP, response)
    }

    fn response_from_payload(data: &[u8]) -> Result<Self::Response, SurveyError> {
        decode(Self::OP, data)
    }
}

fn encode<T: Serialize>(op: &'static str, value: &T) -> Result<Vec<u8>, SurveyError> {
    serde_json::to_vec(value).map_err(|source| SurveyError::Encode { op, source })
}

fn decode<T: DeserializeOwned>(op: &'static str, data: &[u8]) -> Result<T, SurveyError> {
    serde_json::from_slice(data).map_err(|source| SurveyError::Decode { op, source })
}

/// Ask a node which channels it manages for an organization
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeManagedChannelsRequest {
    pub org_id: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeManagedChannelsResponse {
    pub channels: Vec<ManagedChannel>,
}

impl SurveyOperation for NodeManagedChannelsRequest {
    type Response = NodeManagedChannelsResponse;

    const OP: &'static str = MANAGED_STREAMS_CALL;
}

/// Subscribe on behalf of a user through the channel's leader node
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSubscribeStreamRequest {
    #[serde(rename = "org")]
    pub org_id: i64,
    /// Zero for anonymous subscribers
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub channel: String,
    #[serde(rename = "leaderNodeId")]
    pub leader_node_id: String,
    #[serde(rename = "leadershipId")]
    pub leadership_id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSubscribeStreamResponse {
    #[serde(skip_serializing_if = "SubscribeStatus::is_ok")]
    pub status: SubscribeStatus,
    pub reply: SubscribeReply,
}

impl SurveyOperation for PluginSubscribeStreamRequest {
    type Response = PluginSubscribeStreamResponse;

    const OP: &'static str = PLUGIN_SUBSCRIBE_STREAM;
}
