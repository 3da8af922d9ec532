// Shared data model
// Identities, managed channels, and the subscribe event/reply exchanged with channel handlers

use serde::{Deserialize, Serialize};

/// Resolved user/session identity a channel handler authorizes against.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignedInUser {
    pub org_id: i64,
    pub user_id: i64,
    pub login: String,
    pub name: String,
    pub org_role: String,
}

impl SignedInUser {
    /// Minimal identity carrying only the organization
    pub fn anonymous(org_id: i64) -> Self {
        Self {
            org_id,
            ..Default::default()
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id <= 0
    }
}

/// A channel whose message flow a node tracks locally.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagedChannel {
    pub channel: String,
    /// Messages per minute observed on this node
    #[serde(rename = "minute_rate", alias = "minuteRate")]
    pub minute_rate: f64,
    /// Last payload seen on the channel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ManagedChannel {
    pub fn new(channel: impl Into<String>, minute_rate: f64) -> Self {
        Self {
            channel: channel.into(),
            minute_rate,
            data: None,
        }
    }
}

/// Outcome of a channel subscribe callback.
///
/// Encoded as a bare integer on the wire. Codes this node does not know
/// decode as `Other` so replies from newer nodes stay readable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", from = "i32")]
pub enum SubscribeStatus {
    #[default]
    Ok,
    NotFound,
    PermissionDenied,
    Other(i32),
}

impl SubscribeStatus {
    pub fn code(self) -> i32 {
        match self {
            SubscribeStatus::Ok => 0,
            SubscribeStatus::NotFound => 1,
            SubscribeStatus::PermissionDenied => 2,
            SubscribeStatus::Other(code) => code,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code() == 0
    }
}

impl From<SubscribeStatus> for i32 {
    fn from(status: SubscribeStatus) -> Self {
        status.code()
    }
}

impl From<i32> for SubscribeStatus {
    fn from(code: i32) -> Self {
        match code {
            0 => SubscribeStatus::Ok,
            1 => SubscribeStatus::NotFound,
            2 => SubscribeStatus::PermissionDenied,
            other => SubscribeStatus::Other(other),
        }
    }
}

impl std::fmt::Display for SubscribeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscribeStatus::Ok => write!(f, "OK"),
            SubscribeStatus::NotFound => write!(f, "NOT_FOUND"),
            SubscribeStatus::PermissionDenied => write!(f, "PERMISSION_DENIED"),
            SubscribeStatus::Other(code) => write!(f, "STATUS_{}", code),
        }
    }
}

/// Reply produced by a channel handler when a subscription is accepted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubscribeReply {
    pub presence: bool,
    pub join_leave: bool,
    pub recover: bool,
    /// Initial data pushed to the subscriber
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Subscribe request handed to a channel handler.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubscribeEvent {
    pub channel: String,
    pub path: String,
    /// Leadership the subscribe was authorized under, for handlers that perform
    /// further fenced operations
    pub leadership_id: String,
}

/// Current leader of a channel as reported by the leader store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeaderInfo {
    pub node_id: String,
    pub leadership_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_user() {
        let user = SignedInUser::anonymous(3);
        assert_eq!(user.org_id, 3);
        assert_eq!(user.user_id, 0);
        assert!(user.is_anonymous());
    }

    #[test]
    fn test_subscribe_status_wire_code() {
        assert_eq!(serde_json::to_string(&SubscribeStatus::Ok).unwrap(), "0");
        assert_eq!(
            serde_json::to_string(&SubscribeStatus::PermissionDenied).unwrap(),
            "2"
        );
        let status: SubscribeStatus = serde_json::from_str("1").unwrap();
        assert_eq!(status, SubscribeStatus::NotFound);

        let unknown: SubscribeStatus = serde_json::from_str("9").unwrap();
        assert_eq!(unknown, SubscribeStatus::Other(9));
        assert_eq!(serde_json::to_string(&unknown).unwrap(), "9");
        assert_eq!(SubscribeStatus::from(0), SubscribeStatus::Ok);
    }

    #[test]
    fn test_managed_channel_omits_missing_data() {
        let ch = ManagedChannel::new("stream/a/b", 12.0);
        let json = serde_json::to_value(&ch).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"channel": "stream/a/b", "minute_rate": 12.0})
        );
    }

    #[test]
    fn test_subscribe_reply_tolerates_missing_fields() {
        let reply: SubscribeReply = serde_json::from_str(r#"{"presence":true,"extra":1}"#).unwrap();
        assert!(reply.presence);
        assert!(!reply.join_leave);
        assert!(reply.data.is_none());
    }
}
