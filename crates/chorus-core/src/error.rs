//! Survey error taxonomy
//!
//! Every variant stays local to the node that raised it. The dispatcher
//! collapses them all into a bare failure code before replying to a peer.

use std::time::Duration;

use crate::transport::TransportError;

#[derive(thiserror::Error, Debug)]
pub enum SurveyError {
    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("decode {op} payload: {source}")]
    Decode {
        op: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("encode {op} payload: {source}")]
    Encode {
        op: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("error checking leader: {0}")]
    LeaderCheck(#[source] anyhow::Error),

    #[error("error checking leader: timed out after {0:?}")]
    LeaderCheckTimeout(Duration),

    #[error("leader changed for channel '{0}'")]
    LeaderChanged(String),

    #[error("error getting signed in user: {0}")]
    Identity(#[source] anyhow::Error),

    #[error("error getting channel handler: {0}")]
    ChannelResolution(#[source] anyhow::Error),

    #[error("error calling subscribe handler: {0}")]
    Subscribe(#[source] anyhow::Error),

    #[error(transparent)]
    ManagedChannels(anyhow::Error),

    #[error("survey error: {0}")]
    Transport(#[from] TransportError),

    #[error("survey {op} timed out after {timeout:?}")]
    SurveyTimeout { op: &'static str, timeout: Duration },

    #[error("unexpected survey code: {0}")]
    UnexpectedCode(u32),

    #[error("leader node not responded")]
    LeaderNodeNotResponded,
}

impl SurveyError {
    /// Fencing rejection rather than a fault
    pub fn is_leader_changed(&self) -> bool {
        matches!(self, SurveyError::LeaderChanged(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SurveyError::LeaderNodeNotResponded.to_string(),
            "leader node not responded"
        );
        assert_eq!(
            SurveyError::UnexpectedCode(1).to_string(),
            "unexpected survey code: 1"
        );
        assert_eq!(
            SurveyError::Transport(TransportError::NoNodesReachable).to_string(),
            "survey error: no nodes reachable"
        );
        assert!(SurveyError::LeaderChanged("a/b/c".to_string()).is_leader_changed());
        assert!(!SurveyError::LeaderNodeNotResponded.is_leader_changed());
    }
}
