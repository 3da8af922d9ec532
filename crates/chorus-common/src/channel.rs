//! Channel addressing
//!
//! Channels are named `scope/namespace/path`. The path may itself contain
//! slashes; scope and namespace may not.

use std::sync::LazyLock;

use crate::error::ChorusError;

/// Characters allowed anywhere in a channel name
static VALID_CHANNEL: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^[A-Za-z0-9_\-/=.]*$").expect("Invalid regex pattern"));

/// A parsed channel name
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Channel {
    pub scope: String,
    pub namespace: String,
    pub path: String,
}

impl Channel {
    /// Parse and validate a channel name
    ///
    /// # Examples
    ///
    /// ```
    /// use chorus_common::Channel;
    ///
    /// let ch = Channel::parse("plugin/testdata/random-2s-stream").unwrap();
    /// assert_eq!(ch.scope, "plugin");
    /// assert_eq!(ch.namespace, "testdata");
    /// assert_eq!(ch.path, "random-2s-stream");
    ///
    /// assert!(Channel::parse("plugin/testdata").is_err());
    /// ```
    pub fn parse(name: &str) -> Result<Self, ChorusError> {
        let mut parts = name.splitn(3, '/');
        let channel = Channel {
            scope: parts.next().unwrap_or_default().to_string(),
            namespace: parts.next().unwrap_or_default().to_string(),
            path: parts.next().unwrap_or_default().to_string(),
        };

        if !channel.is_valid() || !VALID_CHANNEL.is_match(name) {
            return Err(ChorusError::InvalidChannel(name.to_string()));
        }

        Ok(channel)
    }

    pub fn is_valid(&self) -> bool {
        !self.scope.is_empty() && !self.namespace.is_empty() && !self.path.is_empty()
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.scope, self.namespace, self.path)
    }
}

impl std::str::FromStr for Channel {
    type Err = ChorusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::parse(s)
    }
}
