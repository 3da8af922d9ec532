//! Org scoping helpers
//!
//! Channels are stored in org-agnostic form by clients; cluster-wide stores
//! (leader election, presence) key them as `{orgId}/{channel}`.

use crate::error::ChorusError;

/// Prefix a channel with its organization ID
///
/// # Examples
///
/// ```
/// use chorus_common::prepend_org_id;
///
/// assert_eq!(prepend_org_id(1, "plugin/testdata/random"), "1/plugin/testdata/random");
/// ```
pub fn prepend_org_id(org_id: i64, channel: &str) -> String {
    format!("{}/{}", org_id, channel)
}

/// Split an org scoped channel back into its organization ID and channel
pub fn strip_org_id(scoped: &str) -> Result<(i64, &str), ChorusError> {
    let (org, channel) = scoped
        .split_once('/')
        .ok_or_else(|| ChorusError::InvalidScopedChannel(scoped.to_string()))?;

    let org_id = org
        .parse::<i64>()
        .map_err(|_| ChorusError::InvalidScopedChannel(scoped.to_string()))?;

    Ok((org_id, channel))
}
