// In-memory identity store
// Resolves users per organization for channel handlers

use std::sync::Arc;

use dashmap::DashMap;

use chorus_common::{ChorusError, IdentityLookup, SignedInUser};

#[derive(Clone, Default)]
pub struct MemoryIdentityStore {
    users: Arc<DashMap<(i64, i64), SignedInUser>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a user, keyed by its org and user ID
    pub fn insert(&self, user: SignedInUser) {
        self.users.insert((user.org_id, user.user_id), user);
    }

    pub fn remove(&self, org_id: i64, user_id: i64) -> Option<SignedInUser> {
        self.users.remove(&(org_id, user_id)).map(|(_, user)| user)
    }
}

#[async_trait::async_trait]
impl IdentityLookup for MemoryIdentityStore {
    async fn get_signed_in_user(&self, user_id: i64, org_id: i64) -> anyhow::Result<SignedInUser> {
        self.users
            .get(&(org_id, user_id))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ChorusError::UserNotExist { user_id, org_id }.into())
    }
}
