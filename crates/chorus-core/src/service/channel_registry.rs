// Registry for channel handlers keyed by channel pattern
// Resolves a channel name to the handler registered for its scope and namespace

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{info, warn};

use chorus_common::{Channel, ChannelHandler, ChannelHandlerGetter, ChorusError, SignedInUser};

/// Namespace pattern matching every namespace within a scope
pub const ANY_NAMESPACE: &str = "*";

/// Channel handler registry
///
/// Handlers register under `(scope, namespace)`; the namespace may be
/// [`ANY_NAMESPACE`]. An exact namespace match wins over the wildcard.
#[derive(Clone, Default)]
pub struct ChannelHandlerRegistry {
    handlers: Arc<DashMap<(String, String), Arc<dyn ChannelHandler>>>,
}

impl ChannelHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any existing one for the same pattern
    pub fn register(&self, scope: &str, namespace: &str, handler: Arc<dyn ChannelHandler>) {
        info!(
            scope = %scope,
            namespace = %namespace,
            "Registering channel handler for '{}/{}'",
            scope,
            namespace
        );
        self.handlers
            .insert((scope.to_string(), namespace.to_string()), handler);
    }

    pub fn unregister(&self, scope: &str, namespace: &str) -> bool {
        let removed = self
            .handlers
            .remove(&(scope.to_string(), namespace.to_string()))
            .is_some();
        if !removed {
            warn!(
                scope = %scope,
                namespace = %namespace,
                "Attempted to unregister non-existent channel handler"
            );
        }
        removed
    }

    /// Handler for a parsed channel, if one is registered
    pub fn lookup(&self, channel: &Channel) -> Option<Arc<dyn ChannelHandler>> {
        self.handlers
            .get(&(channel.scope.clone(), channel.namespace.clone()))
            .or_else(|| {
                self.handlers
                    .get(&(channel.scope.clone(), ANY_NAMESPACE.to_string()))
            })
            .map(|entry| entry.value().clone())
    }

    /// Registered patterns as `scope/namespace`, sorted
    pub fn patterns(&self) -> Vec<String> {
        let mut patterns: Vec<String> = self
            .handlers
            .iter()
            .map(|e| format!("{}/{}", e.key().0, e.key().1))
            .collect();
        patterns.sort();
        patterns
    }
}

#[async_trait::async_trait]
impl ChannelHandlerGetter for ChannelHandlerRegistry {
    async fn get_channel_handler(
        &self,
        _user: &SignedInUser,
        channel: &str,
    ) -> anyhow::Result<(Arc<dyn ChannelHandler>, Channel)> {
        let parsed = Channel::parse(channel)?;
        let handler = self
            .lookup(&parsed)
            .ok_or_else(|| ChorusError::HandlerNotFound(channel.to_string()))?;
        Ok((handler, parsed))
    }
}

#[cfg(test)]
mod tests {
    use chorus_common::{SubscribeEvent, SubscribeReply, SubscribeStatus};

    use super::*;

    /// Answers with a fixed status so tests can tell handlers apart
    struct StatusHandler(SubscribeStatus);

    #[async_trait::async_trait]
    impl ChannelHandler for StatusHandler {
        async fn on_subscribe(
            &self,
            _user: &SignedInUser,
            _event: SubscribeEvent,
        ) -> anyhow::Result<(SubscribeReply, SubscribeStatus)> {
            Ok((SubscribeReply::default(), self.0))
        }
    }

    async fn status_for(registry: &ChannelHandlerRegistry, channel: &str) -> SubscribeStatus {
        let user = SignedInUser::anonymous(1);
        let (handler, parsed) = registry.get_channel_handler(&user, channel).await.unwrap();
        let (_, status) = handler
            .on_subscribe(
                &user,
                SubscribeEvent {
                    channel: channel.to_string(),
                    path: parsed.path,
                    leadership_id: String::new(),
                },
            )
            .await
            .unwrap();
        status
    }

    #[tokio::test]
    async fn test_exact_namespace_wins_over_wildcard() {
        let registry = ChannelHandlerRegistry::new();
        registry.register("plugin", ANY_NAMESPACE, Arc::new(StatusHandler(SubscribeStatus::NotFound)));
        registry.register("plugin", "testdata", Arc::new(StatusHandler(SubscribeStatus::Ok)));

        assert_eq!(status_for(&registry, "plugin/testdata/random").await, SubscribeStatus::Ok);
        assert_eq!(
            status_for(&registry, "plugin/other/random").await,
            SubscribeStatus::NotFound
        );
        assert_eq!(registry.patterns(), vec!["plugin/*", "plugin/testdata"]);
    }

    #[tokio::test]
    async fn test_unknown_scope() {
        let registry = ChannelHandlerRegistry::new();
        registry.register("plugin", ANY_NAMESPACE, Arc::new(StatusHandler(SubscribeStatus::Ok)));

        let err = registry
            .get_channel_handler(&SignedInUser::anonymous(1), "stream/a/b")
            .await
            .err()
            .unwrap();
        assert_eq!(
            err.downcast_ref::<ChorusError>(),
            Some(&ChorusError::HandlerNotFound("stream/a/b".to_string()))
        );
    }

    #[tokio::test]
    async fn test_invalid_channel() {
        let registry = ChannelHandlerRegistry::new();
        let err = registry
            .get_channel_handler(&SignedInUser::anonymous(1), "plugin/only")
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<ChorusError>(),
            Some(ChorusError::InvalidChannel(_))
        ));
    }

    #[test]
    fn test_unregister() {
        let registry = ChannelHandlerRegistry::new();
        registry.register("plugin", "testdata", Arc::new(StatusHandler(SubscribeStatus::Ok)));
        assert!(registry.unregister("plugin", "testdata"));
        assert!(!registry.unregister("plugin", "testdata"));
        assert!(registry.patterns().is_empty());
    }
}
