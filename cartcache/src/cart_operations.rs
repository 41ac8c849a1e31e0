use crate::codec::{decode_items, encode_item};
use crate::context::Context;
use crate::domain::CartItem;
use crate::ports::{CartCache, ListRange, ListStore};
use async_trait::async_trait;
use shared::{CacheConfig, Error, Result};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Cart cache backed by a [`ListStore`]
///
/// Holds no cart data itself; the store owns every entry and its expiry.
pub struct CartCacheService<S: ListStore> {
    store: Arc<S>,
    ttl: Duration,
}

impl<S: ListStore> CartCacheService<S> {
    pub fn new(store: Arc<S>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Validate `config` and verify the store answers before handing out a cache.
    ///
    /// The liveness check runs under `ctx`; a store that does not answer in
    /// time is reported as unreachable.
    pub async fn init(ctx: &Context, config: &CacheConfig, store: Arc<S>) -> Result<Self> {
        let ttl = config.validate()?;
        ctx.run(store.ping()).await.map_err(|e| match e {
            Error::Connectivity(_) => e,
            other => Error::Connectivity(format!("{}: {other}", config.host)),
        })?;
        info!(host = %config.host, ttl = ?ttl, "cart cache ready");
        Ok(Self::new(store, ttl))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

impl<S: ListStore> Clone for CartCacheService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ttl: self.ttl,
        }
    }
}

impl<S: ListStore> Debug for CartCacheService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartCacheService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<S: ListStore> CartCache for CartCacheService<S> {
    /// Appends are issued one at a time in order. The first failure is
    /// returned as is; earlier items stay in the store and the TTL is left
    /// untouched.
    async fn add(&self, ctx: &Context, key: &str, items: &[CartItem]) -> Result<()> {
        for (index, item) in items.iter().enumerate() {
            let encoded = encode_item(item)?;
            if let Err(e) = ctx.run(self.store.append(key, encoded)).await {
                debug!(key, index, error = %e, "cart append failed");
                return Err(e);
            }
        }

        // An empty add only refreshes the TTL of an existing cart.
        let refreshed = ctx.run(self.store.expire(key, self.ttl)).await?;
        debug!(key, items = items.len(), refreshed, "cart items added");
        Ok(())
    }

    async fn get(&self, ctx: &Context, key: &str) -> Result<Vec<CartItem>> {
        match ctx.run(self.store.range(key)).await? {
            ListRange::Absent => {
                debug!(key, "cart miss");
                Err(Error::NotFound)
            }
            ListRange::Found(raw) => {
                let cart = decode_items(&raw)?;
                debug!(key, items = cart.len(), "cart hit");
                Ok(cart)
            }
        }
    }

    async fn remove(&self, ctx: &Context, key: &str) -> Result<bool> {
        let existed = ctx.run(self.store.delete(key)).await?;
        debug!(key, existed, "cart removed");
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Append(String, String),
        Range(String),
        Delete(String),
        Expire(String, Duration),
        Ping,
    }

    /// Minimal list store that records calls and can be told to fail or stall
    #[derive(Default)]
    struct FakeStore {
        lists: Mutex<HashMap<String, Vec<String>>>,
        calls: Mutex<Vec<Call>>,
        fail_append_at: Option<usize>,
        stall_appends: bool,
        stall_reads: bool,
        down: bool,
    }

    impl FakeStore {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn raw(&self, key: &str) -> Option<Vec<String>> {
            self.lists.lock().unwrap().get(key).cloned()
        }

        fn record(&self, call: Call) -> usize {
            let mut calls = self.calls.lock().unwrap();
            calls.push(call);
            calls
                .iter()
                .filter(|c| matches!(c, Call::Append(..)))
                .count()
        }
    }

    #[async_trait]
    impl ListStore for FakeStore {
        async fn append(&self, key: &str, value: String) -> Result<()> {
            let appends = self.record(Call::Append(key.to_string(), value.clone()));
            if self.stall_appends {
                std::future::pending::<()>().await;
            }
            if self.fail_append_at == Some(appends) {
                return Err(Error::Transport("connection reset".into()));
            }
            self.lists
                .lock()
                .unwrap()
                .entry(key.to_string())
                .or_default()
                .push(value);
            Ok(())
        }

        async fn range(&self, key: &str) -> Result<ListRange> {
            self.record(Call::Range(key.to_string()));
            if self.stall_reads {
                std::future::pending::<()>().await;
            }
            Ok(match self.raw(key) {
                Some(items) => ListRange::Found(items),
                None => ListRange::Absent,
            })
        }

        async fn delete(&self, key: &str) -> Result<bool> {
            self.record(Call::Delete(key.to_string()));
            Ok(self.lists.lock().unwrap().remove(key).is_some())
        }

        async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
            self.record(Call::Expire(key.to_string(), ttl));
            Ok(self.lists.lock().unwrap().contains_key(key))
        }

        async fn ping(&self) -> Result<()> {
            self.record(Call::Ping);
            if self.stall_reads {
                std::future::pending::<()>().await;
            }
            if self.down {
                return Err(Error::Transport("connection refused".into()));
            }
            Ok(())
        }
    }

    const TTL: Duration = Duration::from_secs(1800);

    fn service(store: FakeStore) -> CartCacheService<FakeStore> {
        CartCacheService::new(Arc::new(store), TTL)
    }

    fn items() -> Vec<CartItem> {
        vec![
            CartItem::new("OLJCESPC7Z", 1),
            CartItem::new("66VCHSJNUP", 2),
            CartItem::new("1YMWWN1N4O", 3),
        ]
    }

    #[tokio::test]
    async fn test_add_then_get_preserves_order() {
        let cache = service(FakeStore::default());
        let ctx = Context::background();

        cache.add(&ctx, "user-1", &items()).await.unwrap();
        assert_eq!(cache.get(&ctx, "user-1").await.unwrap(), items());
    }

    #[tokio::test]
    async fn test_add_appends_sequentially_then_expires() {
        let cache = service(FakeStore::default());
        cache
            .add(&Context::background(), "user-1", &items()[..2])
            .await
            .unwrap();

        let calls = cache.store().calls();
        assert_eq!(calls.len(), 3);
        assert!(
            matches!(&calls[0], Call::Append(k, v) if k == "user-1" && v.contains("OLJCESPC7Z"))
        );
        assert!(matches!(&calls[1], Call::Append(_, v) if v.contains("66VCHSJNUP")));
        assert_eq!(calls[2], Call::Expire("user-1".into(), TTL));
    }

    #[tokio::test]
    async fn test_second_add_concatenates() {
        let cache = service(FakeStore::default());
        let ctx = Context::background();
        let all = items();

        cache.add(&ctx, "user-1", &all[..1]).await.unwrap();
        cache.add(&ctx, "user-1", &all[1..]).await.unwrap();

        assert_eq!(cache.get(&ctx, "user-1").await.unwrap(), all);
        let expires = cache
            .store()
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Expire(..)))
            .count();
        assert_eq!(expires, 2);
    }

    #[tokio::test]
    async fn test_empty_add_only_refreshes_ttl() {
        let cache = service(FakeStore::default());
        cache.add(&Context::background(), "user-1", &[]).await.unwrap();

        assert_eq!(
            cache.store().calls(),
            vec![Call::Expire("user-1".into(), TTL)]
        );
        assert!(cache.store().raw("user-1").is_none());
    }

    #[tokio::test]
    async fn test_failed_append_leaves_partial_list_and_skips_expire() {
        let cache = service(FakeStore {
            fail_append_at: Some(3),
            ..Default::default()
        });

        let err = cache
            .add(&Context::background(), "user-1", &items())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));

        assert_eq!(cache.store().raw("user-1").unwrap().len(), 2);
        assert!(
            !cache
                .store()
                .calls()
                .iter()
                .any(|c| matches!(c, Call::Expire(..)))
        );
    }

    #[tokio::test]
    async fn test_get_absent_is_not_found() {
        let cache = service(FakeStore::default());
        let err = cache.get(&Context::background(), "nobody").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_get_existing_empty_list_is_empty_success() {
        let store = FakeStore::default();
        store.lists.lock().unwrap().insert("user-1".into(), Vec::new());
        let cache = service(store);

        assert!(cache.get(&Context::background(), "user-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_with_corrupt_element_fails_without_partial_result() {
        let store = FakeStore::default();
        store.lists.lock().unwrap().insert(
            "user-1".into(),
            vec![
                encode_item(&CartItem::new("A", 1)).unwrap(),
                "{broken".into(),
            ],
        );
        let cache = service(store);

        let err = cache.get(&Context::background(), "user-1").await.unwrap_err();
        assert!(matches!(err, Error::Decoding(_)));
    }

    #[tokio::test]
    async fn test_remove_then_get_is_not_found() {
        let cache = service(FakeStore::default());
        let ctx = Context::background();

        cache.add(&ctx, "user-1", &items()).await.unwrap();
        assert!(cache.remove(&ctx, "user-1").await.unwrap());
        assert!(cache.get(&ctx, "user-1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_remove_absent_reports_false() {
        let cache = service(FakeStore::default());
        assert!(!cache.remove(&Context::background(), "nobody").await.unwrap());
    }

    #[tokio::test]
    async fn test_cancelled_context_issues_no_calls() {
        let cache = service(FakeStore::default());
        let ctx = Context::background();
        ctx.cancel();

        let err = cache.add(&ctx, "user-1", &items()).await.unwrap_err();
        assert_eq!(err, Error::Cancelled);
        assert!(cache.store().calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_aborts_stalled_append() {
        let cache = service(FakeStore {
            stall_appends: true,
            ..Default::default()
        });
        let ctx = Context::with_timeout(Duration::from_millis(100));

        let err = cache.add(&ctx, "user-1", &items()).await.unwrap_err();
        assert_eq!(err, Error::DeadlineExceeded);
        assert_eq!(cache.store().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_init_validates_config_before_ping() {
        let store = Arc::new(FakeStore::default());
        let config = CacheConfig::new("localhost:6379", "notaduration");
        let err = CartCacheService::init(&Context::background(), &config, store.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_init_fails_when_store_unreachable() {
        let store = Arc::new(FakeStore {
            down: true,
            ..Default::default()
        });
        let err = CartCacheService::init(
            &Context::background(),
            &CacheConfig::new("localhost:6379", "30s"),
            store,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Connectivity(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_fails_when_store_never_answers() {
        let store = Arc::new(FakeStore {
            stall_reads: true,
            ..Default::default()
        });
        let err = CartCacheService::init(
            &Context::with_timeout(Duration::from_secs(5)),
            &CacheConfig::new("localhost:6379", "30s"),
            store.clone(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Connectivity(_)), "got {err:?}");
        assert_eq!(store.calls(), vec![Call::Ping]);
    }

    #[tokio::test]
    async fn test_external_token_cancels_stalled_get() {
        let cache = service(FakeStore {
            stall_reads: true,
            ..Default::default()
        });
        let token = CancellationToken::new();
        let ctx = Context::with_cancellation(token.clone());
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            token.cancel();
        });

        let err = cache.get(&ctx, "user-1").await.unwrap_err();
        assert_eq!(err, Error::Cancelled);
        assert!(ctx.token().is_cancelled());
        assert_eq!(cache.store().calls(), vec![Call::Range("user-1".into())]);
    }

    #[tokio::test]
    async fn test_init_uses_configured_ttl() {
        let store = Arc::new(FakeStore::default());
        let cache = CartCacheService::init(
            &Context::background(),
            &CacheConfig::new("localhost:6379", "30s"),
            store,
        )
        .await
        .unwrap();
        assert_eq!(cache.ttl(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_usable_as_trait_object() {
        let cache: Arc<dyn CartCache> = Arc::new(service(FakeStore::default()));
        let ctx = Context::background();
        cache.add(&ctx, "user-1", &items()[..1]).await.unwrap();
        assert_eq!(cache.get(&ctx, "user-1").await.unwrap().len(), 1);
    }
}
