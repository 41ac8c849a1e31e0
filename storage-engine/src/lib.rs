//! List store adapters for the cart cache.

pub mod memory_store;
pub mod redis_store;

pub use memory_store::MemoryListStore;
pub use redis_store::RedisListStore;

use cartcache::{CartCacheService, Context};
use shared::{CacheConfig, Result};
use std::sync::Arc;

/// Build a Redis-backed cart cache from configuration.
///
/// The TTL is validated before any connection attempt. Connecting and the
/// liveness check both run under `ctx`; a store that is unreachable or does
/// not answer before `ctx` ends fails startup, there is no retry.
pub async fn redis_cart_cache(
    ctx: &Context,
    config: &CacheConfig,
) -> Result<CartCacheService<RedisListStore>> {
    config.validate()?;
    let store = RedisListStore::connect(ctx, &config.host).await?;
    CartCacheService::init(ctx, config, Arc::new(store)).await
}
