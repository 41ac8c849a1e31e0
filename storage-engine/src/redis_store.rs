use async_trait::async_trait;
use cartcache::Context;
use cartcache::ports::{ListRange, ListStore};
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use shared::{Error, Result};
use std::fmt::Debug;
use std::time::Duration;
use tracing::{debug, info};

/// Redis-backed list store
///
/// Holds one multiplexed connection; each call works on a cheap clone of it,
/// so the store can serve concurrent operations without locking.
pub struct RedisListStore {
    conn: MultiplexedConnection,
    address: String,
}

impl RedisListStore {
    /// Open a connection to `host` within the lifetime of `ctx`.
    ///
    /// `host` is either `host:port` or a full `redis://`/`rediss://` URL. A
    /// connection that cannot be established before `ctx` ends is reported
    /// as [`Error::Connectivity`]. Liveness is left to [`ListStore::ping`].
    pub async fn connect(ctx: &Context, host: &str) -> Result<Self> {
        let url = connection_url(host);
        let client = redis::Client::open(url.as_str())
            .map_err(|e| Error::Config(format!("invalid cache address {host:?}: {e}")))?;

        let conn = ctx
            .run(async {
                client
                    .get_multiplexed_async_connection()
                    .await
                    .map_err(|e| Error::Connectivity(e.to_string()))
            })
            .await
            .map_err(|e| match e {
                Error::Connectivity(msg) => Error::Connectivity(format!("{host}: {msg}")),
                other => Error::Connectivity(format!("{host}: {other}")),
            })?;

        info!(address = host, "connected to redis");
        Ok(Self {
            conn,
            address: host.to_string(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn connection(&self) -> MultiplexedConnection {
        self.conn.clone()
    }
}

fn connection_url(host: &str) -> String {
    if host.contains("://") {
        host.to_string()
    } else {
        format!("redis://{host}")
    }
}

fn transport(err: redis::RedisError) -> Error {
    Error::Transport(err.to_string())
}

#[async_trait]
impl ListStore for RedisListStore {
    async fn append(&self, key: &str, value: String) -> Result<()> {
        let mut conn = self.connection();
        let len: i64 = conn.rpush(key, value).await.map_err(transport)?;
        debug!(key, len, "RPUSH");
        Ok(())
    }

    async fn range(&self, key: &str) -> Result<ListRange> {
        let mut conn = self.connection();
        let items: Vec<String> = conn.lrange(key, 0, -1).await.map_err(transport)?;
        // Redis drops a list once its last element goes, so empty means absent.
        if items.is_empty() {
            Ok(ListRange::Absent)
        } else {
            Ok(ListRange::Found(items))
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection();
        let removed: i64 = conn.del(key).await.map_err(transport)?;
        Ok(removed > 0)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.connection();
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let applied: bool = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(millis)
            .query_async(&mut conn)
            .await
            .map_err(transport)?;
        Ok(applied)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection();
        let _pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(transport)?;
        Ok(())
    }
}

impl Debug for RedisListStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisListStore")
            .field("address", &self.address)
            .finish()
    }
}
