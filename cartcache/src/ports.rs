use crate::context::Context;
use crate::domain::CartItem;
use async_trait::async_trait;
use shared::Result;
use std::time::Duration;

// Ports are the pluggable extension points for the remote list store and for
// consumers of the cart cache

/// Outcome of reading a whole list from the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListRange {
    Found(Vec<String>),
    Absent,
}

/// Port for a remote list-oriented key-value store (e.g. Redis)
///
/// Implementations must be safe to share between concurrent operations.
#[async_trait]
pub trait ListStore: Send + Sync + 'static {
    /// Push `value` onto the tail of the list at `key`, creating it if needed
    async fn append(&self, key: &str, value: String) -> Result<()>;

    /// Read every element of the list at `key`, head first
    async fn range(&self, key: &str) -> Result<ListRange>;

    /// Remove `key`, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Set the key's time-to-live, returning false if the key does not exist
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Liveness check
    async fn ping(&self) -> Result<()>;
}

/// The capability set the cart service consumes
#[async_trait]
pub trait CartCache: Send + Sync + 'static {
    /// Append `items` to the cart at `key` and reset its TTL
    async fn add(&self, ctx: &Context, key: &str, items: &[CartItem]) -> Result<()>;

    /// Fetch the cart at `key`, or [`shared::Error::NotFound`]
    async fn get(&self, ctx: &Context, key: &str) -> Result<Vec<CartItem>>;

    /// Drop the cart at `key`, returning whether it existed
    async fn remove(&self, ctx: &Context, key: &str) -> Result<bool>;
}
