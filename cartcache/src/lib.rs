#![deny(clippy::all)]

//! Per-session cart cache: ordered cart line items stored in a remote list
//! store under an opaque key, with a TTL refreshed on every write.

pub mod cart_operations;
pub mod codec;
pub mod context;
pub mod domain;
pub mod ports;

pub use cart_operations::CartCacheService;
pub use context::Context;
pub use domain::CartItem;
pub use ports::{CartCache, ListRange, ListStore};
pub use shared::{Error, Result};
