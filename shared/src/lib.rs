// shared/src/lib.rs

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("not found")]
    NotFound,
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("store unreachable: {0}")]
    Connectivity(String),
    #[error("encoding: {0}")]
    Encoding(String),
    #[error("decoding: {0}")]
    Decoding(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error("context cancelled")]
    Cancelled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }

    /// Errors that can only come out of startup and leave no usable cache behind.
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Connectivity(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod config;
pub mod duration;

pub use config::CacheConfig;
pub use duration::parse_duration;
