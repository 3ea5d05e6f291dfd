//! Error types for nft-prefix-import.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Unexpected HTTP status {status} from {url} (expected 200)")]
    FetchStatus { url: String, status: u16 },

    #[error("Routing table too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: u64, max: usize },

    #[error("Invalid prefix '{prefix}': {reason}")]
    InvalidPrefix { prefix: String, reason: String },

    #[error("Invalid nftables name '{0}'")]
    InvalidName(String),

    #[error("Refusing unsafe nftables element: {0}")]
    UnsafeElement(String),

    #[error("Invalid user agent: {0}")]
    InvalidUserAgent(String),
}
