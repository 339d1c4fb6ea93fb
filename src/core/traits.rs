//! Core traits for prokit components
//!
//! These are the seams where the helpers meet the outside world: the wire
//! (`Transport`) and a key/value store (`Storage`).

use async_trait::async_trait;

use super::error::ProKitResult;
use crate::http::transport::{TransportError, TransportRequest, TransportResponse};

/// Trait for sending a fully resolved request over the wire
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and hand back the parsed response.
    ///
    /// Implementations report failures (network, timeout, non-accepted status)
    /// as `TransportError`; they never see cancellation tokens, the
    /// orchestrator races those itself.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// Trait for a string key/value store, shaped after Web Storage
pub trait Storage: Send + Sync {
    /// Get the raw value stored under `key`
    fn get_item(&self, key: &str) -> Option<String>;

    /// Insert or overwrite a value
    fn set_item(&self, key: &str, value: &str) -> ProKitResult<()>;

    /// Remove a value, no-op if missing
    fn remove_item(&self, key: &str);

    /// List all keys currently stored
    fn keys(&self) -> Vec<String>;
}
