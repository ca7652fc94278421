//! Ports implemented by portal providers, plus the error taxonomy the
//! pipeline surfaces to consumers.

use async_trait::async_trait;
use reqwest::Error as ReqwestError;

use crate::model::AddressQuery;

#[derive(thiserror::Error, Debug)]
/// Errors surfaced by the collection pipeline.
pub enum PortError {
    /// The network layer failed: connect, timeout, HTTP status, body decode.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// The portal answered, but the schedule fragment carries no feed link
    /// the pipeline recognizes. In practice this means the address is not one
    /// the portal serves.
    #[error("Address not recognized by the portal")]
    InvalidAddress,
    /// The downloaded feed is not a usable calendar document.
    #[error("Calendar parse error: {0}")]
    Parse(String),
    /// An internal invariant broke.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[async_trait]
/// Address lookups backing the guided setup flow.
///
/// Both lookups degrade to an empty list instead of raising: an empty result
/// tells the caller to fall back to free-text entry. Failures are logged by
/// the implementation, never propagated.
pub trait AddressDirectory: Send + Sync {
    /// Street names known to the portal picker, deduplicated and sorted.
    async fn streets(&self) -> Vec<String>;

    /// Civic numbers the portal lists for a street, in source order.
    async fn civic_numbers(&self, street: &str) -> Vec<String>;
}

#[async_trait]
/// Locates and downloads the personalized calendar feed for an address.
pub trait FeedSource: Send + Sync {
    /// Fetch the raw feed bytes for the given address.
    ///
    /// Returns `Ok(None)` when the portal publishes no schedule fragment for
    /// the address at all; that is "no data", not a failure, and the caller
    /// turns it into an empty snapshot.
    ///
    /// # Errors
    ///
    /// [`PortError::Network`] on transport failure at any step, and
    /// [`PortError::InvalidAddress`] when the fragment exists but carries no
    /// recognizable feed link.
    async fn fetch_feed(&self, query: &AddressQuery) -> Result<Option<Vec<u8>>, PortError>;
}
