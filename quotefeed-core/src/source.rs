//! Upstream quote source abstraction

use async_trait::async_trait;
use bytes::Bytes;

use crate::FeedError;

/// A live source of serialized quote documents.
///
/// Network, HTTP-status and parse failures are all reported as fetch
/// errors; callers fall through to their next data source without
/// inspecting the cause.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetch the current quote document for the given symbol lists.
    async fn fetch_live(&self, fsyms: &[String], tsyms: &[String]) -> Result<Bytes, FeedError>;
}
