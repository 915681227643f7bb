use std::time::Duration;

use async_trait::async_trait;

use crate::{CreaseError, ProxyRecord, SourceId};

/// Read-only view of a fetched page that can evaluate extraction rules.
///
/// Rules are opaque strings to the engine (CSS-selector-like in practice).
/// An unknown or malformed rule yields empty output rather than an error.
pub trait PageExtractor: Send + Sync {
    /// URL the page was fetched from.
    fn url(&self) -> &str;

    /// Text of the first element matching `rule`, trimmed; empty when nothing matches.
    fn query_text(&self, rule: &str) -> String;

    /// Text of every element matching `rule`, trimmed, in document order.
    fn query_all(&self, rule: &str) -> Vec<String>;
}

/// A single page request issued by a source adapter.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Source issuing the request.
    pub source: SourceId,
    /// Absolute page URL.
    pub url: String,
    /// Egress proxy, `None` for a direct connection.
    pub proxy: Option<ProxyRecord>,
    /// User-agent header value.
    pub user_agent: String,
    /// Timeout for this request alone.
    pub timeout: Duration,
}

/// Capability to fetch and parse a page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `req.url` and return a parsed page.
    ///
    /// # Errors
    /// Returns `CreaseError::Network` on connection failures, non-success status
    /// codes, and timeouts.
    async fn fetch(&self, req: &FetchRequest) -> Result<Box<dyn PageExtractor>, CreaseError>;
}
