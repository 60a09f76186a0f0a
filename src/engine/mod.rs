mod fetcher;
mod json_ld;
mod page;

pub use fetcher::RequestFetcher;
pub use json_ld::JsonLdEngine;

use async_trait::async_trait;

use crate::error::EngineError;
use crate::source::RawExtractionResult;

/// Turns a URL or raw page content into a best-effort extraction result
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    /// Fetch `url` and extract whatever recipe data the page carries
    async fn fetch_and_extract(
        &self,
        url: &str,
    ) -> Result<Box<dyn RawExtractionResult>, EngineError>;

    /// Extract from already-fetched content.
    ///
    /// With `permissive` set, hosts without a dedicated profile are still
    /// attempted instead of being rejected.
    async fn extract_from_content(
        &self,
        html: &str,
        originating_url: &str,
        permissive: bool,
    ) -> Result<Box<dyn RawExtractionResult>, EngineError>;
}
