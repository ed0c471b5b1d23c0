use std::sync::Arc;
use std::time::Duration;

use crate::error::ExtractionError;
use crate::extractor::fetch::PageSource;
use crate::extractor::heuristics::{extract_from_html, Extraction, PriceBand};

/// Fetch + heuristic chain, bounded by a hard deadline. Holds no state between
/// attempts and never touches the cache; the caller applies the result.
pub struct Extractor {
    source: Arc<dyn PageSource>,
    band: PriceBand,
    deadline: Duration,
}

impl Extractor {
    pub fn new(source: Arc<dyn PageSource>, band: PriceBand, deadline: Duration) -> Self {
        Self { source, band, deadline }
    }

    pub async fn extract(&self) -> Result<Extraction, ExtractionError> {
        match tokio::time::timeout(self.deadline, self.attempt()).await {
            Ok(result) => result,
            Err(_) => Err(ExtractionError::Timeout(self.deadline.as_secs())),
        }
    }

    async fn attempt(&self) -> Result<Extraction, ExtractionError> {
        let html = self.source.fetch_page().await?;
        let band = self.band;
        // Html is !Send: parse on the blocking pool, the document is dropped there.
        match tokio::task::spawn_blocking(move || extract_from_html(&html, &band)).await {
            Ok(result) => result,
            Err(e) => Err(ExtractionError::StructuralParse(format!("parser task failed: {e}"))),
        }
    }
}
