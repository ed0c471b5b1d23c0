use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::api::latency::ExtractionLatency;
use crate::extractor::Extractor;
use crate::state::PriceStore;
use crate::types::PriceCache;

/// Runs extractions and applies their results to the store.
///
/// Startup, the periodic timer and `POST /api/refresh` all go through
/// [`PriceRefresher::refresh_now`]. The extract-then-apply sequence is
/// serialized, so the cache always reflects the most recently *completed*
/// extraction. Manual overrides only take the store's write lock: an
/// extraction that finishes after an override replaces it (last writer wins).
pub struct PriceRefresher {
    extractor: Extractor,
    store: Arc<PriceStore>,
    latency: Arc<ExtractionLatency>,
    interval: Duration,
    in_flight: Mutex<()>,
}

impl PriceRefresher {
    pub fn new(
        extractor: Extractor,
        store: Arc<PriceStore>,
        latency: Arc<ExtractionLatency>,
        interval: Duration,
    ) -> Self {
        Self { extractor, store, latency, interval, in_flight: Mutex::new(()) }
    }

    /// Extract once and apply the outcome. Failures are recorded, never propagated.
    pub async fn refresh_now(&self) -> PriceCache {
        let _guard = self.in_flight.lock().await;

        info!("Starting price extraction");
        let started = Instant::now();
        let result = self.extractor.extract().await;
        let elapsed = started.elapsed();
        self.latency.record(elapsed);

        match result {
            Ok(extraction) => {
                info!(
                    price = extraction.price,
                    heuristic = extraction.heuristic,
                    duration_ms = elapsed.as_millis() as u64,
                    "Price updated: {:.2} via {}",
                    extraction.price,
                    extraction.heuristic,
                );
                self.store.apply_extraction(extraction.price, Utc::now())
            }
            Err(e) => {
                warn!(
                    duration_ms = elapsed.as_millis() as u64,
                    "Price extraction failed: {e}",
                );
                self.store.record_failure(e.to_string())
            }
        }
    }

    /// Periodic loop. The first tick fires immediately and doubles as the startup extraction.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.refresh_now().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractionError;
    use crate::extractor::{PageSource, PriceBand};
    use crate::types::PriceStatus;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    /// Hands out scripted responses in order, each after an optional delay.
    struct ScriptedSource {
        script: StdMutex<VecDeque<(Duration, Result<String, ExtractionError>)>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<(Duration, Result<String, ExtractionError>)>) -> Arc<Self> {
            Arc::new(Self { script: StdMutex::new(script.into()) })
        }
    }

    #[async_trait]
    impl PageSource for ScriptedSource {
        async fn fetch_page(&self) -> Result<String, ExtractionError> {
            let next = self.script.lock().unwrap().pop_front();
            let (delay, result) =
                next.unwrap_or((Duration::ZERO, Err(ExtractionError::Network("script exhausted".into()))));
            tokio::time::sleep(delay).await;
            result
        }
    }

    fn page(price: &str) -> Result<String, ExtractionError> {
        Ok(format!(r#"<div class="price">RM {price}</div>"#))
    }

    fn refresher(source: Arc<ScriptedSource>) -> (Arc<PriceRefresher>, Arc<PriceStore>, Arc<ExtractionLatency>) {
        let store = PriceStore::new("RM");
        let latency = Arc::new(ExtractionLatency::new());
        let extractor = Extractor::new(
            source,
            PriceBand { min: 200.0, max: 1000.0 },
            Duration::from_secs(60),
        );
        let r = Arc::new(PriceRefresher::new(
            extractor,
            Arc::clone(&store),
            Arc::clone(&latency),
            Duration::from_secs(300),
        ));
        (r, store, latency)
    }

    #[tokio::test]
    async fn success_then_two_failures_serves_last_good_products() {
        let source = ScriptedSource::new(vec![
            (Duration::ZERO, page("650.00")),
            (Duration::ZERO, Err(ExtractionError::Network("connection reset".into()))),
            (Duration::ZERO, page("12.00")),
        ]);
        let (r, store, latency) = refresher(source);

        let good = r.refresh_now().await;
        assert_eq!(good.status, PriceStatus::Success);

        let first = r.refresh_now().await;
        assert_eq!(first.status, PriceStatus::Error);
        assert!(first.error.as_deref().unwrap().contains("connection reset"));

        let second = r.refresh_now().await;
        assert_eq!(second.status, PriceStatus::Error);
        assert!(second.error.as_deref().unwrap().contains("could not extract price"));
        assert_eq!(second.products, good.products);
        assert_eq!(store.snapshot().reference, good.reference);
        assert_eq!(latency.len(), 3);
    }

    #[tokio::test]
    async fn failure_before_first_success_reports_error_with_no_products() {
        let source = ScriptedSource::new(vec![(Duration::ZERO, Err(ExtractionError::Network("dns".into())))]);
        let (r, _, _) = refresher(source);
        let snap = r.refresh_now().await;
        assert_eq!(snap.status, PriceStatus::Error);
        assert!(snap.products.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_refreshes_apply_in_completion_order() {
        // The first fetch is slow. Without serialization its stale result
        // would land after the second one and clobber it.
        let source = ScriptedSource::new(vec![
            (Duration::from_secs(10), page("600.00")),
            (Duration::from_secs(1), page("700.00")),
        ]);
        let (r, store, _) = refresher(source);

        let r1 = Arc::clone(&r);
        let first = tokio::spawn(async move { r1.refresh_now().await });
        tokio::task::yield_now().await;
        let r2 = Arc::clone(&r);
        let second = tokio::spawn(async move { r2.refresh_now().await });

        let a = first.await.unwrap();
        let b = second.await.unwrap();
        assert_eq!(a.reference.map(|p| p.value()), Some(600.0));
        assert_eq!(b.reference.map(|p| p.value()), Some(700.0));
        assert_eq!(store.snapshot().reference.map(|p| p.value()), Some(700.0));
    }

    #[tokio::test(start_paused = true)]
    async fn reads_do_not_wait_for_in_flight_extraction() {
        let source = ScriptedSource::new(vec![(Duration::from_secs(30), page("640.00"))]);
        let (r, store, _) = refresher(source);

        let r1 = Arc::clone(&r);
        let pending = tokio::spawn(async move { r1.refresh_now().await });
        tokio::task::yield_now().await;

        assert_eq!(store.snapshot().status, PriceStatus::Pending);
        let done = pending.await.unwrap();
        assert_eq!(done.status, PriceStatus::Success);
    }
}
