use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::pricing::{compute_prices, PremiumTable, PremiumsUpdate, PRODUCT_CATALOG};
use crate::types::{PriceCache, PriceSource, PriceStatus, ReferencePrice};

struct StoreInner {
    cache: PriceCache,
    premiums: PremiumTable,
}

/// Single owned cell for the served price list and the premium table.
///
/// Every write builds a complete new `PriceCache` and swaps it in under the
/// write lock, so readers only ever see whole snapshots. Lock hold times are
/// a few microseconds; no network I/O happens while a guard is alive.
pub struct PriceStore {
    inner: RwLock<StoreInner>,
    currency_prefix: String,
}

impl PriceStore {
    pub fn new(currency_prefix: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(StoreInner {
                cache: PriceCache::empty(),
                premiums: PremiumTable::default(),
            }),
            currency_prefix: currency_prefix.into(),
        })
    }

    // Writers replace state wholesale, so a poisoned lock still holds a consistent value.
    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current cache, cloned out. Never waits on an in-flight extraction.
    pub fn snapshot(&self) -> PriceCache {
        self.read().cache.clone()
    }

    pub fn premiums(&self) -> PremiumTable {
        self.read().premiums.clone()
    }

    /// Install a freshly extracted reference price and reprice the catalog.
    pub fn apply_extraction(&self, price: f64, at: DateTime<Utc>) -> PriceCache {
        match ReferencePrice::new(price, PriceSource::Scraped, at) {
            Some(reference) => self.install(reference, PriceStatus::Success),
            None => self.record_failure(format!("extracted price {price} is not a positive number")),
        }
    }

    /// Mark the cache as failed. The last good reference and product list stay served.
    pub fn record_failure(&self, message: String) -> PriceCache {
        let mut inner = self.write();
        let next = PriceCache {
            reference: inner.cache.reference,
            products: inner.cache.products.clone(),
            status: PriceStatus::Error,
            error: Some(message),
        };
        inner.cache = next.clone();
        next
    }

    /// Operator-entered reference price. Rejected values leave the cache untouched.
    pub fn apply_manual(&self, price: f64) -> Result<PriceCache> {
        let reference = ReferencePrice::new(price, PriceSource::Manual, Utc::now()).ok_or_else(|| {
            AppError::InvalidManualInput(format!("{price} is not a positive finite number"))
        })?;
        Ok(self.install(reference, PriceStatus::Manual))
    }

    /// Merge premium changes and reprice against the current reference, if any.
    /// Status and error are carried over unchanged.
    pub fn update_premiums(&self, update: &PremiumsUpdate) -> Result<(PremiumTable, PriceCache)> {
        let mut inner = self.write();
        let premiums = inner.premiums.merged(update)?;
        let products = match inner.cache.reference {
            Some(r) => compute_prices(r.value(), PRODUCT_CATALOG, &premiums, &self.currency_prefix),
            None => Vec::new(),
        };
        let next = PriceCache { products, ..inner.cache.clone() };
        inner.premiums = premiums.clone();
        inner.cache = next.clone();
        Ok((premiums, next))
    }

    fn install(&self, reference: ReferencePrice, status: PriceStatus) -> PriceCache {
        let mut inner = self.write();
        let products =
            compute_prices(reference.value(), PRODUCT_CATALOG, &inner.premiums, &self.currency_prefix);
        let next = PriceCache { reference: Some(reference), products, status, error: None };
        inner.cache = next.clone();
        next
    }
}
