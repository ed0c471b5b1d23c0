use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductType {
    Minted,
    Cast,
    Lunar,
    LunarOz,
}

/// Immutable catalog entry. Weight is in grams and may be fractional (1 oz = 31.1035 g).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProductSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub weight: f64,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub category: &'static str,
}

/// Catalog entry plus its derived price. Always rebuilt from a reference price.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedProduct {
    #[serde(flatten)]
    pub spec: ProductSpec,
    pub price: i64,
    pub price_formatted: String,
}

// ---------------------------------------------------------------------------
// Reference price
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Scraped,
    Manual,
}

/// The single authoritative per-gram price. Only constructible from a finite, positive value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferencePrice {
    value: f64,
    pub updated_at: DateTime<Utc>,
    pub source: PriceSource,
}

impl ReferencePrice {
    pub fn new(value: f64, source: PriceSource, updated_at: DateTime<Utc>) -> Option<Self> {
        if value.is_finite() && value > 0.0 {
            Some(Self { value, updated_at, source })
        } else {
            None
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceStatus {
    /// Nothing has been extracted or entered yet.
    Pending,
    Success,
    Error,
    Manual,
}

/// Last computed result served to API consumers. Replaced wholesale on every write.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceCache {
    pub reference: Option<ReferencePrice>,
    pub products: Vec<ComputedProduct>,
    pub status: PriceStatus,
    pub error: Option<String>,
}

impl PriceCache {
    pub fn empty() -> Self {
        Self {
            reference: None,
            products: Vec::new(),
            status: PriceStatus::Pending,
            error: None,
        }
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.reference.map(|r| r.updated_at)
    }
}

impl Default for PriceCache {
    fn default() -> Self {
        Self::empty()
    }
}

/// Wire shape of the cache: flat, camelCase, nulls for an uninitialized reference.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PriceCacheWire<'a> {
    last_updated: Option<DateTime<Utc>>,
    gold_price_per_gram: Option<f64>,
    source: Option<PriceSource>,
    products: &'a [ComputedProduct],
    status: PriceStatus,
    error: Option<&'a str>,
}

impl Serialize for PriceCache {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        PriceCacheWire {
            last_updated: self.last_updated(),
            gold_price_per_gram: self.reference.map(|r| r.value()),
            source: self.reference.map(|r| r.source),
            products: &self.products,
            status: self.status,
            error: self.error.as_deref(),
        }
        .serialize(serializer)
    }
}
