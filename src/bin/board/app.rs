use serde::Deserialize;

// ---------------------------------------------------------------------------
// API response types (mirror the pricer's JSON shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct PricesResponse {
    pub last_updated: Option<String>,
    pub gold_price_per_gram: Option<f64>,
    pub source: Option<String>,
    #[serde(default)]
    pub products: Vec<ProductRow>,
    #[serde(default)]
    pub status: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct ProductRow {
    pub id: String,
    pub name: String,
    pub weight: f64,
    #[serde(rename = "type")]
    pub product_type: String,
    pub category: String,
    pub price: i64,
    pub price_formatted: String,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    pub prices: PricesResponse,
    /// True while a POST /api/refresh is outstanding.
    pub refreshing: bool,
    pub last_refresh: std::time::Instant,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            prices: PricesResponse::default(),
            refreshing: false,
            last_refresh: std::time::Instant::now(),
            base_url,
        }
    }

    /// Poll the current price cache.
    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let prices_url = format!("{}/api/prices", self.base_url);

        let prices_resp = match client.get(&prices_url).send().await {
            Ok(r) => r,
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
                return;
            }
        };

        match prices_resp.json::<PricesResponse>().await {
            Ok(p) => {
                self.prices = p;
                self.status = ConnectionStatus::Connected;
                self.last_refresh = std::time::Instant::now();
            }
            Err(e) => self.status = ConnectionStatus::Error(format!("parse error: {e}")),
        }
    }

    /// Ask the pricer to extract now. Blocks until the server has an answer.
    pub async fn trigger_extraction(&mut self, client: &reqwest::Client) {
        self.refreshing = true;
        let url = format!("{}/api/refresh", self.base_url);
        match client.post(&url).send().await {
            Ok(resp) => match resp.json::<PricesResponse>().await {
                Ok(p) => {
                    self.prices = p;
                    self.status = ConnectionStatus::Connected;
                    self.last_refresh = std::time::Instant::now();
                }
                Err(e) => self.status = ConnectionStatus::Error(format!("parse error: {e}")),
            },
            Err(e) => self.status = ConnectionStatus::Error(format!("{e}")),
        }
        self.refreshing = false;
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// `5.0` → `5 g`, `31.1035` → `1 oz`.
pub fn format_weight(grams: f64) -> String {
    const TROY_OUNCE_GRAMS: f64 = 31.1035;
    if (grams - TROY_OUNCE_GRAMS).abs() < 1e-6 {
        "1 oz".to_string()
    } else if grams.fract() == 0.0 {
        format!("{grams:.0} g")
    } else {
        format!("{grams} g")
    }
}

/// RFC 3339 timestamp → `HH:MM:SS` (UTC). Falls back to the raw string.
pub fn format_time(iso: Option<&str>) -> String {
    match iso {
        Some(s) => chrono::DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&chrono::Utc).format("%H:%M:%S").to_string())
            .unwrap_or_else(|_| s.to_string()),
        None => "—".to_string(),
    }
}

pub fn format_reference(price: Option<f64>) -> String {
    price.map_or("—".to_string(), |p| format!("{p:.2}/g"))
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}
