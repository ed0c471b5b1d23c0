use crate::error::{AppError, Result};
use crate::extractor::PriceBand;

pub const TARGET_URL: &str = "https://www.mkspamp.com.my/pricing";

/// Sent with every page fetch; a bare reqwest UA gets bot-blocked by the pricing site.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

pub const ACCEPT_HEADER: &str = "text/html,application/xhtml+xml";

/// Default plausibility band for a per-gram gold price (exclusive on both ends).
pub const PLAUSIBLE_MIN: f64 = 200.0;
pub const PLAUSIBLE_MAX: f64 = 1000.0;

/// Price refresh interval (seconds).
pub const REFRESH_INTERVAL_SECS: u64 = 300;

/// Per-request HTTP timeout (seconds).
pub const FETCH_TIMEOUT_SECS: u64 = 15;

/// Landing page directory, anchored at the crate root rather than the working directory.
pub const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/public");

/// Added on top of the fetch timeout to bound the whole extraction (fetch + parse).
pub const EXTRACTION_GRACE_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub target_url: String,
    pub log_level: String,
    pub api_port: u16,
    /// Accepted reference price range (PLAUSIBLE_MIN / PLAUSIBLE_MAX)
    pub band: PriceBand,
    pub refresh_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    /// Directory served at `/` (STATIC_DIR)
    pub static_dir: String,
    /// Prefix for formatted prices, e.g. "RM" (CURRENCY_PREFIX)
    pub currency_prefix: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. `from_env` passes the process environment.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = var("API_PORT")
            .or_else(|| var("PORT"))
            .unwrap_or_else(|| "3000".to_string());

        let min = parse_f64_var(&var, "PLAUSIBLE_MIN", PLAUSIBLE_MIN)?;
        let max = parse_f64_var(&var, "PLAUSIBLE_MAX", PLAUSIBLE_MAX)?;
        let band = PriceBand::new(min, max).ok_or_else(|| {
            AppError::Config(format!(
                "plausibility band must satisfy 0 <= PLAUSIBLE_MIN < PLAUSIBLE_MAX (got {min}..{max})"
            ))
        })?;

        let refresh_interval_secs = parse_u64_var(&var, "REFRESH_INTERVAL_SECS", REFRESH_INTERVAL_SECS)?;
        if refresh_interval_secs == 0 {
            return Err(AppError::Config("REFRESH_INTERVAL_SECS must be > 0".to_string()));
        }
        let fetch_timeout_secs = parse_u64_var(&var, "FETCH_TIMEOUT_SECS", FETCH_TIMEOUT_SECS)?;
        if fetch_timeout_secs == 0 {
            return Err(AppError::Config("FETCH_TIMEOUT_SECS must be > 0".to_string()));
        }

        Ok(Self {
            target_url: var("TARGET_URL").unwrap_or_else(|| TARGET_URL.to_string()),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            api_port: port
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            band,
            refresh_interval_secs,
            fetch_timeout_secs,
            user_agent: var("USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            static_dir: var("STATIC_DIR").unwrap_or_else(|| STATIC_DIR.to_string()),
            currency_prefix: var("CURRENCY_PREFIX").unwrap_or_else(|| "RM".to_string()),
        })
    }

    /// Hard upper bound for one extraction attempt.
    pub fn extraction_deadline_secs(&self) -> u64 {
        self.fetch_timeout_secs.saturating_add(EXTRACTION_GRACE_SECS)
    }
}

fn parse_f64_var(var: impl Fn(&str) -> Option<String>, name: &str, default: f64) -> Result<f64> {
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| AppError::Config(format!("{name} must be a number"))),
        None => Ok(default),
    }
}

fn parse_u64_var(var: impl Fn(&str) -> Option<String>, name: &str, default: u64) -> Result<u64> {
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| AppError::Config(format!("{name} must be a positive integer"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.api_port, 3000);
        assert_eq!(cfg.band, PriceBand { min: PLAUSIBLE_MIN, max: PLAUSIBLE_MAX });
        assert_eq!(cfg.extraction_deadline_secs(), FETCH_TIMEOUT_SECS + EXTRACTION_GRACE_SECS);
        assert!(cfg.static_dir.ends_with("/public"));
    }

    #[test]
    fn port_falls_back_to_port_var() {
        assert_eq!(config(&[("PORT", "8080")]).unwrap().api_port, 8080);
        assert_eq!(config(&[("API_PORT", "9000"), ("PORT", "8080")]).unwrap().api_port, 9000);
    }

    #[test]
    fn inverted_band_is_config_error() {
        let err = config(&[("PLAUSIBLE_MIN", "800"), ("PLAUSIBLE_MAX", "400")]).unwrap_err();
        assert!(matches!(err, AppError::Config(_)), "{err}");
        assert!(matches!(config(&[("PLAUSIBLE_MAX", "lots")]), Err(AppError::Config(_))));
    }

    #[test]
    fn zero_intervals_are_rejected() {
        assert!(matches!(config(&[("REFRESH_INTERVAL_SECS", "0")]), Err(AppError::Config(_))));
        assert!(matches!(config(&[("FETCH_TIMEOUT_SECS", "0")]), Err(AppError::Config(_))));
    }

    #[test]
    fn huge_fetch_timeout_saturates_deadline() {
        let max = u64::MAX.to_string();
        let cfg = config(&[("FETCH_TIMEOUT_SECS", max.as_str())]).unwrap();
        assert_eq!(cfg.extraction_deadline_secs(), u64::MAX);
    }
}
