use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use tracing::debug;

use crate::config::ACCEPT_HEADER;
use crate::error::{AppError, ExtractionError, Result};

/// Where page content comes from. The production source is a plain HTTP GET;
/// a rendering browser would slot in behind the same trait.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self) -> std::result::Result<String, ExtractionError>;
}

pub struct HttpPageSource {
    client: reqwest::Client,
    url: String,
}

impl HttpPageSource {
    pub fn new(url: impl Into<String>, user_agent: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|_| AppError::Config("USER_AGENT is not a valid header value".to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HEADER));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, url: url.into() })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_page(&self) -> std::result::Result<String, ExtractionError> {
        let resp = self.client.get(&self.url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ExtractionError::Network(format!("{} returned HTTP {status}", self.url)));
        }
        let body = resp.text().await?;
        debug!(url = %self.url, bytes = body.len(), "Fetched pricing page");
        Ok(body)
    }
}
