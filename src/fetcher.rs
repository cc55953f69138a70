use log::{debug, trace};
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;

use crate::config::DownloaderConfig;
use crate::error::DownloadError;

/// HTTP GETs carrying the site's fixed identity headers.
///
/// Every method performs exactly one request. Non-success statuses become
/// [`DownloadError::HttpStatus`]; nothing is retried here.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    base_url: Url,
}

impl Fetcher {
    pub fn new(config: &DownloaderConfig) -> Result<Self, DownloadError> {
        Self::with_base_url(config, &config.base_url)
    }

    /// Same identity and timeout, rooted at a different host (used by the catalog client).
    pub fn with_base_url(config: &DownloaderConfig, base_url: &str) -> Result<Self, DownloadError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DownloadError::ConfigError(format!("Invalid base URL {}: {}", base_url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(&config.user_agent)?);
        headers.insert(REFERER, header_value(&config.referer)?);

        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a site-relative path (or pass through an absolute URL).
    pub fn url_for(&self, path: &str) -> Result<Url, DownloadError> {
        self.base_url
            .join(path)
            .map_err(|e| DownloadError::ParsingError(format!("Invalid URL {}: {}", path, e)))
    }

    async fn get(&self, url: &str) -> Result<Response, DownloadError> {
        let url = self.url_for(url)?;
        debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }

    pub async fn fetch_text(&self, url: &str) -> Result<String, DownloadError> {
        let body = self.get(url).await?.text().await?;
        trace!("{} bytes of text from {}", body.len(), url);
        Ok(body)
    }

    pub async fn fetch_document(&self, url: &str) -> Result<scraper::Html, DownloadError> {
        let body = self.fetch_text(url).await?;
        Ok(scraper::Html::parse_document(body.trim()))
    }

    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, DownloadError> {
        let body = self.fetch_text(url).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let bytes = self.get(url).await?.bytes().await?;
        trace!("{} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

fn header_value(value: &str) -> Result<HeaderValue, DownloadError> {
    HeaderValue::from_str(value)
        .map_err(|e| DownloadError::ConfigError(format!("Invalid header value {:?}: {}", value, e)))
}

/// Compile a CSS selector, mapping failures into the crate error.
pub fn selector(css: &str) -> Result<scraper::Selector, DownloadError> {
    scraper::Selector::parse(css)
        .map_err(|_| DownloadError::SelectorError(format!("Failed to parse {} selector", css)))
}
