use std::fs::File;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::DownloadError;

pub const DEFAULT_BASE_URL: &str = "https://mangafire.to";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
pub const DEFAULT_REFERER: &str = "https://mangafire.to/";
pub const DEFAULT_CATALOG_URL: &str = "https://api.mangadex.org";
pub const DEFAULT_CATALOG_COVERS_URL: &str = "https://uploads.mangadex.org/covers";

/// Settings shared by the fetcher, the downloaders and the catalog client.
///
/// Every field has a default, so a config file only needs the keys it overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    pub base_url: String,
    pub user_agent: String,
    pub referer: String,
    /// Applied to every outbound request
    pub timeout_secs: u64,
    /// Pause after every page, successful or not
    pub page_delay_ms: u64,
    /// Pause after every chapter of a series run
    pub chapter_delay_ms: u64,
    pub catalog_url: String,
    pub catalog_covers_url: String,
    pub catalog_concurrency: usize,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            timeout_secs: 30,
            page_delay_ms: 500,
            chapter_delay_ms: 1000,
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            catalog_covers_url: DEFAULT_CATALOG_COVERS_URL.to_string(),
            catalog_concurrency: 5,
        }
    }
}

impl DownloaderConfig {
    /// Load a JSON config file; missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DownloadError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| DownloadError::ConfigError(format!("Failed to open {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_reader(file)
            .map_err(|e| DownloadError::ConfigError(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.catalog_concurrency == 0 {
            return Err(DownloadError::ConfigError(String::from("catalog_concurrency must be at least 1")));
        }
        if self.timeout_secs == 0 {
            return Err(DownloadError::ConfigError(String::from("timeout_secs must be at least 1")));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            page_delay: Duration::from_millis(self.page_delay_ms),
            chapter_delay: Duration::from_millis(self.chapter_delay_ms),
        }
    }
}

/// Minimum spacing inserted after each unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub page_delay: Duration,
    pub chapter_delay: Duration,
}

impl Pacing {
    pub fn none() -> Self {
        Self { page_delay: Duration::ZERO, chapter_delay: Duration::ZERO }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        DownloaderConfig::default().pacing()
    }
}
