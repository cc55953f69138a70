// Expose modules for integration testing
pub mod catalog;
pub mod concurrency;
pub mod config;
pub mod descramble;
pub mod discovery;
pub mod downloader;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod pages;
pub mod series;

// Re-export important types for easier use in tests
pub use config::{DownloaderConfig, Pacing};
pub use error::DownloadError;
pub use fetcher::Fetcher;
pub use models::{ChapterDescriptor, PageDescriptor, SeriesRef, UnitType};
pub use series::SeriesOptions;
