use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum DownloadError {
    RequestFailed(reqwest::Error),
    HttpStatus { url: String, status: u16 },
    IoError(std::io::Error),
    ParsingError(String),
    SelectorError(String),
    ElementNotFound(String),
    AttributeNotFound(String),
    ImageProcessingError(String),
    ConfigError(String),
}

impl DownloadError {
    /// Transport failures, timeouts and non-success statuses.
    pub fn is_network(&self) -> bool {
        matches!(self, DownloadError::RequestFailed(_) | DownloadError::HttpStatus { .. })
    }

    /// Filesystem failures on the output side.
    pub fn is_io(&self) -> bool {
        matches!(self, DownloadError::IoError(_))
    }
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadError::RequestFailed(e) => write!(f, "Failed to make HTTP request: {}", e),
            DownloadError::HttpStatus { url, status } => write!(f, "HTTP error {} for URL {}", status, url),
            DownloadError::IoError(e) => write!(f, "IO operation failed: {}", e),
            DownloadError::ParsingError(msg) => write!(f, "Failed to parse response: {}", msg),
            DownloadError::SelectorError(msg) => write!(f, "Invalid CSS selector: {}", msg),
            DownloadError::ElementNotFound(msg) => write!(f, "Element not found: {}", msg),
            DownloadError::AttributeNotFound(msg) => write!(f, "Attribute not found: {}", msg),
            DownloadError::ImageProcessingError(msg) => write!(f, "Image processing error: {}", msg),
            DownloadError::ConfigError(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl Error for DownloadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DownloadError::RequestFailed(e) => Some(e),
            DownloadError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DownloadError {
    fn from(err: reqwest::Error) -> Self {
        DownloadError::RequestFailed(err)
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        DownloadError::IoError(err)
    }
}

impl From<serde_json::Error> for DownloadError {
    fn from(err: serde_json::Error) -> Self {
        DownloadError::ParsingError(err.to_string())
    }
}

impl From<image::ImageError> for DownloadError {
    fn from(err: image::ImageError) -> Self {
        DownloadError::ImageProcessingError(err.to_string())
    }
}
