use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::DownloadError;

static SERIES_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"manga/([^.]+)\.(\w+)").expect("series id pattern is valid"));

/// Site path of a series, e.g. `/manga/one-piece.dkw`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesRef(String);

impl SeriesRef {
    /// Accepts either a site path or an absolute URL on the site.
    pub fn new(reference: impl Into<String>) -> Self {
        let reference = reference.into();
        let path = match reqwest::Url::parse(&reference) {
            Ok(url) => url.path().to_string(),
            Err(_) if reference.starts_with('/') => reference,
            Err(_) => format!("/{}", reference),
        };
        Self(path)
    }

    pub fn path(&self) -> &str {
        &self.0
    }

    /// The identifier used by the ajax endpoints: the word run after the slug's dot.
    pub fn series_id(&self) -> Result<&str, DownloadError> {
        SERIES_ID_RE
            .captures(&self.0)
            .and_then(|caps| caps.get(2))
            .map(|m| m.as_str())
            .ok_or_else(|| DownloadError::ParsingError(format!("Not a series path: {}", self.0)))
    }

    /// Human-ish name from the path, used when the page carries no title.
    pub fn slug(&self) -> &str {
        SERIES_ID_RE
            .captures(&self.0)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .unwrap_or_else(|| self.0.trim_matches('/'))
    }
}

impl fmt::Display for SeriesRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    Chapter,
    Volume,
}

impl UnitType {
    /// Listing order used by discovery.
    pub const ALL: [UnitType; 2] = [UnitType::Chapter, UnitType::Volume];

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitType::Chapter => "chapter",
            UnitType::Volume => "volume",
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitType {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chapter" => Ok(UnitType::Chapter),
            "volume" => Ok(UnitType::Volume),
            other => Err(DownloadError::ParsingError(format!("Unknown unit type: {}", other))),
        }
    }
}

/// One entry of the discovered chapter list. Not unique: the same content may
/// appear once as a chapter and once as a volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterDescriptor {
    pub id: String,
    pub unit_type: UnitType,
    pub title: String,
    pub language: String,
    pub url: String,
}

/// A page image reference. `scramble_level == 0` means the image is already
/// in reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDescriptor {
    pub image_url: String,
    pub scramble_level: u32,
}

impl PageDescriptor {
    pub fn is_scrambled(&self) -> bool {
        self.scramble_level >= 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesDetails {
    pub id: String,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub url: String,
}
