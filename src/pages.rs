use log::info;
use serde::Deserialize;
use serde_json::Value;

use crate::error::DownloadError;
use crate::fetcher::Fetcher;
use crate::models::{PageDescriptor, UnitType};

#[derive(Debug, Deserialize)]
struct PagesEnvelope {
    result: PagesResult,
}

#[derive(Debug, Deserialize)]
struct PagesResult {
    images: Vec<Value>,
}

/// One raw entry of the page list, validated only when it is consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct PageEntry(Value);

impl PageEntry {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Interpret the entry as `[image url, aux, scramble level]`.
    pub fn descriptor(&self) -> Result<PageDescriptor, DownloadError> {
        let fields = self
            .0
            .as_array()
            .ok_or_else(|| DownloadError::ParsingError(format!("Page entry is not a list: {}", self.0)))?;

        let image_url = fields
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| DownloadError::ParsingError(format!("Page entry has no image URL: {}", self.0)))?;

        let level = fields
            .get(2)
            .and_then(whole_number)
            .ok_or_else(|| DownloadError::ParsingError(format!("Page entry has no scramble level: {}", self.0)))?;

        Ok(PageDescriptor {
            image_url: image_url.to_string(),
            scramble_level: u32::try_from(level.max(0)).unwrap_or(u32::MAX),
        })
    }
}

/// Integer levels, or floats with no fractional part such as `2.0`.
fn whole_number(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

/// Fetch the ordered page list of one chapter or volume.
pub async fn resolve_pages(fetcher: &Fetcher, chapter_id: &str, unit: UnitType) -> Result<Vec<PageEntry>, DownloadError> {
    let path = format!("/ajax/read/{}/{}", unit, chapter_id);
    let envelope: PagesEnvelope = fetcher.fetch_json(&path).await?;
    info!("{} {} has {} pages", unit, chapter_id, envelope.result.images.len());
    Ok(envelope.result.images.into_iter().map(PageEntry::new).collect())
}
