use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

use crate::config::Pacing;
use crate::descramble::descramble_bytes;
use crate::error::DownloadError;
use crate::fetcher::Fetcher;
use crate::models::{PageDescriptor, UnitType};
use crate::pages::resolve_pages;

const FALLBACK_EXTENSION: &str = "jpg";

/// Outcome of one chapter download. Page numbers are 1-based.
#[derive(Debug, Default)]
pub struct ChapterReport {
    pub total_pages: usize,
    pub saved: Vec<PathBuf>,
    pub failed: Vec<(usize, String)>,
}

impl ChapterReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.saved.len() == self.total_pages
    }
}

/// Download one page into `output_dir` as `page_NNN.ext`.
///
/// Scrambled pages are restored and written as PNG; unscrambled pages are
/// written byte for byte with the extension of their source URL.
pub async fn download_page(
    fetcher: &Fetcher,
    page: &PageDescriptor,
    output_dir: &Path,
    number: usize,
) -> Result<PathBuf, DownloadError> {
    let bytes = fetcher.fetch_bytes(&page.image_url).await?;

    let (contents, extension) = if page.is_scrambled() {
        let level = page.scramble_level;
        let png = tokio::task::spawn_blocking(move || descramble_bytes(&bytes, level))
            .await
            .map_err(|e| DownloadError::ImageProcessingError(format!("Descrambling task failed: {}", e)))??;
        (png, String::from("png"))
    } else {
        (bytes, extension_from_url(&page.image_url))
    };

    let path = output_dir.join(page_file_name(number, &extension));
    tokio::fs::write(&path, contents).await?;
    Ok(path)
}

/// Download every page of a chapter, in order, into `output_dir`.
///
/// A page that fails to download or descramble is logged and skipped.
/// Filesystem errors abort the chapter. The page delay follows every page.
pub async fn download_chapter(
    fetcher: &Fetcher,
    chapter_id: &str,
    unit: UnitType,
    output_dir: &Path,
    pacing: &Pacing,
) -> Result<ChapterReport, DownloadError> {
    info!("Downloading {} {}...", unit, chapter_id);

    let pages = resolve_pages(fetcher, chapter_id, unit).await?;
    ensure_dir_exists(output_dir).await?;

    let mut report = ChapterReport { total_pages: pages.len(), ..ChapterReport::default() };

    let progress = ProgressBar::new(pages.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} pages")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    for (index, entry) in pages.iter().enumerate() {
        let number = index + 1;
        info!("  Downloading page {}/{}...", number, pages.len());

        let result = match entry.descriptor() {
            Ok(page) => download_page(fetcher, &page, output_dir, number).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(path) => report.saved.push(path),
            Err(e) if e.is_io() => {
                progress.abandon_with_message(format!("✗ Failed writing page {}", number));
                return Err(e);
            }
            Err(e) => {
                warn!("  {} page {}: {}", failure_label(&e), number, e);
                report.failed.push((number, e.to_string()));
            }
        }
        progress.inc(1);

        tokio::time::sleep(pacing.page_delay).await;
    }

    progress.finish_and_clear();
    info!(
        "Chapter downloaded to: {} ({}/{} pages)",
        output_dir.display(),
        report.saved.len(),
        report.total_pages
    );
    Ok(report)
}

/// Log prefix for a skipped page: transport trouble or bad page data.
fn failure_label(error: &DownloadError) -> &'static str {
    if error.is_network() { "Error downloading" } else { "Unusable" }
}

/// `page_001.png` style names; sorting them by name gives reading order.
pub fn page_file_name(number: usize, extension: &str) -> String {
    format!("page_{:03}.{}", number, extension)
}

/// Extension of the last path segment of `url`, lower-cased.
pub fn extension_from_url(url: &str) -> String {
    let path = match reqwest::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    path.rsplit('/')
        .next()
        .and_then(|segment| segment.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

/// `output_dir/series/chapter`, both components sanitised.
pub fn build_chapter_path(output_dir: &Path, series_title: &str, chapter_title: &str) -> PathBuf {
    output_dir
        .join(sanitize_filename(series_title))
        .join(sanitize_filename(chapter_title))
}

/// Creates a directory and its parents; existing directories are fine.
pub async fn ensure_dir_exists(path: &Path) -> Result<(), DownloadError> {
    tokio::fs::create_dir_all(path).await?;
    Ok(())
}

/// Makes a title safe as a single path component on common filesystems.
/// Case and spaces are kept.
pub fn sanitize_filename(input: &str) -> String {
    const INVALID: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL",
        "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9",
        "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];

    let mut result = input
        .trim()
        .chars()
        .map(|c| if INVALID.contains(&c) || c.is_control() { '_' } else { c })
        .collect::<String>()
        .trim_end_matches(['.', ' '])
        .to_string();

    if result.is_empty() {
        result = String::from("_");
    }

    if RESERVED.iter().any(|name| result.eq_ignore_ascii_case(name)) || result.starts_with('.') {
        result = format!("_{}", result);
    }

    if result.len() > 255 {
        let mut end = 255;
        while !result.is_char_boundary(end) {
            end -= 1;
        }
        result.truncate(end);
    }

    result
}
