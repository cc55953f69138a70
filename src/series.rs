use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::{info, warn};
use regex::Regex;

use crate::config::Pacing;
use crate::discovery::{discover_chapters, fetch_series_details};
use crate::downloader::{build_chapter_path, download_chapter};
use crate::error::DownloadError;
use crate::fetcher::Fetcher;
use crate::models::{ChapterDescriptor, SeriesRef};

static CHAPTER_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("chapter number pattern is valid"));

/// Which part of a series to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesOptions {
    pub language: String,
    /// 1-based, inclusive
    pub start_chapter: usize,
    /// Exclusive position; `None` runs to the end
    pub end_chapter: Option<usize>,
    pub sort_numeric: bool,
}

impl Default for SeriesOptions {
    fn default() -> Self {
        Self {
            language: String::from("en"),
            start_chapter: 1,
            end_chapter: None,
            sort_numeric: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct SeriesReport {
    pub title: String,
    pub selected: usize,
    pub completed: Vec<PathBuf>,
    pub failed: Vec<(String, String)>,
}

/// Keep the chapters in `options.language`, then take the positional slice
/// `[start - 1, end)` of what remains. A start of 0 behaves like 1 and an end
/// past the list is clamped.
pub fn select_chapters(chapters: Vec<ChapterDescriptor>, options: &SeriesOptions) -> Vec<ChapterDescriptor> {
    let language = options.language.to_lowercase();
    let mut filtered = chapters
        .into_iter()
        .filter(|chapter| chapter.language == language)
        .collect::<Vec<_>>();

    if options.sort_numeric {
        sort_by_chapter_number(&mut filtered);
    }

    let start = options.start_chapter.saturating_sub(1);
    let end = options.end_chapter.unwrap_or(filtered.len()).min(filtered.len());
    if start >= end {
        return Vec::new();
    }
    filtered.drain(start..end).collect()
}

/// First decimal number in a title, e.g. `12.5` in "Chapter 12.5: Extra".
pub fn chapter_number(title: &str) -> Option<f64> {
    CHAPTER_NUMBER_RE
        .find(title)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Stable sort by chapter number; titles without one go last, by title.
pub fn sort_by_chapter_number(chapters: &mut [ChapterDescriptor]) {
    chapters.sort_by(|a, b| match (chapter_number(&a.title), chapter_number(&b.title)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.title.cmp(&b.title),
    });
}

/// Download the selected chapters of a series into `output_dir/title/chapter/`.
///
/// Chapters run one after another. A chapter that fails is logged and the run
/// moves on; only failures before the first chapter (series page, discovery)
/// are returned as errors.
pub async fn download_series(
    fetcher: &Fetcher,
    series: &SeriesRef,
    output_dir: &Path,
    options: &SeriesOptions,
    pacing: &Pacing,
) -> Result<SeriesReport, DownloadError> {
    let details = fetch_series_details(fetcher, series).await?;
    info!("Downloading: {}", details.title);

    let chapters = select_chapters(discover_chapters(fetcher, series).await?, options);
    info!("Found {} chapters", chapters.len());

    let mut report = SeriesReport {
        title: details.title.clone(),
        selected: chapters.len(),
        ..SeriesReport::default()
    };

    for (index, chapter) in chapters.iter().enumerate() {
        let chapter_dir = build_chapter_path(output_dir, &details.title, &chapter.title);
        info!("[{}/{}] {}", index + 1, chapters.len(), chapter.title);

        match download_chapter(fetcher, &chapter.id, chapter.unit_type, &chapter_dir, pacing).await {
            Ok(_) => report.completed.push(chapter_dir),
            Err(e) => {
                warn!("✗ Failed to process chapter {}: {}", chapter.title, e);
                report.failed.push((chapter.title.clone(), e.to_string()));
            }
        }

        tokio::time::sleep(pacing.chapter_delay).await;
    }

    info!(
        "Finished {}: {} of {} chapters downloaded",
        report.title,
        report.completed.len(),
        report.selected
    );
    Ok(report)
}
