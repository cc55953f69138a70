use log::{debug, info, warn};
use reqwest::Url;
use scraper::ElementRef;
use serde::Deserialize;

use crate::error::DownloadError;
use crate::fetcher::{selector, Fetcher};
use crate::models::{ChapterDescriptor, SearchResult, SeriesDetails, SeriesRef, UnitType};

const SEARCH_RESULT_SELECTOR: &str = "div.info > a";
const SERIES_TITLE_SELECTOR: &str = r#"div.info h1[itemprop="name"]"#;
const LANGUAGE_MENU_SELECTOR: &str = "section.m-list div.dropdown-menu a";

#[derive(Debug, Deserialize)]
struct ListingEnvelope {
    result: ListingResult,
}

#[derive(Debug, Deserialize)]
struct ListingResult {
    html: String,
}

/// Search the site's filter page for series matching `term`.
pub async fn search_series(fetcher: &Fetcher, term: &str) -> Result<Vec<SearchResult>, DownloadError> {
    let mut url = fetcher.url_for("/filter")?;
    url.query_pairs_mut().append_pair("keyword", term);

    let document = fetcher.fetch_document(url.as_str()).await?;
    let results = parse_search_results(&document, fetcher.base_url())?;
    info!("Found {} series matching {:?}", results.len(), term);
    Ok(results)
}

pub fn parse_search_results(document: &scraper::Html, base: &Url) -> Result<Vec<SearchResult>, DownloadError> {
    let links = selector(SEARCH_RESULT_SELECTOR)?;

    Ok(document
        .select(&links)
        .filter_map(|link| {
            let href = link.attr("href")?;
            let url = base.join(href).ok()?;
            Some(SearchResult {
                id: href.to_string(),
                title: link.text().collect::<String>().trim().to_string(),
                url: url.to_string(),
            })
        })
        .collect())
}

/// Fetch the series page and read its display title.
pub async fn fetch_series_details(fetcher: &Fetcher, series: &SeriesRef) -> Result<SeriesDetails, DownloadError> {
    let url = fetcher.url_for(series.path())?;
    let title = match parse_series_title(&fetcher.fetch_document(url.as_str()).await?) {
        Ok(title) => title,
        Err(DownloadError::ElementNotFound(what)) => {
            warn!("No {} on {}, using {:?}", what, url, series.slug());
            series.slug().to_string()
        }
        Err(e) => return Err(e),
    };

    Ok(SeriesDetails {
        id: series.path().to_string(),
        title,
        url: url.to_string(),
    })
}

/// Fails with `ElementNotFound` when the page has no non-empty title heading.
pub fn parse_series_title(document: &scraper::Html) -> Result<String, DownloadError> {
    let title_selector = selector(SERIES_TITLE_SELECTOR)?;
    document
        .select(&title_selector)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
        .ok_or_else(|| DownloadError::ElementNotFound(String::from("series title")))
}

/// Language codes advertised by the series page's language menu, lower-cased,
/// de-duplicated, in menu order.
pub fn parse_languages(document: &scraper::Html) -> Result<Vec<String>, DownloadError> {
    let menu = selector(LANGUAGE_MENU_SELECTOR)?;
    let mut languages: Vec<String> = Vec::new();

    for code in document.select(&menu).filter_map(|e| e.attr("data-code")) {
        let code = code.trim().to_lowercase();
        if !code.is_empty() && !languages.contains(&code) {
            languages.push(code);
        }
    }
    Ok(languages)
}

/// Extract the chapter (or volume) anchors from a listing fragment.
///
/// Only anchors whose link path contains `/{unit}-` count; anchors without a
/// `data-id` cannot be downloaded and are skipped.
pub fn parse_listing_fragment(
    html: &str,
    unit: UnitType,
    language: &str,
    base: &Url,
) -> Result<Vec<ChapterDescriptor>, DownloadError> {
    let fragment = scraper::Html::parse_fragment(html);
    let anchors = selector("a")?;
    let marker = format!("/{}-", unit);
    let mut chapters = Vec::new();

    for anchor in fragment.select(&anchors) {
        let Some(url) = anchor.attr("href").and_then(|href| base.join(href).ok()) else {
            continue;
        };
        if !url.path().contains(&marker) {
            continue;
        }
        let id = match anchor_id(&anchor, url.path()) {
            Ok(id) => id,
            Err(e) => {
                debug!("Skipping {} link: {}", unit, e);
                continue;
            }
        };
        let url = base.join(url.path()).unwrap_or(url);

        chapters.push(ChapterDescriptor {
            id: id.to_string(),
            unit_type: unit,
            title: anchor.text().collect::<String>().trim().to_string(),
            language: language.to_string(),
            url: url.to_string(),
        });
    }

    Ok(chapters)
}

fn anchor_id<'a>(anchor: &ElementRef<'a>, path: &str) -> Result<&'a str, DownloadError> {
    anchor
        .attr("data-id")
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| DownloadError::AttributeNotFound(format!("data-id on {}", path)))
}

async fn fetch_listing(
    fetcher: &Fetcher,
    series_id: &str,
    unit: UnitType,
    language: &str,
) -> Result<Vec<ChapterDescriptor>, DownloadError> {
    let path = format!("/ajax/read/{}/{}/{}", series_id, unit, language);
    let envelope: ListingEnvelope = fetcher.fetch_json(&path).await?;
    parse_listing_fragment(&envelope.result.html, unit, language, fetcher.base_url())
}

/// Enumerate every chapter and volume of a series across all its languages.
///
/// Order is language menu order, then chapter before volume, then fragment
/// order. A listing that fails counts as empty; only failures on the series
/// page itself abort discovery.
pub async fn discover_chapters(fetcher: &Fetcher, series: &SeriesRef) -> Result<Vec<ChapterDescriptor>, DownloadError> {
    let series_id = series.series_id()?;
    let url = fetcher.url_for(series.path())?;
    let languages = parse_languages(&fetcher.fetch_document(url.as_str()).await?)?;
    debug!("Languages for {}: {:?}", series, languages);

    let mut chapters = Vec::new();
    for language in &languages {
        for unit in UnitType::ALL {
            match fetch_listing(fetcher, series_id, unit, language).await {
                Ok(found) => {
                    debug!("{} {}s for language {}", found.len(), unit, language);
                    chapters.extend(found);
                }
                Err(e) => warn!("No {}s found for language {}: {}", unit, language, e),
            }
        }
    }

    info!("Discovered {} entries for {}", chapters.len(), series);
    Ok(chapters)
}
