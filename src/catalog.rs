use std::collections::BTreeMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::concurrency::run_with_limit;
use crate::config::DownloaderConfig;
use crate::error::DownloadError;
use crate::fetcher::Fetcher;

#[derive(Debug, Deserialize)]
struct MangaList {
    data: Option<Vec<MangaData>>,
}

#[derive(Debug, Clone, Deserialize)]
struct MangaData {
    id: String,
    attributes: MangaAttributes,
    #[serde(default)]
    relationships: Vec<Relationship>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MangaAttributes {
    #[serde(default)]
    title: BTreeMap<String, String>,
    #[serde(default)]
    available_translated_languages: Vec<Option<String>>,
}

#[derive(Debug, Clone, Deserialize)]
struct Relationship {
    #[serde(rename = "type")]
    rel_type: String,
    attributes: Option<RelationshipAttributes>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelationshipAttributes {
    file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChapterList {
    #[serde(default)]
    data: Vec<serde_json::Value>,
    #[serde(default)]
    total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub id: String,
    pub title: String,
    pub cover_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogDetails {
    pub id: String,
    pub title: String,
    pub cover_url: Option<String>,
    pub chapter_count: u64,
    pub available_languages: Vec<String>,
}

impl MangaData {
    fn display_title(&self) -> String {
        self.attributes
            .title
            .get("en")
            .or_else(|| self.attributes.title.values().next())
            .cloned()
            .unwrap_or_else(|| String::from("Untitled"))
    }

    fn cover_file(&self) -> Option<&str> {
        self.relationships
            .iter()
            .find(|r| r.rel_type == "cover_art")
            .and_then(|r| r.attributes.as_ref())
            .and_then(|a| a.file_name.as_deref())
    }
}

/// Popular-series listing from the metadata API. Only series with an English
/// first chapter are listed.
pub struct Catalog {
    fetcher: Fetcher,
    covers_url: String,
    concurrency: usize,
}

impl Catalog {
    pub fn new(config: &DownloaderConfig) -> Result<Self, DownloadError> {
        Ok(Self {
            fetcher: Fetcher::with_base_url(config, &config.catalog_url)?,
            covers_url: config.catalog_covers_url.trim_end_matches('/').to_string(),
            concurrency: config.catalog_concurrency,
        })
    }

    fn cover_url(&self, manga: &MangaData, size: u32) -> Option<String> {
        manga
            .cover_file()
            .map(|file| format!("{}/{}/{}.{}.jpg", self.covers_url, manga.id, file, size))
    }

    async fn popular(&self, limit: usize) -> Result<Vec<MangaData>, DownloadError> {
        let mut url = self.fetcher.url_for("/manga")?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("includes[]", "cover_art")
            .append_pair("order[followedCount]", "desc");

        let list: MangaList = self.fetcher.fetch_json(url.as_str()).await?;
        list.data
            .ok_or_else(|| DownloadError::ParsingError(String::from("Catalog response has no data array")))
    }

    async fn has_english_first_chapter(&self, manga_id: &str) -> Result<bool, DownloadError> {
        let mut url = self.fetcher.url_for("/chapter")?;
        url.query_pairs_mut()
            .append_pair("manga", manga_id)
            .append_pair("translatedLanguage[]", "en")
            .append_pair("chapter", "1")
            .append_pair("limit", "1");

        let chapters: ChapterList = self.fetcher.fetch_json(url.as_str()).await?;
        Ok(!chapters.data.is_empty())
    }

    async fn english_chapter_count(&self, manga_id: &str) -> Result<u64, DownloadError> {
        let mut url = self.fetcher.url_for("/chapter")?;
        url.query_pairs_mut()
            .append_pair("manga", manga_id)
            .append_pair("translatedLanguage[]", "en")
            .append_pair("limit", "0");

        let chapters: ChapterList = self.fetcher.fetch_json(url.as_str()).await?;
        Ok(chapters.total)
    }

    /// Checks each series one at a time.
    pub async fn list_popular(&self, limit: usize) -> Result<Vec<CatalogEntry>, DownloadError> {
        let mut entries = Vec::new();

        for manga in self.popular(limit).await? {
            match self.has_english_first_chapter(&manga.id).await {
                Ok(true) => entries.push(CatalogEntry {
                    id: manga.id.clone(),
                    title: manga.display_title(),
                    cover_url: self.cover_url(&manga, 256),
                }),
                Ok(false) => debug!("Skipping {}: no English chapter 1", manga.id),
                Err(e) => warn!("Skipping {}: {}", manga.id, e),
            }
        }

        info!("{} popular series listed", entries.len());
        Ok(entries)
    }

    /// Like [`Catalog::list_popular`], with chapter counts and languages.
    /// Series are enriched concurrently, `catalog_concurrency` at a time.
    pub async fn list_popular_detailed(&self, limit: usize) -> Result<Vec<CatalogDetails>, DownloadError> {
        let tasks = self
            .popular(limit)
            .await?
            .into_iter()
            .map(move |manga| move || self.details(manga))
            .collect::<Vec<_>>();

        let mut details = Vec::new();
        for result in run_with_limit(self.concurrency, tasks).await {
            match result {
                Ok(Some(entry)) => details.push(entry),
                Ok(None) => {}
                Err(e) => warn!("Failed to fetch series details: {}", e),
            }
        }

        info!("{} popular series listed with details", details.len());
        Ok(details)
    }

    async fn details(&self, manga: MangaData) -> Result<Option<CatalogDetails>, DownloadError> {
        if !self.has_english_first_chapter(&manga.id).await? {
            debug!("Skipping {}: no English chapter 1", manga.id);
            return Ok(None);
        }
        let chapter_count = self.english_chapter_count(&manga.id).await?;

        Ok(Some(CatalogDetails {
            id: manga.id.clone(),
            title: manga.display_title(),
            cover_url: self.cover_url(&manga, 512),
            chapter_count,
            available_languages: manga.attributes.available_translated_languages.iter().flatten().cloned().collect(),
        }))
    }
}
