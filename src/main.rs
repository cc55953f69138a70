use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;

use mangafire_dl::catalog::Catalog;
use mangafire_dl::discovery::{discover_chapters, search_series};
use mangafire_dl::downloader::download_chapter;
use mangafire_dl::series::{download_series, select_chapters};
use mangafire_dl::{DownloadError, DownloaderConfig, Fetcher, SeriesOptions, SeriesRef, UnitType};

/// Download manga chapters from https://mangafire.to, restoring scrambled pages
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// JSON config file; flags below override it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Pause after each page, in milliseconds
    #[arg(long, global = true)]
    pub page_delay: Option<u64>,

    /// Pause after each chapter, in milliseconds
    #[arg(long, global = true)]
    pub chapter_delay: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search series by name
    Search {
        term: String,
        #[arg(long)]
        json: bool,
    },
    /// List the chapters and volumes of a series
    Chapters {
        /// Series path or URL, e.g. /manga/one-piece.dkw
        series: String,
        /// Only show this language
        #[arg(short, long)]
        language: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Download a range of chapters of a series
    Download {
        /// Series path or URL, e.g. /manga/one-piece.dkw
        series: String,
        /// The output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        #[arg(short, long, default_value = "en")]
        language: String,
        /// First chapter position to download (1-based)
        #[arg(long, default_value_t = 1)]
        start: usize,
        /// Stop before this chapter position
        #[arg(long)]
        end: Option<usize>,
        /// Order chapters by the number in their title before slicing
        #[arg(long)]
        sort_numeric: bool,
    },
    /// Download a single chapter or volume by id
    Chapter {
        chapter_id: String,
        #[arg(short = 't', long, default_value = "chapter")]
        unit_type: UnitType,
        /// The output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// List popular series from the metadata catalog
    Popular {
        #[arg(short = 'n', long, default_value_t = 100)]
        limit: usize,
        /// Include chapter counts and languages
        #[arg(long)]
        detailed: bool,
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), DownloadError> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.verbose { LevelFilter::Debug } else { LevelFilter::Info })
        .parse_default_env()
        .init();

    let config = load_config(&args)?;
    let fetcher = Fetcher::new(&config)?;
    let pacing = config.pacing();

    match args.command {
        Command::Search { term, json } => {
            let results = with_spinner("Searching...", search_series(&fetcher, &term)).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for result in results {
                    println!("{}  {}  {}", result.id, result.title, result.url);
                }
            }
        }
        Command::Chapters { series, language, json } => {
            let series = SeriesRef::new(series);
            let mut chapters = with_spinner("Scanning for available chapters...", discover_chapters(&fetcher, &series)).await?;
            if let Some(language) = language {
                let options = SeriesOptions { language, ..SeriesOptions::default() };
                chapters = select_chapters(chapters, &options);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&chapters)?);
            } else {
                for (index, chapter) in chapters.iter().enumerate() {
                    println!("[{}] {} ({} {}, id {})", index + 1, chapter.title, chapter.language, chapter.unit_type, chapter.id);
                }
            }
        }
        Command::Download { series, output_dir, language, start, end, sort_numeric } => {
            let output_dir = resolve_output_dir(output_dir);
            let options = SeriesOptions { language, start_chapter: start, end_chapter: end, sort_numeric };
            let report = download_series(&fetcher, &SeriesRef::new(series), &output_dir, &options, &pacing).await?;

            println!("{}: {} of {} chapters downloaded", report.title, report.completed.len(), report.selected);
            for (title, reason) in &report.failed {
                eprintln!("✗ {}: {}", title, reason);
            }
        }
        Command::Chapter { chapter_id, unit_type, output_dir } => {
            let output_dir = resolve_output_dir(output_dir).join(&chapter_id);
            let report = download_chapter(&fetcher, &chapter_id, unit_type, &output_dir, &pacing).await?;

            println!("{} of {} pages saved to {}", report.saved.len(), report.total_pages, output_dir.display());
            for (page, reason) in &report.failed {
                eprintln!("✗ page {}: {}", page, reason);
            }
        }
        Command::Popular { limit, detailed, json } => {
            let catalog = Catalog::new(&config)?;
            if detailed {
                let details = with_spinner("Fetching popular series...", catalog.list_popular_detailed(limit)).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&details)?);
                } else {
                    for d in details {
                        println!("{}  {}  {} chapters  [{}]", d.id, d.title, d.chapter_count, d.available_languages.join(", "));
                    }
                }
            } else {
                let entries = with_spinner("Fetching popular series...", catalog.list_popular(limit)).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&entries)?);
                } else {
                    for e in entries {
                        println!("{}  {}  {}", e.id, e.title, e.cover_url.as_deref().unwrap_or("-"));
                    }
                }
            }
        }
    }

    Ok(())
}

fn load_config(args: &Args) -> Result<DownloaderConfig, DownloadError> {
    let mut config = match &args.config {
        Some(path) => DownloaderConfig::load(path)?,
        None => DownloaderConfig::default(),
    };

    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(delay) = args.page_delay {
        config.page_delay_ms = delay;
    }
    if let Some(delay) = args.chapter_delay {
        config.chapter_delay_ms = delay;
    }

    config.validate()?;
    Ok(config)
}

fn resolve_output_dir(output_dir: Option<PathBuf>) -> PathBuf {
    output_dir
        .or_else(dirs::download_dir)
        .unwrap_or_else(|| Path::new(".").to_path_buf())
}

async fn with_spinner<T>(
    message: &'static str,
    task: impl std::future::Future<Output = Result<T, DownloadError>>,
) -> Result<T, DownloadError> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋ ", "⠙ ", "⠹ ", "⠸ ", "⠼ ", "⠴ ", "⠦ ", "⠧ ", "⠇ ", "⠏ ", "✓ "]),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = task.await;
    spinner.finish_and_clear();
    result
}
