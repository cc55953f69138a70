#![allow(dead_code)]

use std::io::Cursor;
use std::path::PathBuf;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use mangafire_dl::{DownloaderConfig, Fetcher};

/// Config pointing every endpoint at the mock server, with no pacing.
pub fn config_for(server: &mockito::Server) -> DownloaderConfig {
    DownloaderConfig {
        base_url: server.url(),
        catalog_url: server.url(),
        catalog_covers_url: String::from("https://covers.example.com/covers"),
        page_delay_ms: 0,
        chapter_delay_ms: 0,
        timeout_secs: 5,
        ..DownloaderConfig::default()
    }
}

pub fn fetcher_for(server: &mockito::Server) -> Fetcher {
    Fetcher::new(&config_for(server)).unwrap()
}

/// Fresh, empty output directory for one test.
pub fn temp_output(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("mangafire_dl_{}_{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

pub fn listing_body(html: &str) -> String {
    serde_json::json!({ "status": 200, "result": { "html": html } }).to_string()
}

pub fn series_page(title: &str, languages: &[&str]) -> String {
    let items = languages
        .iter()
        .map(|code| format!(r#"<a class="dropdown-item" data-code="{}">{}</a>"#, code.to_uppercase(), code))
        .collect::<String>();
    format!(
        r#"<html><body>
            <div class="info"><h1 itemprop="name">{}</h1></div>
            <section class="m-list"><div class="dropdown-menu">{}</div></section>
        </body></html>"#,
        title, items
    )
}

pub fn chapter_links(language: &str, ids: &[u32]) -> String {
    ids.iter()
        .map(|id| {
            format!(
                r#"<li><a href="/read/test.abc/{lang}/chapter-{id}" data-id="{id}">Chapter {id}</a></li>"#,
                lang = language,
                id = id
            )
        })
        .collect()
}

/// PNG whose pixels encode their own coordinates.
pub fn sample_png(width: u32, height: u32) -> (RgbaImage, Vec<u8>) {
    let image = RgbaImage::from_fn(width, height, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255]));
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image.clone())
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    (image, buffer.into_inner())
}
