mod common;

use std::io::Write;
use std::time::{Duration, Instant};

use mangafire_dl::{DownloadError, DownloaderConfig, Fetcher};

use common::config_for;

#[tokio::test]
async fn test_stalled_response_times_out() {
    let mut server = mockito::Server::new_async().await;
    let _slow = server
        .mock("GET", "/slow")
        .with_chunked_body(|w| {
            std::thread::sleep(Duration::from_secs(3));
            w.write_all(b"too late")
        })
        .create_async()
        .await;

    let config = DownloaderConfig { timeout_secs: 1, ..config_for(&server) };
    let fetcher = Fetcher::new(&config).unwrap();

    let started = Instant::now();
    let err = fetcher.fetch_text("/slow").await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, DownloadError::RequestFailed(_)), "unexpected error: {:?}", err);
    assert!(err.is_network());
    assert!(elapsed >= Duration::from_millis(900), "gave up after {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(2500), "timeout not applied, took {:?}", elapsed);
}

#[tokio::test]
async fn test_prompt_response_within_timeout() {
    let mut server = mockito::Server::new_async().await;
    let _fast = server.mock("GET", "/fast").with_body("on time").create_async().await;

    let config = DownloaderConfig { timeout_secs: 1, ..config_for(&server) };
    let fetcher = Fetcher::new(&config).unwrap();

    assert_eq!(fetcher.fetch_text("/fast").await.unwrap(), "on time");
}
