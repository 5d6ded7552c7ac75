mod common;

use common::{tar_gz, Entry};
use kcpvisor_core::acquire::ReleaseFetcher;
use kcpvisor_core::error::{FetchError, KcpvisorError};
use kcpvisor_core::sink::BufferSink;
use kcpvisor_core::types::{Arch, Os, Platform};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

const ASSET_NAME: &str = "kcptun-linux-amd64-20230101.tar.gz";

fn linux() -> Platform {
    Platform::new(Os::Linux, Arch::Amd64)
}

fn fetcher(server: &MockServer, install_dir: &Path, timeout: Duration) -> (ReleaseFetcher, Arc<BufferSink>) {
    let sink = Arc::new(BufferSink::new());
    let fetcher = ReleaseFetcher::new(
        format!("{}/repos/xtaci/kcptun/releases/latest", server.uri()),
        install_dir,
        linux(),
        "client_",
        timeout,
        sink.clone(),
    )
    .unwrap();
    (fetcher, sink)
}

async fn mount_release(server: &MockServer, assets: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/repos/xtaci/kcptun/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tag_name": "v20230101",
            "assets": assets,
        })))
        .mount(server)
        .await;
}

/// Test the full fetch pipeline installs the client binary
#[tokio::test]
async fn test_acquire_downloads_and_extracts() {
    let server = MockServer::start().await;
    let root = tempdir().unwrap();
    let install_dir = root.path().join("bin");

    mount_release(
        &server,
        json!([
            {"name": "kcptun-windows-amd64-20230101.tar.gz", "browser_download_url": format!("{}/dl/windows.tar.gz", server.uri())},
            {"name": ASSET_NAME, "browser_download_url": format!("{}/dl/linux.tar.gz", server.uri())},
        ]),
    )
    .await;

    let archive = tar_gz(&[
        Entry::File("client_linux_amd64", b"#!/bin/sh\necho client\n"),
        Entry::File("server_linux_amd64", b"#!/bin/sh\necho server\n"),
    ]);
    Mock::given(method("GET"))
        .and(path("/dl/linux.tar.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
        .expect(1)
        .mount(&server)
        .await;

    let (fetcher, sink) = fetcher(&server, &install_dir, Duration::from_secs(5));
    let binary = fetcher.acquire().await.unwrap();

    assert_eq!(binary, install_dir.join("client_linux_amd64"));
    assert!(install_dir.join(ASSET_NAME).is_file());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&binary).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    let log = sink.contents();
    assert!(log.contains("v20230101"));
    assert!(log.contains(&format!("downloaded {}", ASSET_NAME)));
    assert!(log.contains("decompressed"));
}

/// Test a 404 on the asset aborts before anything is written
#[tokio::test]
async fn test_asset_404_creates_no_files() {
    let server = MockServer::start().await;
    let root = tempdir().unwrap();
    let install_dir = root.path().join("bin");

    mount_release(
        &server,
        json!([{"name": ASSET_NAME, "browser_download_url": format!("{}/dl/missing.tar.gz", server.uri())}]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/dl/missing.tar.gz"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (fetcher, _sink) = fetcher(&server, &install_dir, Duration::from_secs(5));
    let err = fetcher.acquire().await.unwrap_err();

    match err {
        KcpvisorError::Fetch(FetchError::Status { status }) => assert!(status.contains("404")),
        other => panic!("Expected status error, got {:?}", other),
    }
    assert!(!install_dir.exists());
}

/// Test a release without a platform asset fails before any download
#[tokio::test]
async fn test_no_matching_asset_skips_download() {
    let server = MockServer::start().await;
    let root = tempdir().unwrap();
    let install_dir = root.path().join("bin");

    mount_release(
        &server,
        json!([{"name": "kcptun-freebsd-amd64-20230101.tar.gz", "browser_download_url": format!("{}/dl/bsd.tar.gz", server.uri())}]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/dl/bsd.tar.gz"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (fetcher, _sink) = fetcher(&server, &install_dir, Duration::from_secs(5));
    let err = fetcher.acquire().await.unwrap_err();

    assert!(matches!(
        err,
        KcpvisorError::Fetch(FetchError::NoMatchingAsset { .. })
    ));
    assert!(!install_dir.exists());
}

/// Test release listing errors are surfaced with their status
#[tokio::test]
async fn test_metadata_error_status() {
    let server = MockServer::start().await;
    let root = tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/repos/xtaci/kcptun/releases/latest"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let (fetcher, _sink) = fetcher(&server, root.path(), Duration::from_secs(5));
    let err = fetcher.fetch_metadata().await.unwrap_err();

    assert!(matches!(err, FetchError::Status { .. }));
}

/// Test malformed listings are decode errors
#[tokio::test]
async fn test_metadata_malformed_json() {
    let server = MockServer::start().await;
    let root = tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/repos/xtaci/kcptun/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"message\": \"API rate limit"))
        .mount(&server)
        .await;

    let (fetcher, _sink) = fetcher(&server, root.path(), Duration::from_secs(5));
    let err = fetcher.fetch_metadata().await.unwrap_err();

    assert!(matches!(err, FetchError::Decode { .. }));
}

/// Test slow endpoints hit the download timeout
#[tokio::test]
async fn test_metadata_timeout() {
    let server = MockServer::start().await;
    let root = tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/repos/xtaci/kcptun/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let (fetcher, _sink) = fetcher(&server, root.path(), Duration::from_secs(1));
    let err = fetcher.fetch_metadata().await.unwrap_err();

    assert_eq!(err, FetchError::Timeout { seconds: 1 });
}

/// Test a corrupt archive is reported as an extraction failure
#[tokio::test]
async fn test_corrupt_archive() {
    let server = MockServer::start().await;
    let root = tempdir().unwrap();

    mount_release(
        &server,
        json!([{"name": ASSET_NAME, "browser_download_url": format!("{}/dl/corrupt.tar.gz", server.uri())}]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/dl/corrupt.tar.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not an archive</html>"))
        .mount(&server)
        .await;

    let (fetcher, _sink) = fetcher(&server, root.path(), Duration::from_secs(5));
    let err = fetcher.acquire().await.unwrap_err();

    assert!(matches!(err, KcpvisorError::Extract(_)));
}
