mod common;

use std::fs;

use common::serve;
use robot_order::error::{AppError, DownloadError};
use robot_order::services::FileFetcher;
use tokio_test::assert_ok;

#[tokio::test]
async fn test_download_overwrites_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let base_url = serve("/orders.csv", "Order number\n1\n".to_string()).await;
    let destination = dir.path().join("data").join("orders.csv");
    fs::create_dir_all(destination.parent().unwrap()).unwrap();
    fs::write(&destination, "old content").unwrap();

    let saved = assert_ok!(
        FileFetcher::new()
            .download(&format!("{}/orders.csv", base_url), &destination, true)
            .await
    );

    assert_eq!(saved, destination);
    assert_eq!(fs::read_to_string(&destination).unwrap(), "Order number\n1\n");
    assert!(!dir.path().join("data").join("orders.csv.part").exists());
}

#[tokio::test]
async fn test_download_without_overwrite_keeps_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let base_url = serve("/orders.csv", "new".to_string()).await;
    let destination = dir.path().join("orders.csv");
    fs::write(&destination, "old").unwrap();

    let err = FileFetcher::new()
        .download(&format!("{}/orders.csv", base_url), &destination, false)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Download(DownloadError::AlreadyExists { .. })));
    assert_eq!(fs::read_to_string(&destination).unwrap(), "old");
}

#[tokio::test]
async fn test_download_bad_status_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let base_url = serve("/orders.csv", String::new()).await;
    let destination = dir.path().join("orders.csv");

    let err = FileFetcher::new()
        .download(&format!("{}/missing.csv", base_url), &destination, true)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Download(DownloadError::BadStatus { status: 404, .. })
    ));
    assert!(!err.is_recoverable());
    assert!(!destination.exists());
}
