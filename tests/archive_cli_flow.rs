//! Archiving a populated output root (C9), exercised through the public
//! `archive::write` entry point the CLI's `--archive` flag calls.

use assert_fs::prelude::*;
use webgrab::archive::{self, ArchiveFormat};

#[tokio::test]
async fn zips_a_populated_output_root() {
    let root = assert_fs::TempDir::new().unwrap();
    root.child("index.html").write_str("<html></html>").unwrap();
    root.child("assets/style.css").write_str("body{}").unwrap();

    let archive_path = archive::write(root.path(), ArchiveFormat::Zip).await.unwrap();
    assert!(archive_path.exists());
    assert_eq!(archive_path.extension().unwrap(), "zip");
}

#[tokio::test]
async fn tar_gz_a_populated_output_root() {
    let root = assert_fs::TempDir::new().unwrap();
    root.child("index.html").write_str("<html></html>").unwrap();

    let archive_path = archive::write(root.path(), ArchiveFormat::TarGz).await.unwrap();
    assert!(archive_path.exists());
}
