//! Integration tests for reviewing and deleting duplicates on disk.

use assert_fs::prelude::*;
use assert_fs::TempDir;
use image::{ImageFormat, Rgb, RgbImage};
use pixel_dedup::core::review::{FileRemover, PermanentRemover, ReviewConfig, ReviewSession};
use pixel_dedup::core::scanner::Scanner;
use pixel_dedup::core::ReportStatus;
use pixel_dedup::error::ReviewError;
use predicates::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

fn write_png(dir: &TempDir, name: &str, seed: u8) -> PathBuf {
    let child = dir.child(name);
    RgbImage::from_fn(640, 480, |x, y| Rgb([(x % 251) as u8 ^ seed, (y % 241) as u8, seed]))
        .save_with_format(child.path(), ImageFormat::Png)
        .unwrap();
    fs::canonicalize(child.path()).unwrap()
}

fn scanned_session(dir: &TempDir, remover: Box<dyn FileRemover>) -> ReviewSession {
    let outcome = Scanner::builder()
        .build()
        .unwrap()
        .scan(&[dir.path().to_path_buf()])
        .unwrap();
    ReviewSession::new(outcome.index, ReviewConfig::default(), remover)
}

struct ReadOnlyStorage;

impl FileRemover for ReadOnlyStorage {
    fn remove(&self, _path: &Path) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only volume"))
    }
}

#[test]
fn delete_removes_file_and_resolves_group() {
    let dir = TempDir::new().unwrap();
    let keep = write_png(&dir, "keep.png", 7);
    let extra = write_png(&dir, "extra.png", 7);
    write_png(&dir, "other.png", 99);

    let session = scanned_session(&dir, Box::new(PermanentRemover));
    assert_eq!(session.list_duplicates().unwrap().len(), 1);

    let deleted = session.delete(&extra).unwrap();

    assert!(deleted.group_resolved);
    dir.child("extra.png").assert(predicate::path::missing());
    dir.child("keep.png").assert(predicate::path::exists());
    assert!(session.list_duplicates().unwrap().is_empty());
    assert_eq!(session.report().unwrap().status, ReportStatus::NoDuplicates);
    assert!(session.contains(&keep).unwrap());
}

#[test]
fn second_delete_of_same_path_is_not_found() {
    let dir = TempDir::new().unwrap();
    write_png(&dir, "a.png", 1);
    let b = write_png(&dir, "b.png", 1);

    let session = scanned_session(&dir, Box::new(PermanentRemover));

    session.delete(&b).unwrap();
    let again = session.delete(&b);

    assert!(matches!(again, Err(ReviewError::NotFound { .. })));
}

#[test]
fn refused_delete_leaves_file_and_index() {
    let dir = TempDir::new().unwrap();
    let a = write_png(&dir, "a.png", 1);
    write_png(&dir, "b.png", 1);

    let session = scanned_session(&dir, Box::new(ReadOnlyStorage));
    let before = session.list_duplicates().unwrap();

    let result = session.delete(&a);

    assert!(matches!(result, Err(ReviewError::StorageDelete { .. })));
    dir.child("a.png").assert(predicate::path::exists());
    assert_eq!(session.list_duplicates().unwrap(), before);
}

#[test]
fn renditions_fit_the_preview_box() {
    let dir = TempDir::new().unwrap();
    let a = write_png(&dir, "a.png", 1);
    write_png(&dir, "b.png", 1);

    let session = scanned_session(&dir, Box::new(PermanentRemover));
    let rendition = session.get_rendition(&a).unwrap();

    assert_eq!((rendition.width, rendition.height), (400, 300));
}

#[test]
fn renditions_decode_from_disk_without_retained_pixels() {
    let dir = TempDir::new().unwrap();
    let a = write_png(&dir, "a.png", 1);
    write_png(&dir, "b.png", 1);

    let outcome = Scanner::builder()
        .retain_pixels(false)
        .build()
        .unwrap()
        .scan(&[dir.path().to_path_buf()])
        .unwrap();
    assert!(outcome.index.get(&a).unwrap().decoded.is_none());

    let session = ReviewSession::new(
        outcome.index,
        ReviewConfig {
            rendition_max: (64, 64),
        },
        Box::new(PermanentRemover),
    );
    let rendition = session.get_rendition(&a).unwrap();

    assert_eq!((rendition.width, rendition.height), (64, 48));
}

#[test]
fn review_of_empty_selection_says_no_directories() {
    let outcome = Scanner::builder().build().unwrap().scan(&[]).unwrap();

    let session =
        ReviewSession::from_outcome(outcome, ReviewConfig::default(), Box::new(PermanentRemover));

    assert!(session.list_duplicates().unwrap().is_empty());
    assert_eq!(
        session.report().unwrap().to_string(),
        "No directories selected.\n"
    );
}

#[test]
fn review_of_scanned_directory_without_duplicates_says_so() {
    let dir = TempDir::new().unwrap();
    write_png(&dir, "only.png", 5);

    let outcome = Scanner::builder()
        .build()
        .unwrap()
        .scan(&[dir.path().to_path_buf()])
        .unwrap();
    let session =
        ReviewSession::from_outcome(outcome, ReviewConfig::default(), Box::new(PermanentRemover));

    assert_eq!(session.report().unwrap().status, ReportStatus::NoDuplicates);
}
