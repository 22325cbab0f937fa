//! Integration tests for scanning real image files.
//!
//! These tests verify end-to-end behavior including:
//! - Cross-format duplicates (JPEG and a lossless PNG of its pixels)
//! - Undecodable files and missing roots
//! - Empty selections and cancellation

use image::{ImageFormat, Rgb, RgbImage};
use pixel_dedup::core::fingerprint::{FastDecoder, ImageDecoder};
use pixel_dedup::core::scanner::{CancellationToken, Scanner};
use pixel_dedup::core::ReportStatus;
use pixel_dedup::error::ScanError;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn gradient(width: u32, height: u32, seed: u8) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 7) as u8 ^ seed,
            (y * 5) as u8,
            ((x + y) as u8).wrapping_mul(seed | 1),
        ])
    })
}

/// a.jpg, b.png holding a.jpg's decoded pixels, and an unrelated c.jpg
fn photo_dir() -> (TempDir, PathBuf, PathBuf, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let a = temp_dir.path().join("a.jpg");
    let b = temp_dir.path().join("b.png");
    let c = temp_dir.path().join("c.jpg");

    gradient(48, 32, 3)
        .save_with_format(&a, ImageFormat::Jpeg)
        .unwrap();
    let decoded = FastDecoder::new().decode(&a).unwrap();
    decoded.save_with_format(&b, ImageFormat::Png).unwrap();
    gradient(48, 32, 200)
        .save_with_format(&c, ImageFormat::Jpeg)
        .unwrap();

    (
        temp_dir,
        fs::canonicalize(a).unwrap(),
        fs::canonicalize(b).unwrap(),
        fs::canonicalize(c).unwrap(),
    )
}

#[test]
fn jpeg_and_png_with_same_pixels_are_duplicates() {
    let (temp_dir, a, b, c) = photo_dir();

    let outcome = Scanner::builder()
        .build()
        .unwrap()
        .scan(&[temp_dir.path().to_path_buf()])
        .unwrap();

    let groups: Vec<_> = outcome.index.duplicate_groups().collect();
    assert_eq!(groups.len(), 1);
    let mut members = groups[0].paths();
    members.sort();
    assert_eq!(members, vec![a, b]);
    assert!(outcome.index.contains(&c));

    let report = outcome.report();
    assert_eq!(report.status, ReportStatus::DuplicatesFound { groups: 1 });
    assert!(!report.to_string().contains("c.jpg"));
}

#[test]
fn byte_identical_copy_under_another_name_is_a_duplicate() {
    let temp_dir = TempDir::new().unwrap();
    let original = temp_dir.path().join("holiday.png");
    gradient(16, 16, 9)
        .save_with_format(&original, ImageFormat::Png)
        .unwrap();
    fs::copy(&original, temp_dir.path().join("holiday (copy).png")).unwrap();

    let outcome = Scanner::builder()
        .build()
        .unwrap()
        .scan(&[temp_dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(outcome.index.duplicate_group_count(), 1);
}

#[test]
fn one_changed_pixel_is_not_a_duplicate() {
    let temp_dir = TempDir::new().unwrap();
    let image = gradient(16, 16, 9);
    let mut changed = image.clone();
    changed.put_pixel(3, 3, Rgb([1, 2, 3]));
    image
        .save_with_format(temp_dir.path().join("a.png"), ImageFormat::Png)
        .unwrap();
    changed
        .save_with_format(temp_dir.path().join("b.png"), ImageFormat::Png)
        .unwrap();

    let outcome = Scanner::builder()
        .build()
        .unwrap()
        .scan(&[temp_dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(outcome.report().status, ReportStatus::NoDuplicates);
    assert_eq!(outcome.files_fingerprinted, 2);
}

#[test]
fn undecodable_file_is_skipped() {
    let (temp_dir, ..) = photo_dir();
    fs::write(temp_dir.path().join("notes.jpg"), b"this is not a valid image file").unwrap();

    let outcome = Scanner::builder()
        .build()
        .unwrap()
        .scan(&[temp_dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(outcome.files_discovered, 4);
    assert_eq!(outcome.files_fingerprinted, 3);
    assert_eq!(outcome.failures.len(), 1);
    assert!(outcome.failures[0].path.ends_with("notes.jpg"));
    assert_eq!(outcome.index.duplicate_group_count(), 1);
}

#[test]
fn no_directories_selected() {
    let outcome = Scanner::builder().build().unwrap().scan(&[]).unwrap();

    assert_eq!(outcome.report().status, ReportStatus::NoDirectoriesSelected);
    assert_eq!(outcome.report().to_string(), "No directories selected.\n");
}

#[test]
fn every_root_missing_is_an_error() {
    let result = Scanner::builder()
        .build()
        .unwrap()
        .scan(&[PathBuf::from("/nonexistent/path/that/does/not/exist")]);

    match result {
        Err(ScanError::NoAccessibleRoots { roots }) => assert_eq!(roots.len(), 1),
        other => panic!("Expected NoAccessibleRoots, got {:?}", other.map(|o| o.files_discovered)),
    }
}

#[test]
fn overlapping_roots_index_each_file_once() {
    let (temp_dir, ..) = photo_dir();
    let nested = temp_dir.path().join("nested");
    fs::create_dir(&nested).unwrap();
    gradient(8, 8, 1)
        .save_with_format(nested.join("d.png"), ImageFormat::Png)
        .unwrap();

    let outcome = Scanner::builder()
        .build()
        .unwrap()
        .scan(&[temp_dir.path().to_path_buf(), nested.clone(), nested])
        .unwrap();

    assert_eq!(outcome.files_discovered, 4);
    assert_eq!(outcome.index.len(), 4);
}

#[test]
fn results_do_not_depend_on_thread_count() {
    let (temp_dir, ..) = photo_dir();
    for i in 0..6 {
        gradient(12, 12, (i % 2) as u8 + 40)
            .save_with_format(temp_dir.path().join(format!("g{}.png", i)), ImageFormat::Png)
            .unwrap();
    }
    let roots = [temp_dir.path().to_path_buf()];

    let groups_with = |threads: usize| {
        let outcome = Scanner::builder()
            .threads(threads)
            .build()
            .unwrap()
            .scan(&roots)
            .unwrap();
        outcome
            .index
            .duplicate_groups()
            .map(|g| g.paths())
            .collect::<Vec<_>>()
    };

    let single = groups_with(1);
    assert_eq!(single.len(), 3);
    assert_eq!(single, groups_with(8));
}

#[test]
fn cancelled_scan_returns_partial_outcome() {
    let (temp_dir, ..) = photo_dir();
    let token = CancellationToken::new();
    token.cancel();

    let outcome = Scanner::builder()
        .cancellation(token)
        .build()
        .unwrap()
        .scan(&[temp_dir.path().to_path_buf()])
        .unwrap();

    assert!(outcome.cancelled);
    assert!(outcome.index.is_empty());
    assert_eq!(outcome.report().status, ReportStatus::NoDuplicates);
}

#[test]
fn truncated_keys_still_separate_distinct_images() {
    let (temp_dir, a, ..) = photo_dir();

    let outcome = Scanner::builder()
        .key_bytes(4)
        .build()
        .unwrap()
        .scan(&[temp_dir.path().to_path_buf()])
        .unwrap();

    let record = outcome.index.get(Path::new(&a)).unwrap();
    assert_eq!(record.fingerprint.to_hex().len(), 8);
    assert_eq!(outcome.index.duplicate_group_count(), 1);
}

#[test]
fn only_duplicate_members_keep_their_pixels() {
    let (temp_dir, a, b, c) = photo_dir();

    let outcome = Scanner::builder()
        .build()
        .unwrap()
        .scan(&[temp_dir.path().to_path_buf()])
        .unwrap();

    assert!(outcome.index.get(&a).unwrap().decoded.is_some());
    assert!(outcome.index.get(&b).unwrap().decoded.is_some());
    assert!(outcome.index.get(&c).unwrap().decoded.is_none());
}

#[test]
fn pixels_can_be_left_out_entirely() {
    let (temp_dir, a, ..) = photo_dir();

    let outcome = Scanner::builder()
        .retain_pixels(false)
        .build()
        .unwrap()
        .scan(&[temp_dir.path().to_path_buf()])
        .unwrap();

    assert!(outcome.index.get(&a).unwrap().decoded.is_none());
    assert_eq!(outcome.index.duplicate_group_count(), 1);
}
