//! # Error Module
//!
//! Error types for the duplicate image finder.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Per-file failures stay local** - only a scan with no usable root is fatal

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum DedupError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Fingerprint error: {0}")]
    Fingerprint(#[from] FingerprintError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Review error: {0}")]
    Review(#[from] ReviewError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that occur while walking the selected directories
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("None of the selected directories could be read: {}", display_paths(.roots))]
    NoAccessibleRoots { roots: Vec<PathBuf> },

    #[error("Failed to start worker pool: {0}")]
    WorkerPool(String),

    #[error("A scan worker panicked")]
    WorkerPanicked,
}

/// Errors that occur while decoding and fingerprinting a single file
#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("Failed to open image file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Image is empty or corrupted: {path}")]
    EmptyImage { path: PathBuf },
}

impl FingerprintError {
    /// Path of the file that failed
    pub fn path(&self) -> &PathBuf {
        match self {
            FingerprintError::Io { path, .. }
            | FingerprintError::Decode { path, .. }
            | FingerprintError::EmptyImage { path } => path,
        }
    }
}

/// A fingerprint string that is not 1 to 32 bytes of hex
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFingerprintError {
    #[error("Fingerprint must be an even number of hex characters, at most {max}; got {len}")]
    Length { len: usize, max: usize },

    #[error("Fingerprint is not hexadecimal: {value}")]
    InvalidHex { value: String },
}

/// Errors raised by the duplicate index
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Path is already indexed: {path}")]
    DuplicatePath { path: PathBuf },
}

/// Errors raised during an interactive review
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Image is not in the duplicate index (already deleted?): {path}")]
    NotFound { path: PathBuf },

    #[error("Failed to delete {path} from storage: {source}")]
    StorageDelete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build preview for {path}: {reason}")]
    Rendition { path: PathBuf, reason: String },

    #[error("Review state lock was poisoned")]
    Poisoned,
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, DedupError>;
