//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the scanner and review session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Directory traversal events
    Scan(ScanEvent),
    /// Per-file fingerprinting events
    Fingerprint(FingerprintEvent),
    /// Review and deletion events
    Review(ReviewEvent),
}

/// Events during directory traversal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Scanning has started
    Started { roots: Vec<PathBuf> },
    /// A root could not be read and was skipped
    RootSkipped { path: PathBuf, message: String },
    /// A file was queued for fingerprinting
    FileQueued { path: PathBuf, discovered: usize },
    /// Traversal finished (all files queued, or cancelled)
    TraversalFinished { discovered: usize },
    /// Scan was cancelled by the caller
    Cancelled,
    /// Scanning completed and the index is ready
    Completed(ScanSummary),
}

/// Final counters for a scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Regular files handed to the fingerprinter
    pub files_discovered: usize,
    /// Files that decoded and were indexed
    pub files_fingerprinted: usize,
    /// Files that could not be decoded
    pub files_failed: usize,
    /// Groups with two or more members
    pub duplicate_groups: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

/// Events during fingerprinting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FingerprintEvent {
    /// Progress update after each merged result
    Progress(FingerprintProgress),
    /// A file could not be decoded; it is left out of the index
    Error { path: PathBuf, message: String },
}

/// Progress information during fingerprinting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintProgress {
    /// Number of files processed so far (success or failure)
    pub completed: usize,
    /// Number of files discovered so far
    pub discovered: usize,
    /// File that was just processed
    pub current_path: PathBuf,
}

/// Events during review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReviewEvent {
    /// A file was deleted from storage and removed from the index
    Deleted { path: PathBuf, remaining: usize },
    /// A group dropped below two members and is no longer a duplicate
    GroupResolved { fingerprint: String },
    /// A deletion was refused by storage; the index is unchanged
    DeleteFailed { path: PathBuf, message: String },
}
