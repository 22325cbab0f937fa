//! # Scanner Module
//!
//! Walks the selected directories, fingerprints every regular file on a
//! bounded worker pool and merges the results into a fresh `DuplicateIndex`.
//!
//! ## Pipeline
//! 1. **Resolve** - check each root; unusable roots are skipped, not fatal
//! 2. **Walk** - a traversal thread streams files into a bounded channel
//! 3. **Fingerprint** - a rayon pool decodes and digests files in parallel
//! 4. **Merge** - the calling thread is the single writer of the index and
//!    applies results in discovery order, so grouping never depends on
//!    worker scheduling
//!
//! ## Example
//! ```rust,ignore
//! use pixel_dedup::core::scanner::Scanner;
//!
//! let scanner = Scanner::builder().threads(4).build()?;
//! let outcome = scanner.scan(&["/Users/photos".into()])?;
//! println!("{}", outcome.report());
//! ```

mod filter;
mod walker;

pub use filter::FileFilter;

use crate::core::fingerprint::{
    FingerprintConfig, Fingerprinter, ImageRecord, PixelFingerprinter,
};
use crate::core::index::DuplicateIndex;
use crate::core::report::ScanReport;
use crate::error::{DedupError, FingerprintError, ScanError};
use crate::events::{
    null_sender, Event, EventSender, FingerprintEvent, FingerprintProgress, ScanEvent,
    ScanSummary,
};
use crossbeam_channel::{bounded, unbounded};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};
use walker::QueuedFile;

/// Configuration for a scan
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Whether to include hidden files and directories
    pub include_hidden: bool,
    /// Maximum directory depth (None = unlimited)
    pub max_depth: Option<usize>,
    /// Only attempt files with these extensions (None = every file)
    pub extensions: Option<Vec<String>>,
    /// Fingerprint worker threads (None = one per core)
    pub threads: Option<usize>,
    /// Files allowed to wait between traversal and the workers
    pub queue_capacity: usize,
    /// Fingerprint settings
    pub fingerprint: FingerprintConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            include_hidden: true,
            max_depth: None,
            extensions: None,
            threads: None,
            queue_capacity: 256,
            fingerprint: FingerprintConfig::default(),
        }
    }
}

/// Caller-triggered cancellation for a running scan.
///
/// Cloning shares the flag. Cancelling stops new work from being queued;
/// results already merged are kept.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A file that was discovered but could not be fingerprinted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Result of a scan
#[derive(Debug)]
pub struct ScanOutcome {
    /// Freshly built index
    pub index: DuplicateIndex,
    /// Number of roots the caller selected
    pub roots_selected: usize,
    /// Regular files handed to the fingerprinter
    pub files_discovered: usize,
    /// Files merged into the index
    pub files_fingerprinted: usize,
    /// Files that failed to decode (non-fatal)
    pub failures: Vec<FileFailure>,
    /// Roots or subdirectories that could not be read (non-fatal)
    pub errors: Vec<ScanError>,
    /// The scan stopped early; the index holds what finished
    pub cancelled: bool,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl ScanOutcome {
    fn empty(roots_selected: usize, errors: Vec<ScanError>, duration_ms: u64) -> Self {
        Self {
            index: DuplicateIndex::new(),
            roots_selected,
            files_discovered: 0,
            files_fingerprinted: 0,
            failures: Vec::new(),
            errors,
            cancelled: false,
            duration_ms,
        }
    }

    /// User-facing report for this scan
    pub fn report(&self) -> ScanReport {
        if self.roots_selected == 0 {
            ScanReport::no_directories()
        } else {
            self.index.report()
        }
    }
}

/// Builder for scanner configuration
pub struct ScannerBuilder {
    config: ScanConfig,
    fingerprinter: Option<Box<dyn Fingerprinter>>,
    cancel: CancellationToken,
}

impl ScannerBuilder {
    pub fn new() -> Self {
        Self {
            config: ScanConfig::default(),
            fingerprinter: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.config.threads = Some(threads);
        self
    }

    pub fn include_hidden(mut self, include: bool) -> Self {
        self.config.include_hidden = include;
        self
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.config.follow_symlinks = follow;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = Some(depth);
        self
    }

    pub fn extensions(mut self, extensions: Vec<String>) -> Self {
        self.config.extensions = Some(extensions);
        self
    }

    /// Truncate fingerprints to `bytes` bytes.
    ///
    /// Raises the chance of unrelated images landing in one group.
    pub fn key_bytes(mut self, bytes: usize) -> Self {
        self.config.fingerprint.key_bytes = Some(bytes);
        self
    }

    /// Keep decoded pixels on each record (needed for fast previews)
    pub fn retain_pixels(mut self, retain: bool) -> Self {
        self.config.fingerprint.retain_pixels = retain;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Use a custom fingerprinter instead of decoding with the default codec
    pub fn fingerprinter(mut self, fingerprinter: Box<dyn Fingerprinter>) -> Self {
        self.fingerprinter = Some(fingerprinter);
        self
    }

    /// Share a cancellation token with the caller
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn build(self) -> Result<Scanner, DedupError> {
        if self.config.threads == Some(0) {
            return Err(DedupError::Config(
                "worker thread count must be at least 1".to_string(),
            ));
        }

        let fingerprinter = match self.fingerprinter {
            Some(f) => f,
            None => Box::new(PixelFingerprinter::new(self.config.fingerprint.clone())?),
        };

        Ok(Scanner {
            config: self.config,
            fingerprinter,
            cancel: self.cancel,
        })
    }
}

impl Default for ScannerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a `DuplicateIndex` from a set of root directories
pub struct Scanner {
    config: ScanConfig,
    fingerprinter: Box<dyn Fingerprinter>,
    cancel: CancellationToken,
}

impl Scanner {
    pub fn builder() -> ScannerBuilder {
        ScannerBuilder::new()
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Token that cancels this scanner's scans
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Scan without events
    pub fn scan(&self, roots: &[PathBuf]) -> Result<ScanOutcome, ScanError> {
        self.scan_with_events(roots, &null_sender())
    }

    /// Scan with progress reporting.
    ///
    /// Fails only when roots were given and none of them could be read.
    pub fn scan_with_events(
        &self,
        roots: &[PathBuf],
        events: &EventSender,
    ) -> Result<ScanOutcome, ScanError> {
        let start = Instant::now();

        events.send(Event::Scan(ScanEvent::Started {
            roots: roots.to_vec(),
        }));

        if roots.is_empty() {
            info!("no directories selected");
            let outcome = ScanOutcome::empty(0, Vec::new(), 0);
            events.send(Event::Scan(ScanEvent::Completed(summarize(&outcome))));
            return Ok(outcome);
        }

        let (usable_roots, mut errors) = walker::resolve_roots(roots, events);
        if usable_roots.is_empty() {
            return Err(ScanError::NoAccessibleRoots {
                roots: roots.to_vec(),
            });
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads.unwrap_or(0))
            .thread_name(|i| format!("fingerprint-{}", i))
            .build()
            .map_err(|e| ScanError::WorkerPool(e.to_string()))?;

        let (path_tx, path_rx) = bounded::<QueuedFile>(self.config.queue_capacity.max(1));
        let (result_tx, result_rx) = unbounded::<Fingerprinted>();
        let discovered = AtomicUsize::new(0);

        let config = &self.config;
        let cancel = &self.cancel;
        let fingerprinter: &dyn Fingerprinter = self.fingerprinter.as_ref();
        let discovered_ref = &discovered;

        let (walk_result, pool_result, merger) = thread::scope(|scope| {
            let walker = scope.spawn(move || {
                walker::walk_roots(&usable_roots, config, cancel, discovered_ref, events, path_tx)
            });

            let workers = scope.spawn(move || {
                pool.install(|| {
                    path_rx
                        .into_iter()
                        .par_bridge()
                        .for_each_with(result_tx, |tx, queued| {
                            let outcome = if cancel.is_cancelled() {
                                WorkOutcome::Skipped
                            } else {
                                WorkOutcome::Done(fingerprinter.fingerprint(&queued.path))
                            };
                            let _ = tx.send(Fingerprinted {
                                seq: queued.seq,
                                path: queued.path,
                                outcome,
                            });
                        });
                });
            });

            let mut merger = Merger::new(discovered_ref, events);
            for item in result_rx.iter() {
                merger.accept(item);
            }

            (walker.join(), workers.join(), merger)
        });

        let walk_errors = walk_result.map_err(|_| ScanError::WorkerPanicked)?;
        pool_result.map_err(|_| ScanError::WorkerPanicked)?;
        errors.extend(walk_errors);

        let merged = merger.finish();
        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            info!(merged = merged.fingerprinted, "scan cancelled, keeping partial index");
            events.send(Event::Scan(ScanEvent::Cancelled));
        }

        let outcome = ScanOutcome {
            index: merged.index,
            roots_selected: roots.len(),
            files_discovered: discovered.load(Ordering::SeqCst),
            files_fingerprinted: merged.fingerprinted,
            failures: merged.failures,
            errors,
            cancelled,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            discovered = outcome.files_discovered,
            indexed = outcome.files_fingerprinted,
            failed = outcome.failures.len(),
            duplicate_groups = outcome.index.duplicate_group_count(),
            duration_ms = outcome.duration_ms,
            "scan finished"
        );

        events.send(Event::Scan(ScanEvent::Completed(summarize(&outcome))));

        Ok(outcome)
    }
}

fn summarize(outcome: &ScanOutcome) -> ScanSummary {
    ScanSummary {
        files_discovered: outcome.files_discovered,
        files_fingerprinted: outcome.files_fingerprinted,
        files_failed: outcome.failures.len(),
        duplicate_groups: outcome.index.duplicate_group_count(),
        duration_ms: outcome.duration_ms,
    }
}

enum WorkOutcome {
    Done(Result<ImageRecord, FingerprintError>),
    /// Dequeued after cancellation; never started
    Skipped,
}

struct Fingerprinted {
    seq: usize,
    path: PathBuf,
    outcome: WorkOutcome,
}

struct Merged {
    index: DuplicateIndex,
    fingerprinted: usize,
    failures: Vec<FileFailure>,
}

/// Single writer of the index.
///
/// Results arrive in completion order; they are held back until every
/// earlier discovery has been applied.
struct Merger<'a> {
    index: DuplicateIndex,
    pending: BTreeMap<usize, Fingerprinted>,
    next_seq: usize,
    completed: usize,
    fingerprinted: usize,
    failures: Vec<FileFailure>,
    discovered: &'a AtomicUsize,
    events: &'a EventSender,
}

impl<'a> Merger<'a> {
    fn new(discovered: &'a AtomicUsize, events: &'a EventSender) -> Self {
        Self {
            index: DuplicateIndex::new(),
            pending: BTreeMap::new(),
            next_seq: 0,
            completed: 0,
            fingerprinted: 0,
            failures: Vec::new(),
            discovered,
            events,
        }
    }

    fn accept(&mut self, item: Fingerprinted) {
        self.pending.insert(item.seq, item);
        while let Some(item) = self.pending.remove(&self.next_seq) {
            self.next_seq += 1;
            self.apply(item);
        }
    }

    fn apply(&mut self, item: Fingerprinted) {
        match item.outcome {
            WorkOutcome::Skipped => return,
            WorkOutcome::Done(Ok(record)) => match self.index.insert(record) {
                Ok(()) => self.fingerprinted += 1,
                Err(error) => warn!(%error, "dropping repeated path"),
            },
            WorkOutcome::Done(Err(error)) => {
                let path = error.path().clone();
                let message = error.to_string();
                warn!(path = %path.display(), %error, "skipping unreadable file");
                self.events.send(Event::Fingerprint(FingerprintEvent::Error {
                    path: path.clone(),
                    message: message.clone(),
                }));
                self.failures.push(FileFailure { path, message });
            }
        }

        self.completed += 1;
        self.events
            .send(Event::Fingerprint(FingerprintEvent::Progress(FingerprintProgress {
                completed: self.completed,
                discovered: self.discovered.load(Ordering::SeqCst),
                current_path: item.path,
            })));
    }

    /// Apply anything still held back, in sequence order
    fn finish(mut self) -> Merged {
        let pending = std::mem::take(&mut self.pending);
        for (_, item) in pending {
            self.apply(item);
        }

        let released = self.index.release_unique_pixels();
        if released > 0 {
            debug!(released, "dropped pixels of images without a duplicate");
        }

        Merged {
            index: self.index,
            fingerprinted: self.fingerprinted,
            failures: self.failures,
        }
    }
}
