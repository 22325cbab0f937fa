//! # Review Module
//!
//! Interactive review over a finished `DuplicateIndex`.
//!
//! A session lists the current duplicate groups, hands out cached preview
//! renditions and deletes files. A delete touches storage first and only
//! updates the index once storage has accepted it, so a refused delete
//! leaves the session exactly as it was.
//!
//! ## Example
//! ```rust,ignore
//! use pixel_dedup::core::review::{ReviewConfig, ReviewSession, TrashRemover};
//!
//! let session = ReviewSession::from_outcome(outcome, ReviewConfig::default(), Box::new(TrashRemover));
//! for group in session.list_duplicates()? {
//!     let preview = session.get_rendition(&group.members[0].path)?;
//! }
//! session.delete(&path)?;
//! ```

mod rendition;

pub use rendition::{fit_dimensions, Rendition, RenditionBuilder};

use crate::core::fingerprint::{FastDecoder, Fingerprint, ImageDecoder};
use crate::core::index::{DuplicateIndex, GroupChange, Removal, RemovedRecord};
use crate::core::report::ScanReport;
use crate::core::scanner::ScanOutcome;
use crate::error::ReviewError;
use crate::events::{null_sender, Event, EventSender, ReviewEvent};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Deletes a file from storage
pub trait FileRemover: Send + Sync {
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Removes files for good
#[derive(Debug, Clone, Copy, Default)]
pub struct PermanentRemover;

impl FileRemover for PermanentRemover {
    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// Moves files to the system trash so they can be restored
#[derive(Debug, Clone, Copy, Default)]
pub struct TrashRemover;

impl FileRemover for TrashRemover {
    fn remove(&self, path: &Path) -> io::Result<()> {
        trash::delete(path).map_err(|e| io::Error::other(e.to_string()))
    }
}

/// Settings for a review session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewConfig {
    /// Bounding box for preview renditions (width, height)
    pub rendition_max: (u32, u32),
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            rendition_max: (400, 400),
        }
    }
}

/// One member of a listed group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberView {
    pub path: PathBuf,
    pub dimensions: (u32, u32),
}

/// Snapshot of a duplicate group at listing time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupView {
    pub fingerprint: Fingerprint,
    /// Members in discovery order
    pub members: Vec<MemberView>,
}

impl GroupView {
    pub fn paths(&self) -> Vec<PathBuf> {
        self.members.iter().map(|m| m.path.clone()).collect()
    }
}

/// A completed delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deleted {
    pub path: PathBuf,
    /// Members left in the file's group
    pub remaining: usize,
    /// The group dropped below two members
    pub group_resolved: bool,
}

struct ReviewState {
    index: DuplicateIndex,
    renditions: HashMap<PathBuf, Arc<Rendition>>,
}

/// Review over a duplicate index.
///
/// Safe to share between threads; index and rendition cache change together
/// under one lock.
pub struct ReviewSession {
    state: RwLock<ReviewState>,
    config: ReviewConfig,
    remover: Box<dyn FileRemover>,
    decoder: Box<dyn ImageDecoder>,
    events: EventSender,
    /// False when the session came from a scan with no roots
    directories_selected: bool,
}

impl ReviewSession {
    pub fn new(index: DuplicateIndex, config: ReviewConfig, remover: Box<dyn FileRemover>) -> Self {
        Self {
            state: RwLock::new(ReviewState {
                index,
                renditions: HashMap::new(),
            }),
            config,
            remover,
            decoder: Box::new(FastDecoder::new()),
            events: null_sender(),
            directories_selected: true,
        }
    }

    /// Review the index of a finished scan.
    ///
    /// Remembers whether any directories were selected so the report can
    /// say so.
    pub fn from_outcome(
        outcome: ScanOutcome,
        config: ReviewConfig,
        remover: Box<dyn FileRemover>,
    ) -> Self {
        let directories_selected = outcome.roots_selected > 0;
        Self {
            directories_selected,
            ..Self::new(outcome.index, config, remover)
        }
    }

    /// Report deletes on `events`
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    /// Decoder used when a record carries no pixels
    pub fn with_decoder(mut self, decoder: Box<dyn ImageDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, ReviewState>, ReviewError> {
        self.state.read().map_err(|_| ReviewError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, ReviewState>, ReviewError> {
        self.state.write().map_err(|_| ReviewError::Poisoned)
    }

    /// Current duplicate groups, in index order
    pub fn list_duplicates(&self) -> Result<Vec<GroupView>, ReviewError> {
        let state = self.read()?;
        Ok(state
            .index
            .duplicate_groups()
            .map(|group| GroupView {
                fingerprint: group.fingerprint(),
                members: group
                    .records()
                    .iter()
                    .map(|r| MemberView {
                        path: r.path.clone(),
                        dimensions: r.dimensions,
                    })
                    .collect(),
            })
            .collect())
    }

    /// Preview for an indexed image, built on first request.
    ///
    /// The resize runs without holding the lock; the result is cached only if
    /// the path is still indexed afterwards.
    pub fn get_rendition(&self, path: &Path) -> Result<Arc<Rendition>, ReviewError> {
        let pixels = {
            let state = self.read()?;
            if let Some(rendition) = state.renditions.get(path) {
                return Ok(Arc::clone(rendition));
            }
            let record = state.index.get(path).ok_or_else(|| ReviewError::NotFound {
                path: path.to_path_buf(),
            })?;
            record.decoded.clone()
        };

        let image = match pixels {
            Some(image) => image,
            None => {
                debug!(path = %path.display(), "decoding for preview");
                let image = self
                    .decoder
                    .decode(path)
                    .map_err(|e| ReviewError::Rendition {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    })?;
                Arc::new(image)
            }
        };

        let (max_width, max_height) = self.config.rendition_max;
        let rendition =
            Arc::new(RenditionBuilder::new().fit(path, &image, max_width, max_height)?);

        let mut state = self.write()?;
        if !state.index.contains(path) {
            return Err(ReviewError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let cached = state
            .renditions
            .entry(path.to_path_buf())
            .or_insert(rendition);

        Ok(Arc::clone(cached))
    }

    /// Delete a file from storage and drop it from the index.
    ///
    /// Storage goes first. If it refuses, nothing in the session changes.
    pub fn delete(&self, path: &Path) -> Result<Deleted, ReviewError> {
        let mut state = self.write()?;

        if !state.index.contains(path) {
            return Err(ReviewError::NotFound {
                path: path.to_path_buf(),
            });
        }

        if let Err(source) = self.remover.remove(path) {
            warn!(path = %path.display(), error = %source, "storage refused delete");
            self.events.send(Event::Review(ReviewEvent::DeleteFailed {
                path: path.to_path_buf(),
                message: source.to_string(),
            }));
            return Err(ReviewError::StorageDelete {
                path: path.to_path_buf(),
                source,
            });
        }

        let removed = take_record(&mut state, path)?;
        drop(state);

        info!(path = %path.display(), remaining = removed.remaining, "deleted");
        Ok(self.announce(removed))
    }

    /// Drop a record from the index without touching storage.
    ///
    /// For files the caller has already moved or removed.
    pub fn forget(&self, path: &Path) -> Result<Deleted, ReviewError> {
        let mut state = self.write()?;
        let removed = take_record(&mut state, path)?;
        drop(state);

        debug!(path = %path.display(), "forgotten");
        Ok(self.announce(removed))
    }

    fn announce(&self, removed: RemovedRecord) -> Deleted {
        let group_resolved = removed.change == GroupChange::NoLongerDuplicate;

        self.events.send(Event::Review(ReviewEvent::Deleted {
            path: removed.record.path.clone(),
            remaining: removed.remaining,
        }));
        if group_resolved {
            self.events.send(Event::Review(ReviewEvent::GroupResolved {
                fingerprint: removed.record.fingerprint.to_hex(),
            }));
        }

        Deleted {
            path: removed.record.path,
            remaining: removed.remaining,
            group_resolved,
        }
    }

    /// Whether `path` is still indexed
    pub fn contains(&self, path: &Path) -> Result<bool, ReviewError> {
        Ok(self.read()?.index.contains(path))
    }

    /// Number of cached renditions
    pub fn cached_renditions(&self) -> Result<usize, ReviewError> {
        Ok(self.read()?.renditions.len())
    }

    /// Report over the index as it stands now
    pub fn report(&self) -> Result<ScanReport, ReviewError> {
        if !self.directories_selected {
            return Ok(ScanReport::no_directories());
        }
        Ok(self.read()?.index.report())
    }

    /// Swap in a freshly scanned index; cached renditions are dropped
    pub fn reset(&self, index: DuplicateIndex) -> Result<(), ReviewError> {
        let mut state = self.write()?;
        state.index = index;
        state.renditions.clear();
        Ok(())
    }

    pub fn into_index(self) -> Result<DuplicateIndex, ReviewError> {
        self.state
            .into_inner()
            .map(|state| state.index)
            .map_err(|_| ReviewError::Poisoned)
    }
}

fn take_record(state: &mut ReviewState, path: &Path) -> Result<RemovedRecord, ReviewError> {
    match state.index.remove(path) {
        Removal::Removed(removed) => {
            state.renditions.remove(path);
            Ok(removed)
        }
        Removal::NotFound => Err(ReviewError::NotFound {
            path: path.to_path_buf(),
        }),
    }
}
