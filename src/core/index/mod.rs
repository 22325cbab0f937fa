//! # Index Module
//!
//! The authoritative in-memory mapping from fingerprint to the files that
//! share it.
//!
//! ## Invariants
//! - Every record lives in exactly one group (fingerprints partition records)
//! - A path appears at most once across the whole index
//! - No empty group is ever stored
//!
//! Groups keep discovery order internally and first-discovery order across
//! the index. Only groups with two or more members are duplicates; singletons
//! stay indexed so a later report can still account for them.

use crate::core::fingerprint::{Fingerprint, ImageRecord};
use crate::core::report::ScanReport;
use crate::error::IndexError;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Records sharing one fingerprint, in discovery order
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    fingerprint: Fingerprint,
    records: Vec<ImageRecord>,
}

impl DuplicateGroup {
    fn new(fingerprint: Fingerprint) -> Self {
        Self {
            fingerprint,
            records: Vec::new(),
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Two or more members
    pub fn is_duplicate(&self) -> bool {
        self.records.len() >= 2
    }

    /// Member paths in discovery order
    pub fn paths(&self) -> Vec<PathBuf> {
        self.records.iter().map(|r| r.path.clone()).collect()
    }
}

/// What happened to a group when one of its members was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupChange {
    /// Still two or more members
    StillDuplicate,
    /// Went from two or more members down to one
    NoLongerDuplicate,
    /// Last member removed; the fingerprint entry is gone
    Emptied,
}

/// A successful removal
#[derive(Debug, Clone)]
pub struct RemovedRecord {
    pub record: ImageRecord,
    /// Members left in the group
    pub remaining: usize,
    pub change: GroupChange,
}

/// Outcome of `DuplicateIndex::remove`
#[derive(Debug, Clone)]
pub enum Removal {
    Removed(RemovedRecord),
    /// Path was never indexed or has already been removed
    NotFound,
}

impl Removal {
    pub fn is_removed(&self) -> bool {
        matches!(self, Removal::Removed(_))
    }
}

/// Fingerprint → group mapping with a path lookup
#[derive(Debug, Clone, Default)]
pub struct DuplicateIndex {
    groups: IndexMap<Fingerprint, DuplicateGroup>,
    by_path: HashMap<PathBuf, Fingerprint>,
}

impl DuplicateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to the group for its fingerprint.
    ///
    /// Rejects a path that is already indexed.
    pub fn insert(&mut self, record: ImageRecord) -> Result<(), IndexError> {
        if self.by_path.contains_key(&record.path) {
            return Err(IndexError::DuplicatePath { path: record.path });
        }

        let fingerprint = record.fingerprint;
        self.by_path.insert(record.path.clone(), fingerprint);
        self.groups
            .entry(fingerprint)
            .or_insert_with(|| DuplicateGroup::new(fingerprint))
            .records
            .push(record);

        Ok(())
    }

    /// Remove the record for `path`.
    ///
    /// Idempotent: a second call for the same path returns `NotFound`.
    pub fn remove(&mut self, path: &Path) -> Removal {
        let Some(fingerprint) = self.by_path.remove(path) else {
            return Removal::NotFound;
        };

        let Some(group) = self.groups.get_mut(&fingerprint) else {
            return Removal::NotFound;
        };

        let Some(position) = group.records.iter().position(|r| r.path == path) else {
            return Removal::NotFound;
        };

        let was_duplicate = group.is_duplicate();
        let record = group.records.remove(position);
        let remaining = group.records.len();

        let change = if remaining == 0 {
            self.groups.shift_remove(&fingerprint);
            GroupChange::Emptied
        } else if was_duplicate && remaining < 2 {
            GroupChange::NoLongerDuplicate
        } else {
            GroupChange::StillDuplicate
        };

        Removal::Removed(RemovedRecord {
            record,
            remaining,
            change,
        })
    }

    /// Every group, singletons included, in first-discovery order
    pub fn groups(&self) -> impl Iterator<Item = &DuplicateGroup> {
        self.groups.values()
    }

    /// Groups with two or more members
    pub fn duplicate_groups(&self) -> impl Iterator<Item = &DuplicateGroup> {
        self.groups.values().filter(|g| g.is_duplicate())
    }

    pub fn duplicate_group_count(&self) -> usize {
        self.duplicate_groups().count()
    }

    pub fn get(&self, path: &Path) -> Option<&ImageRecord> {
        let fingerprint = self.by_path.get(path)?;
        self.groups
            .get(fingerprint)?
            .records
            .iter()
            .find(|r| r.path == path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.by_path.contains_key(path)
    }

    /// The group containing `path`
    pub fn group_of(&self, path: &Path) -> Option<&DuplicateGroup> {
        let fingerprint = self.by_path.get(path)?;
        self.groups.get(fingerprint)
    }

    pub fn group(&self, fingerprint: &Fingerprint) -> Option<&DuplicateGroup> {
        self.groups.get(fingerprint)
    }

    /// Number of indexed records
    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Drop retained pixels from records that have no duplicate.
    ///
    /// Only duplicate members are ever previewed. Returns how many records
    /// gave up their pixels.
    pub fn release_unique_pixels(&mut self) -> usize {
        self.groups
            .values_mut()
            .filter(|g| !g.is_duplicate())
            .flat_map(|g| g.records.iter_mut())
            .filter_map(|r| r.decoded.take())
            .count()
    }

    /// Build the user-facing report for this index
    pub fn report(&self) -> ScanReport {
        ScanReport::from_index(self)
    }
}
