//! # Report Module
//!
//! Textual and structured summary of a duplicate index.
//!
//! A report can always be produced, even for a partial or cancelled scan,
//! and it distinguishes three situations:
//! 1. No directories were selected
//! 2. Directories were scanned but nothing is duplicated
//! 3. N duplicate groups were found

use crate::core::index::DuplicateIndex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Headline state of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportStatus {
    NoDirectoriesSelected,
    NoDuplicates,
    DuplicatesFound { groups: usize },
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportStatus::NoDirectoriesSelected => write!(f, "No directories selected."),
            ReportStatus::NoDuplicates => write!(f, "No duplicate images found."),
            ReportStatus::DuplicatesFound { groups } => {
                write!(f, "{} duplicate group(s) found.", groups)
            }
        }
    }
}

/// One duplicate group as it appears in a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportGroup {
    /// Hex fingerprint shared by every member
    pub fingerprint: String,
    /// Member paths in discovery order
    pub paths: Vec<PathBuf>,
}

/// Report over the duplicate groups of an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub status: ReportStatus,
    pub groups: Vec<ReportGroup>,
    /// Images that decoded and were indexed
    pub images_indexed: usize,
}

impl ScanReport {
    /// Report for a run where the caller selected no directories
    pub fn no_directories() -> Self {
        Self {
            status: ReportStatus::NoDirectoriesSelected,
            groups: Vec::new(),
            images_indexed: 0,
        }
    }

    /// Report over the current state of an index
    pub fn from_index(index: &DuplicateIndex) -> Self {
        let groups: Vec<ReportGroup> = index
            .duplicate_groups()
            .map(|g| ReportGroup {
                fingerprint: g.fingerprint().to_hex(),
                paths: g.paths(),
            })
            .collect();

        let status = if groups.is_empty() {
            ReportStatus::NoDuplicates
        } else {
            ReportStatus::DuplicatesFound {
                groups: groups.len(),
            }
        };

        Self {
            status,
            groups,
            images_indexed: index.len(),
        }
    }

    /// Number of files that could be removed while keeping one per group
    pub fn redundant_files(&self) -> usize {
        self.groups
            .iter()
            .map(|g| g.paths.len().saturating_sub(1))
            .sum()
    }
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            ReportStatus::DuplicatesFound { .. } => {
                writeln!(f, "Duplicate images found:")?;
                for group in &self.groups {
                    writeln!(f)?;
                    for path in &group.paths {
                        writeln!(f, "{}", path.display())?;
                    }
                }
                Ok(())
            }
            status => writeln!(f, "{}", status),
        }
    }
}
