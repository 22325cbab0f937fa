//! # Core Module
//!
//! The front-end agnostic duplicate detection engine.
//!
//! ## Modules
//! - `fingerprint` - Decodes images and digests their pixels
//! - `scanner` - Walks directories and fingerprints files in parallel
//! - `index` - Groups records by fingerprint
//! - `review` - Lists groups, serves previews and deletes files
//! - `report` - Summarises an index for display or JSON output

pub mod fingerprint;
pub mod index;
pub mod report;
pub mod review;
pub mod scanner;

// Re-export commonly used types
pub use fingerprint::{Fingerprint, ImageRecord};
pub use index::{DuplicateGroup, DuplicateIndex, Removal};
pub use report::{ReportStatus, ScanReport};
pub use review::{ReviewConfig, ReviewSession};
pub use scanner::{CancellationToken, ScanConfig, ScanOutcome, Scanner};
