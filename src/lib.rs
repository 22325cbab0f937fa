//! # pixel-dedup
//!
//! Finds images whose decoded pixels are identical, whatever their file
//! format or name, and lets a user review and delete the extra copies.
//!
//! ## Architecture
//! - `core` - Scanning, fingerprinting, the duplicate index and review
//! - `events` - Channel-based progress reporting for any front end
//! - `error` - Error types
//!
//! ## Example
//! ```rust,ignore
//! use pixel_dedup::core::{ReviewConfig, ReviewSession, Scanner};
//! use pixel_dedup::core::review::TrashRemover;
//!
//! let outcome = Scanner::builder().build()?.scan(&roots)?;
//! println!("{}", outcome.report());
//!
//! let session = ReviewSession::new(outcome.index, ReviewConfig::default(), Box::new(TrashRemover));
//! ```

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{DedupError, Result};

/// Initialize tracing for the library
///
/// Reads the filter from `RUST_LOG`, falling back to `default_filter`.
/// Does nothing if a subscriber is already installed.
pub fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
