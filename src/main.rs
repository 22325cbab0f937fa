//! # pixel-dedup CLI
//!
//! Command-line interface for the exact duplicate image finder.
//!
//! ## Usage
//! ```bash
//! pixel-dedup scan ~/Pictures ~/Downloads
//! pixel-dedup scan ~/Pictures --output json
//! pixel-dedup review ~/Pictures --trash
//! ```

mod cli;

use pixel_dedup::Result;

fn main() -> Result<()> {
    cli::run()
}
