//! File filtering logic for the scanner.
//!
//! By default every regular file is attempted; the decoder decides what is
//! an image. Extension and hidden-file filters only narrow that down.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::Path;
use walkdir::DirEntry;

/// Decides which directory entries reach the fingerprinter
#[derive(Debug, Clone)]
pub struct FileFilter {
    /// Lowercase extensions to accept (None = accept every file)
    extensions: Option<HashSet<String>>,
    /// Whether to include hidden files and descend into hidden directories
    include_hidden: bool,
}

impl FileFilter {
    /// Accept everything
    pub fn new() -> Self {
        Self {
            extensions: None,
            include_hidden: true,
        }
    }

    /// Include hidden files (starting with .)
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Restrict to these extensions (case-insensitive, leading dot optional)
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = Some(
            extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        );
        self
    }

    /// Whether the walker should yield or descend into this entry.
    ///
    /// The root itself is always accepted, even if its name is hidden.
    pub fn allows_entry(&self, entry: &DirEntry) -> bool {
        entry.depth() == 0 || self.include_hidden || !is_hidden(entry.file_name())
    }

    /// Check if a file should be fingerprinted
    pub fn should_include(&self, path: &Path) -> bool {
        if !self.include_hidden && path.file_name().is_some_and(is_hidden) {
            return false;
        }

        match &self.extensions {
            None => true,
            Some(allowed) => path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| allowed.contains(&e.to_lowercase()))
                .unwrap_or(false),
        }
    }
}

impl Default for FileFilter {
    fn default() -> Self {
        Self::new()
    }
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}
