//! Directory walking implementation using walkdir.
//!
//! Runs on its own thread and streams every accepted file into a bounded
//! channel, so fingerprinting starts before traversal finishes.

use super::{filter::FileFilter, CancellationToken, ScanConfig};
use crate::error::ScanError;
use crate::events::{Event, EventSender, ScanEvent};
use crossbeam_channel::Sender;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// A file waiting to be fingerprinted, tagged with its discovery order
#[derive(Debug)]
pub(super) struct QueuedFile {
    pub seq: usize,
    pub path: PathBuf,
}

/// Check every root up front.
///
/// Returns the canonical paths of usable roots (deduplicated, in the order
/// given) and an error for each root that was skipped.
pub(super) fn resolve_roots(
    roots: &[PathBuf],
    events: &EventSender,
) -> (Vec<PathBuf>, Vec<ScanError>) {
    let mut usable = Vec::new();
    let mut seen = HashSet::new();
    let mut errors = Vec::new();

    for root in roots {
        match open_root(root) {
            Ok(canonical) => {
                if seen.insert(canonical.clone()) {
                    usable.push(canonical);
                } else {
                    debug!(root = %root.display(), "root selected twice, ignoring repeat");
                }
            }
            Err(error) => {
                warn!(root = %root.display(), %error, "skipping root");
                events.send(Event::Scan(ScanEvent::RootSkipped {
                    path: root.clone(),
                    message: error.to_string(),
                }));
                errors.push(error);
            }
        }
    }

    (usable, errors)
}

fn open_root(root: &Path) -> Result<PathBuf, ScanError> {
    let metadata = fs::metadata(root).map_err(|e| classify_io(root, e))?;

    if !metadata.is_dir() {
        return Err(ScanError::DirectoryNotFound {
            path: root.to_path_buf(),
        });
    }

    // Listing proves the directory is readable, not just present
    fs::read_dir(root).map_err(|e| classify_io(root, e))?;

    fs::canonicalize(root).map_err(|e| classify_io(root, e))
}

fn classify_io(path: &Path, error: std::io::Error) -> ScanError {
    match error.kind() {
        ErrorKind::NotFound => ScanError::DirectoryNotFound {
            path: path.to_path_buf(),
        },
        ErrorKind::PermissionDenied => ScanError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ScanError::ReadDirectory {
            path: path.to_path_buf(),
            source: error,
        },
    }
}

/// Walk every root and queue each regular file exactly once.
///
/// Files reachable through overlapping or nested roots are recognised by
/// canonical path and queued only the first time. Returns the non-fatal
/// errors met along the way.
pub(super) fn walk_roots(
    roots: &[PathBuf],
    config: &ScanConfig,
    cancel: &CancellationToken,
    discovered: &AtomicUsize,
    events: &EventSender,
    sink: Sender<QueuedFile>,
) -> Vec<ScanError> {
    let mut filter = FileFilter::new().with_hidden(config.include_hidden);
    if let Some(ref extensions) = config.extensions {
        filter = filter.with_extensions(extensions);
    }

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut errors = Vec::new();
    let mut next_seq = 0;

    'roots: for root in roots {
        let mut walker = WalkDir::new(root).follow_links(config.follow_symlinks);
        if let Some(depth) = config.max_depth {
            walker = walker.max_depth(depth);
        }

        for entry_result in walker.into_iter().filter_entry(|e| filter.allows_entry(e)) {
            if cancel.is_cancelled() {
                debug!("traversal cancelled");
                break 'roots;
            }

            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    let error = if e.io_error().map(|io| io.kind())
                        == Some(ErrorKind::PermissionDenied)
                    {
                        ScanError::PermissionDenied { path }
                    } else {
                        ScanError::ReadDirectory {
                            path,
                            source: std::io::Error::other(e.to_string()),
                        }
                    };
                    warn!(%error, "walk error");
                    errors.push(error);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !filter.should_include(entry.path()) {
                continue;
            }

            let path = fs::canonicalize(entry.path()).unwrap_or_else(|_| entry.path().to_path_buf());
            if !seen.insert(path.clone()) {
                trace!(path = %path.display(), "already queued via another root");
                continue;
            }

            let seq = next_seq;
            next_seq += 1;
            discovered.store(next_seq, Ordering::SeqCst);

            events.send(Event::Scan(ScanEvent::FileQueued {
                path: path.clone(),
                discovered: next_seq,
            }));

            if sink.send(QueuedFile { seq, path }).is_err() {
                // Workers are gone; nothing left to feed
                break 'roots;
            }
        }
    }

    events.send(Event::Scan(ScanEvent::TraversalFinished {
        discovered: next_seq,
    }));

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::null_sender;
    use crossbeam_channel::unbounded;
    use std::fs::File;
    use tempfile::TempDir;

    fn walk(roots: &[PathBuf], config: &ScanConfig) -> Vec<PathBuf> {
        let (tx, rx) = unbounded();
        let counter = AtomicUsize::new(0);
        let errors = walk_roots(
            roots,
            config,
            &CancellationToken::new(),
            &counter,
            &null_sender(),
            tx,
        );
        assert!(errors.is_empty());
        let queued: Vec<QueuedFile> = rx.iter().collect();
        assert_eq!(counter.load(Ordering::SeqCst), queued.len());
        for (i, q) in queued.iter().enumerate() {
            assert_eq!(q.seq, i);
        }
        queued.into_iter().map(|q| q.path).collect()
    }

    fn touch(dir: &Path, name: &str) {
        File::create(dir.join(name)).unwrap();
    }

    #[test]
    fn walk_empty_directory_queues_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let roots = vec![fs::canonicalize(temp_dir.path()).unwrap()];

        assert!(walk(&roots, &ScanConfig::default()).is_empty());
    }

    #[test]
    fn walk_traverses_nested_directories() {
        let temp_dir = TempDir::new().unwrap();
        let subdir = temp_dir.path().join("subdir");
        fs::create_dir(&subdir).unwrap();
        touch(temp_dir.path(), "root.jpg");
        touch(&subdir, "nested.txt");

        let roots = vec![fs::canonicalize(temp_dir.path()).unwrap()];
        let found = walk(&roots, &ScanConfig::default());

        assert_eq!(found.len(), 2);
    }

    #[test]
    fn nested_roots_queue_each_file_once() {
        let temp_dir = TempDir::new().unwrap();
        let subdir = temp_dir.path().join("inner");
        fs::create_dir(&subdir).unwrap();
        touch(temp_dir.path(), "outer.png");
        touch(&subdir, "inner.png");

        let roots = vec![
            fs::canonicalize(temp_dir.path()).unwrap(),
            fs::canonicalize(&subdir).unwrap(),
        ];
        let found = walk(&roots, &ScanConfig::default());

        assert_eq!(found.len(), 2);
    }

    #[test]
    fn hidden_entries_are_skipped_when_configured() {
        let temp_dir = TempDir::new().unwrap();
        let hidden_dir = temp_dir.path().join(".cache");
        fs::create_dir(&hidden_dir).unwrap();
        touch(&hidden_dir, "thumb.png");
        touch(temp_dir.path(), ".hidden.png");
        touch(temp_dir.path(), "visible.png");

        let roots = vec![fs::canonicalize(temp_dir.path()).unwrap()];
        let config = ScanConfig {
            include_hidden: false,
            ..Default::default()
        };
        let found = walk(&roots, &config);

        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("visible.png"));
    }

    #[test]
    fn extension_filter_narrows_the_walk() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "a.png");
        touch(temp_dir.path(), "b.txt");

        let roots = vec![fs::canonicalize(temp_dir.path()).unwrap()];
        let config = ScanConfig {
            extensions: Some(vec!["png".to_string()]),
            ..Default::default()
        };
        let found = walk(&roots, &config);

        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("a.png"));
    }

    #[test]
    fn resolve_roots_skips_missing_and_repeated() {
        let temp_dir = TempDir::new().unwrap();
        let roots = vec![
            temp_dir.path().to_path_buf(),
            PathBuf::from("/nonexistent/path/12345"),
            temp_dir.path().to_path_buf(),
        ];

        let (usable, errors) = resolve_roots(&roots, &null_sender());

        assert_eq!(usable.len(), 1);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ScanError::DirectoryNotFound { .. }));
    }

    #[test]
    fn resolve_roots_rejects_plain_file() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "file.png");

        let (usable, errors) =
            resolve_roots(&[temp_dir.path().join("file.png")], &null_sender());

        assert!(usable.is_empty());
        assert_eq!(errors.len(), 1);
    }
}
