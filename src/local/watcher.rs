//! File system watcher with debouncing for live reload.
//!
//! Watches the asset root recursively and filters changes through the
//! configured ignore patterns, so build artifacts and editor noise do not
//! trigger reload storms.

use crate::error::{HostError, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Watch configuration.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Patterns to ignore (directory names or `*.ext` extension patterns)
    pub ignore: Vec<String>,
    /// Debounce window for repeated events on the same path
    pub debounce: Duration,
}

/// File watcher with debouncing and filtering.
///
/// Watches a directory recursively and sends changed paths through a
/// channel. Dropping the watcher stops the stream.
#[derive(Debug)]
pub struct ReloadWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl ReloadWatcher {
    /// Create a watcher over a root directory.
    ///
    /// # Returns
    ///
    /// Tuple of (ReloadWatcher, receiver for changed paths)
    ///
    /// # Errors
    ///
    /// Returns an error if the root does not exist or the watcher cannot be
    /// created.
    pub fn spawn(root: PathBuf, options: WatchOptions) -> Result<(Self, mpsc::Receiver<PathBuf>)> {
        if !root.exists() {
            return Err(HostError::FileNotFound(root));
        }

        let (tx, rx) = mpsc::channel(100);

        let mut last_event: Option<(PathBuf, Instant)> = None;
        let ignore = options.ignore.clone();
        let debounce = options.debounce;
        let root_clone = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                if !matches!(
                    event.kind,
                    notify::EventKind::Create(_)
                        | notify::EventKind::Modify(_)
                        | notify::EventKind::Remove(_)
                ) {
                    return;
                }

                for path in &event.paths {
                    if Self::should_ignore(path, &root_clone, &ignore) {
                        continue;
                    }

                    // Debounce repeated events on the same path.
                    let now = Instant::now();
                    if let Some((last_path, last_time)) = &last_event {
                        if last_path == path && now.duration_since(*last_time) < debounce {
                            continue;
                        }
                    }
                    last_event = Some((path.clone(), now));

                    let _ = tx.blocking_send(path.clone());
                }
            }
        })
        .map_err(HostError::Watch)?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(HostError::Watch)?;

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    /// Check if a path should be ignored.
    ///
    /// Paths outside the root, hidden files and anything matching an ignore
    /// pattern are dropped.
    fn should_ignore(path: &Path, root: &Path, ignore: &[String]) -> bool {
        if !path.starts_with(root) {
            return true;
        }

        let rel_path = match path.strip_prefix(root) {
            Ok(p) => p,
            Err(_) => return true,
        };

        let path_str = rel_path.to_string_lossy();

        for pattern in ignore {
            if pattern.starts_with('*') {
                // Extension pattern like "*.log"
                let ext = pattern.trim_start_matches('*');
                if path_str.ends_with(ext) {
                    return true;
                }
            } else if path_str.starts_with(pattern) || path_str.contains(&format!("/{}", pattern)) {
                // Directory pattern like "node_modules"
                return true;
            }
        }

        for component in rel_path.components() {
            if let Some(name) = component.as_os_str().to_str() {
                if name.starts_with('.') && name != "." && name != ".." {
                    return true;
                }
            }
        }

        false
    }

    /// Get the root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}
