//! File watchers.
//!
//! [`watch_rules_file`] reloads the rule list into a [`RuleStore`] whenever
//! the file changes on disk, which in turn notifies every subscriber of the
//! store. [`watch_file`] is the underlying primitive, also used to follow
//! sidebar fixtures.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use super::RuleStore;
use crate::constants::timing::RULE_FILE_DEBOUNCE_MS;

/// Keeps a file watch alive. Dropping it stops watching.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher").field("path", &self.path).finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// The watched file.
    #[must_use]
    pub fn path(&self) -> &Path { &self.path }
}

/// Calls `on_change` after a file changes.
///
/// The file's parent directory is watched so that editors which save by
/// writing a temp file and renaming it are picked up. Bursts of events are
/// collapsed: `on_change` runs once no further event arrived for
/// [`RULE_FILE_DEBOUNCE_MS`].
///
/// # Errors
///
/// Returns an error if the watcher cannot be created or the directory cannot be watched.
pub fn watch_file(
    path: &Path,
    on_change: impl Fn() + Send + 'static,
) -> notify::Result<FileWatcher> {
    let path = path.to_path_buf();
    let file_name = path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    let watch_path = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));

    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx)?;
    watcher.watch(watch_path, RecursiveMode::NonRecursive)?;

    let thread_path = path.clone();
    std::thread::spawn(move || {
        let debounce = Duration::from_millis(RULE_FILE_DEBOUNCE_MS);
        let affects_file = |event: &notify::Event| {
            event.paths.iter().any(|p| p.file_name().is_some_and(|name| name == file_name))
        };

        loop {
            match rx.recv() {
                Ok(Ok(event)) if affects_file(&event) => {
                    // Drain the rest of the burst first.
                    loop {
                        match rx.recv_timeout(debounce) {
                            Ok(_) => {}
                            Err(mpsc::RecvTimeoutError::Timeout) => break,
                            Err(mpsc::RecvTimeoutError::Disconnected) => return,
                        }
                    }
                    on_change();
                }
                Ok(Ok(_)) => {}
                Ok(Err(err)) => {
                    tracing::warn!(path = %thread_path.display(), error = %err, "file watch error");
                }
                Err(_) => break,
            }
        }

        tracing::debug!(path = %thread_path.display(), "file watcher stopped");
    });

    tracing::debug!(path = %path.display(), "watching file");
    Ok(FileWatcher { _watcher: watcher, path })
}

/// Starts watching a rule file and publishing changes into `store`.
///
/// # Errors
///
/// Returns an error if the watcher cannot be created or the directory cannot be watched.
pub fn watch_rules_file(store: RuleStore, path: &Path) -> notify::Result<FileWatcher> {
    let reload_path = path.to_path_buf();
    watch_file(path, move || {
        store.reload(&reload_path);
    })
}
