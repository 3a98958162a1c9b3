//! Change notifications for hot reloading.
//!
//! File system events are delivered on the watcher's own thread and queued
//! on a channel. [`SourceWatcher::poll`] drains that queue without blocking,
//! so a caller can check once per tick.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

pub struct SourceWatcher {
    paths: Vec<PathBuf>,
    events: Receiver<notify::Result<Event>>,
    // Notifications stop when the watcher is dropped.
    _watcher: RecommendedWatcher,
}

impl SourceWatcher {
    /// Watch `paths` for changes.
    ///
    /// The parent directory of each file is watched rather than the file
    /// itself, so files replaced by a rename or removed and written again are
    /// still seen.
    pub fn new<I, P>(paths: I) -> notify::Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let (sender, events) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(sender)?;

        let mut watched_dirs: Vec<PathBuf> = Vec::new();
        let mut files = Vec::new();
        for path in paths {
            let path = resolve(path.into());
            if let Some(dir) = path.parent() {
                if !watched_dirs.iter().any(|watched| watched == dir) {
                    match watcher.watch(dir, RecursiveMode::NonRecursive) {
                        Ok(()) => watched_dirs.push(dir.to_path_buf()),
                        Err(err) => log::warn!("Cannot watch {:?}: {}", dir, err),
                    }
                }
            }
            files.push(path);
        }

        Ok(Self {
            paths: files,
            events,
            _watcher: watcher,
        })
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    /// Whether any watched file was created, modified or removed since the
    /// last poll. Never blocks.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        for result in self.events.try_iter() {
            let event = match result {
                Ok(event) => event,
                Err(err) => {
                    log::warn!("File watcher error: {}", err);
                    continue;
                }
            };
            if !(event.kind.is_create() || event.kind.is_modify() || event.kind.is_remove()) {
                continue;
            }
            if let Some(path) = event.paths.iter().find(|path| self.paths.contains(path)) {
                log::info!("Detected change in {:?}", path);
                changed = true;
            }
        }
        changed
    }
}

/// Make the directory part of `path` canonical, the form event paths are
/// reported in. The file itself does not have to exist.
fn resolve(path: PathBuf) -> PathBuf {
    let (Some(dir), Some(name)) = (path.parent(), path.file_name()) else {
        return path;
    };
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    match dir.canonicalize() {
        Ok(dir) => dir.join(name),
        Err(_) => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    /// Poll until a change shows up, giving the notification thread time to
    /// deliver.
    fn wait_for_change(watcher: &mut SourceWatcher) -> bool {
        for _ in 0..100 {
            if watcher.poll() {
                return true;
            }
            thread::sleep(Duration::from_millis(20));
        }
        false
    }

    #[test]
    fn test_poll_reports_modification_and_removal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.lua");
        std::fs::write(&path, "layout = {}").unwrap();

        let mut watcher = SourceWatcher::new([&path]).unwrap();
        assert!(!watcher.poll());

        std::fs::write(&path, "layout = { type = 'stack' }").unwrap();
        assert!(wait_for_change(&mut watcher));

        std::fs::remove_file(&path).unwrap();
        assert!(wait_for_change(&mut watcher));
    }

    #[test]
    fn test_poll_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.lua");
        std::fs::write(&path, "layout = {}").unwrap();

        let mut watcher = SourceWatcher::new([&path]).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "unrelated").unwrap();
        thread::sleep(Duration::from_millis(200));
        assert!(!watcher.poll());
        assert_eq!(watcher.paths().count(), 1);
    }

    #[test]
    fn test_relative_paths_resolve_against_current_dir() {
        let resolved = resolve(PathBuf::from("scene.lua"));
        assert!(resolved.is_absolute());
        assert_eq!(resolved.file_name().unwrap(), "scene.lua");
    }
}
