//! Directory watching for the local source.
//!
//! A [`notify`] watcher observes the data directory; events touching team
//! files (or their hash companions, or the directory itself) feed the
//! [`Debouncer`](crate::debounce::Debouncer), so a burst of writes from a
//! concurrently running producer coalesces into one reload signal.

use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::broadcast;

use crate::debounce::{Debouncer, Fire};
use crate::{is_team_file, HASH_FILE_SUFFIX};

/// Live watch over a data directory. Dropping it stops the watcher.
pub struct SourceWatcher {
    // Held for its Drop side effect: deregisters the OS watch.
    _watcher: RecommendedWatcher,
    dir: PathBuf,
}

impl SourceWatcher {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Start watching `dir`, emitting one [`Fire`] per coalescing `window`.
    ///
    /// Must be called within a tokio runtime (the debounce worker is a
    /// spawned task). The directory must exist at call time.
    pub fn spawn(
        dir: impl Into<PathBuf>,
        window: Duration,
    ) -> Result<(Self, broadcast::Receiver<Fire>)> {
        let dir = dir.into();
        let (debouncer, rx) = Debouncer::spawn(window);

        let trigger = debouncer.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    if event.paths.is_empty() || event.paths.iter().any(|p| is_relevant(p)) {
                        trigger.trigger();
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "file watch error");
                }
            },
            notify::Config::default(),
        )
        .context("create file watcher")?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("watch directory {:?}", dir))?;

        tracing::debug!(dir = %dir.display(), window_ms = window.as_millis() as u64, "watching data directory");

        Ok((
            Self {
                _watcher: watcher,
                dir,
            },
            rx,
        ))
    }
}

/// Team files and their hash companions are relevant; anything else in the
/// directory (editor swap files, logs) is noise.
fn is_relevant(path: &Path) -> bool {
    if is_team_file(path) {
        return true;
    }
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(HASH_FILE_SUFFIX))
        .unwrap_or(false)
}
