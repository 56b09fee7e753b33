use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::subscribe::Subscriptions;

/// Bridges writes made by other processes into the live-query registry:
/// any filesystem event on the database becomes a `publish_all`, since the
/// affected rows are unknown from outside. The returned watcher must be
/// kept alive for events to flow.
pub fn watch_store(db_path: &str, subs: Arc<Subscriptions>) -> Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
        if res.is_ok() {
            log::debug!("external change on the database file");
            subs.publish_all();
        }
    })
    .context("failed to create file watcher")?;

    // Watch the parent directory since SQLite uses temp files during writes
    let path = Path::new(db_path);
    let watch_path = path.parent().unwrap_or(path);
    watcher
        .watch(watch_path, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {}", watch_path.display()))?;

    Ok(watcher)
}
