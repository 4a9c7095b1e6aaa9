//! Directory watching for late-arriving plugins.
//!
//! The OS watcher (via `notify`) is bridged into a tokio channel; the watch
//! loop classifies each event and queues manifest analyses on the pool.
//! Shutdown is a single `tokio::sync::watch` channel the loop selects on,
//! so a stop request is observed promptly regardless of event traffic.
//!
//! Removal events are acknowledged but not acted on: unbinding a live
//! dependency graph is future work, so a deleted manifest only logs a
//! warning.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use solder_manager::PluginManager;

use crate::discovery::{ContainerLoader, is_manifest};
use crate::error::RuntimeResult;
use crate::pool::AnalysisPool;

/// What the watch loop does with one filesystem event path.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum WatchAction {
    /// A manifest appeared or changed; queue analysis.
    Analyse(PathBuf),
    /// A manifest went away; removal is not supported yet.
    RemovalUnsupported(PathBuf),
    /// Not a manifest; ignore.
    Ignore(PathBuf),
}

/// Classifies a raw watcher event into per-path actions.
pub(crate) fn classify(event: &notify::Event) -> Vec<WatchAction> {
    event
        .paths
        .iter()
        .map(|path| {
            if !is_manifest(path) {
                return WatchAction::Ignore(path.clone());
            }
            match event.kind {
                EventKind::Create(_) | EventKind::Modify(_) => {
                    WatchAction::Analyse(path.clone())
                }
                EventKind::Remove(_) => WatchAction::RemovalUnsupported(path.clone()),
                _ => WatchAction::Ignore(path.clone()),
            }
        })
        .collect()
}

/// Spawns the directory watch loop over `roots`.
///
/// Returns the task handle; the loop ends when `shutdown` flips to `true`
/// or the OS watcher goes away.
pub fn spawn(
    manager: Arc<PluginManager>,
    loader: Arc<dyn ContainerLoader>,
    pool: Arc<AnalysisPool>,
    roots: Vec<PathBuf>,
    poll_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> RuntimeResult<JoinHandle<()>> {
    let (tx, mut rx) = mpsc::channel::<notify::Result<notify::Event>>(64);
    let mut watcher = RecommendedWatcher::new(
        move |result| {
            // The OS watcher runs on its own thread; a full channel just
            // drops the event, and the next scan will catch up.
            let _ = tx.blocking_send(result);
        },
        notify::Config::default().with_poll_interval(poll_interval),
    )?;
    for root in &roots {
        watcher.watch(root, RecursiveMode::Recursive)?;
        info!(root = %root.display(), "Watching for plugins");
    }

    Ok(tokio::spawn(async move {
        // Keep the OS watcher alive for the lifetime of the loop.
        let _watcher = watcher;
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                event = rx.recv() => {
                    match event {
                        Some(Ok(event)) => {
                            for action in classify(&event) {
                                handle_action(&manager, &loader, &pool, action);
                            }
                        }
                        Some(Err(e)) => error!(error = %e, "Filesystem watcher error"),
                        None => break,
                    }
                }
            }
        }
        info!("Directory watcher stopped");
    }))
}

fn handle_action(
    manager: &Arc<PluginManager>,
    loader: &Arc<dyn ContainerLoader>,
    pool: &Arc<AnalysisPool>,
    action: WatchAction,
) {
    match action {
        WatchAction::Analyse(path) => {
            debug!(path = %path.display(), "Manifest event, queueing analysis");
            pool.submit(Arc::clone(manager), Arc::clone(loader), path);
        }
        WatchAction::RemovalUnsupported(path) => {
            warn!(
                path = %path.display(),
                "Plugin manifest removed; plugin removal is not supported, keeping the plugin"
            );
        }
        WatchAction::Ignore(path) => {
            debug!(path = %path.display(), "Ignoring non-manifest event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    fn event(kind: EventKind, path: &str) -> notify::Event {
        notify::Event {
            kind,
            paths: vec![PathBuf::from(path)],
            attrs: Default::default(),
        }
    }

    #[test]
    fn created_manifest_is_analysed() {
        let actions = classify(&event(
            EventKind::Create(CreateKind::File),
            "plugins/echo.plugin.yaml",
        ));
        assert_eq!(
            actions,
            vec![WatchAction::Analyse(PathBuf::from(
                "plugins/echo.plugin.yaml"
            ))]
        );
    }

    #[test]
    fn modified_manifest_is_analysed() {
        let actions = classify(&event(
            EventKind::Modify(ModifyKind::Any),
            "plugins/echo.plugin.json",
        ));
        assert!(matches!(actions[0], WatchAction::Analyse(_)));
    }

    #[test]
    fn removed_manifest_logs_unsupported() {
        let actions = classify(&event(
            EventKind::Remove(RemoveKind::File),
            "plugins/echo.plugin.yaml",
        ));
        assert!(matches!(actions[0], WatchAction::RemovalUnsupported(_)));
    }

    #[test]
    fn non_manifest_files_are_ignored() {
        let actions = classify(&event(
            EventKind::Create(CreateKind::File),
            "plugins/readme.md",
        ));
        assert!(matches!(actions[0], WatchAction::Ignore(_)));
    }
}
