//! Bounded concurrent manifest analysis.
//!
//! Discovery can surface hundreds of manifests at once; analysing them
//! (read, parse, load, ingest) is fanned out over tokio tasks gated by a
//! semaphore. The permit count comes from the configuration, the
//! `PLUGIN_MANAGER_MAX_THREADS` environment variable, or hardware
//! concurrency, in that order.
//!
//! Tasks are never interrupted mid-analysis; [`AnalysisPool::drain`] waits
//! for everything in flight, which is how shutdown quiesces discovery.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::warn;

use solder_manager::PluginManager;

use crate::discovery::{ContainerLoader, analyse_manifest};

/// Environment variable controlling the analysis permit count.
pub const MAX_THREADS_ENV: &str = "PLUGIN_MANAGER_MAX_THREADS";

/// Resolves the analysis concurrency: a positive `configured` value wins,
/// then a positive [`MAX_THREADS_ENV`], then hardware concurrency.
pub fn analysis_threads(configured: i64) -> usize {
    if configured > 0 {
        return configured as usize;
    }
    if let Ok(raw) = std::env::var(MAX_THREADS_ENV)
        && let Ok(value) = raw.trim().parse::<i64>()
        && value > 0
    {
        return value as usize;
    }
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

/// Semaphore-bounded pool of manifest analysis tasks.
pub struct AnalysisPool {
    permits: Arc<Semaphore>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl AnalysisPool {
    /// Creates a pool allowing `permits` concurrent analyses.
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(permits.max(1))),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Queues one manifest for analysis.
    ///
    /// The task waits for a permit, runs the analysis, and logs (but does
    /// not propagate) failures — a broken manifest must not stall the sweep.
    pub fn submit(
        &self,
        manager: Arc<PluginManager>,
        loader: Arc<dyn ContainerLoader>,
        path: PathBuf,
    ) {
        let permits = Arc::clone(&self.permits);
        let handle = tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            if let Err(e) = analyse_manifest(&manager, loader.as_ref(), &path).await {
                warn!(path = %path.display(), error = %e, "Manifest analysis failed");
            }
        });
        self.tasks.lock().push(handle);
    }

    /// Waits for every queued analysis to finish.
    pub async fn drain(&self) {
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
        for handle in handles {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::discovery::HookRegistry;

    #[test]
    fn configured_thread_count_wins() {
        assert_eq!(analysis_threads(3), 3);
    }

    #[test]
    fn non_positive_count_falls_back() {
        // With the env var unset this resolves to hardware concurrency.
        assert!(analysis_threads(0) >= 1);
        assert!(analysis_threads(-5) >= 1);
    }

    #[tokio::test]
    async fn pool_analyses_everything_submitted() {
        let dir = tempfile::tempdir().unwrap();
        for n in 0..24 {
            fs::write(
                dir.path().join(format!("p{n:02}.plugin.yaml")),
                format!("id: com.example.p{n}\nversion: '1.0'\n"),
            )
            .unwrap();
        }

        let manager = Arc::new(PluginManager::new());
        let loader: Arc<dyn ContainerLoader> = Arc::new(HookRegistry::new());
        let pool = AnalysisPool::new(4);
        for path in crate::discovery::scan(dir.path()) {
            pool.submit(Arc::clone(&manager), Arc::clone(&loader), path);
        }
        pool.drain().await;

        assert_eq!(manager.registry().len(), 24);
    }
}
