//! Host orchestration.
//!
//! [`SolderHost`] wires the manager, the analysis pool, discovery, and the
//! directory watcher together behind one handle.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use solder_runtime::SolderHost;
//!
//! // Simplest way - auto-loads solder.yaml from the current directory
//! let host = SolderHost::new();
//!
//! // Custom configuration and hooks
//! let hooks = Arc::new(HookRegistry::new());
//! hooks.register("com.example.echo", HookSet::new().construct(echo_factory));
//! let host = SolderHost::builder()
//!     .config_file("config/solder.yaml")
//!     .loader(hooks)
//!     .build()?;
//!
//! host.run(&InitArgs::new()).await?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use solder_core::{InitArgs, PluginId, Result};
use solder_manager::{InitReport, MANAGER_NAMESPACE, PluginManager};

use crate::config::{ConfigLoader, SolderConfig};
use crate::discovery::{self, ContainerLoader, HookRegistry};
use crate::error::{ConfigResult, RuntimeResult};
use crate::logging;
use crate::pool::{AnalysisPool, analysis_threads};
use crate::watcher;

/// The solder host: discovery, watching, and lifecycle behind one handle.
pub struct SolderHost {
    config: SolderConfig,
    manager: Arc<PluginManager>,
    loader: Arc<dyn ContainerLoader>,
    pool: Arc<AnalysisPool>,
    shutdown: watch::Sender<bool>,
    watcher_task: Mutex<Option<JoinHandle<()>>>,
}

impl SolderHost {
    /// Creates a host with automatic configuration loading.
    ///
    /// Searches the current directory for `solder.yaml`; falls back to
    /// defaults when none is found.
    pub fn new() -> Self {
        let config = ConfigLoader::default().load().unwrap_or_else(|e| {
            eprintln!("Warning: failed to load config ({e}), using defaults");
            SolderConfig::default()
        });
        Self::from_config(&config)
    }

    /// Creates a host builder for custom configuration.
    pub fn builder() -> HostBuilder {
        HostBuilder::new()
    }

    /// Creates a host from configuration, initializing logging.
    pub fn from_config(config: &SolderConfig) -> Self {
        Self::assemble(config, Arc::new(HookRegistry::new()))
    }

    fn assemble(config: &SolderConfig, loader: Arc<dyn ContainerLoader>) -> Self {
        logging::init_from_config(&config.logging);

        let prefixes: Vec<String> = config.blocked_prefixes.clone();
        let manager = Arc::new(PluginManager::with_blocklist(Arc::new(
            move |id: &PluginId| {
                id.as_str().starts_with(MANAGER_NAMESPACE)
                    || prefixes.iter().any(|prefix| id.as_str().starts_with(prefix))
            },
        )));
        let pool = Arc::new(AnalysisPool::new(analysis_threads(config.analysis_threads)));
        let (shutdown, _) = watch::channel(false);

        info!(
            dirs = config.plugin_dirs.len(),
            "Host initialized from configuration"
        );

        Self {
            config: config.clone(),
            manager,
            loader,
            pool,
            shutdown,
            watcher_task: Mutex::new(None),
        }
    }

    /// The plugin manager.
    pub fn manager(&self) -> &Arc<PluginManager> {
        &self.manager
    }

    /// The loaded configuration.
    pub fn config(&self) -> &SolderConfig {
        &self.config
    }

    // ─── Discovery ───────────────────────────────────────────────────────────

    /// Runs one discovery sweep over every configured plugin directory,
    /// waits for all analyses, then runs a resolution sweep.
    pub async fn scan(&self) {
        for root in &self.config.plugin_dirs {
            if !root.exists() {
                warn!(root = %root.display(), "Plugin directory does not exist, skipping");
                continue;
            }
            for path in discovery::scan(root) {
                self.pool
                    .submit(Arc::clone(&self.manager), Arc::clone(&self.loader), path);
            }
        }
        self.pool.drain().await;
        self.manager.resolve();
    }

    /// Starts the directory watcher over the configured plugin directories.
    pub fn start_watching(&self) -> RuntimeResult<()> {
        let roots: Vec<PathBuf> = self
            .config
            .plugin_dirs
            .iter()
            .filter(|root| root.exists())
            .cloned()
            .collect();
        let handle = watcher::spawn(
            Arc::clone(&self.manager),
            Arc::clone(&self.loader),
            Arc::clone(&self.pool),
            roots,
            Duration::from_millis(self.config.poll_interval_ms),
            self.shutdown.subscribe(),
        )?;
        *self.watcher_task.lock() = Some(handle);
        Ok(())
    }

    /// Spawns a task that runs a resolution sweep whenever the registry
    /// changes, so late-arriving plugins resolve without polling.
    pub fn spawn_resolver(&self) -> JoinHandle<()> {
        let manager = Arc::clone(&self.manager);
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = manager.registry().changed() => {
                        manager.resolve();
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        })
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    /// Constructs and activates every linkable plugin. See
    /// [`PluginManager::initialize`].
    pub fn initialize(&self, args: &InitArgs) -> Result<InitReport> {
        self.manager.initialize(args)
    }

    /// Deactivates every active plugin and refuses further ingestion.
    pub fn shutdown_plugins(&self, args: &InitArgs) -> Result<()> {
        self.manager.shutdown(args)
    }

    // ─── Running ─────────────────────────────────────────────────────────────

    /// Scans, watches, initializes, and then blocks until Ctrl-C or SIGTERM.
    pub async fn run(&self, args: &InitArgs) -> RuntimeResult<()> {
        self.scan().await;
        self.start_watching()?;
        let resolver = self.spawn_resolver();
        self.manager.initialize(args)?;

        info!("Solder host is running. Press Ctrl+C to stop.");
        wait_for_shutdown_signal().await;

        self.stop().await;
        resolver.abort();
        self.manager.shutdown(args)?;
        Ok(())
    }

    /// Like [`run`](Self::run) but with a caller-supplied shutdown future.
    pub async fn run_until<F>(&self, args: &InitArgs, until: F) -> RuntimeResult<()>
    where
        F: std::future::Future<Output = ()>,
    {
        self.scan().await;
        self.start_watching()?;
        let resolver = self.spawn_resolver();
        self.manager.initialize(args)?;

        until.await;

        self.stop().await;
        resolver.abort();
        self.manager.shutdown(args)?;
        Ok(())
    }

    /// Stops the watcher and drains in-flight analyses.
    pub async fn stop(&self) {
        let _ = self.shutdown.send(true);
        let task = self.watcher_task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
        self.pool.drain().await;
        info!("Host stopped");
    }
}

impl Default for SolderHost {
    fn default() -> Self {
        Self::new()
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");

        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.expect("failed to listen for Ctrl+C");
        info!("Received Ctrl+C, shutting down");
    }
}

// =============================================================================
// HostBuilder
// =============================================================================

/// Builder for creating a [`SolderHost`] with custom configuration.
///
/// ```rust,ignore
/// let host = SolderHost::builder()
///     .config_file("config/solder.yaml")
///     .loader(my_hook_registry)
///     .build()?;
/// ```
pub struct HostBuilder {
    config_file: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
    loader: Option<Arc<dyn ContainerLoader>>,
}

impl HostBuilder {
    /// Creates a new host builder.
    pub fn new() -> Self {
        Self {
            config_file: None,
            search_paths: Vec::new(),
            loader: None,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.search_paths.push(path.into());
        self
    }

    /// Sets the container loader (e.g. a populated
    /// [`HookRegistry`](crate::discovery::HookRegistry)).
    pub fn loader(mut self, loader: Arc<dyn ContainerLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Builds the host.
    pub fn build(self) -> ConfigResult<SolderHost> {
        let config = match &self.config_file {
            Some(path) => ConfigLoader::new().load_from_file(path)?,
            None => {
                let mut loader = ConfigLoader::new().with_current_dir();
                for path in &self.search_paths {
                    loader = loader.add_search_path(path);
                }
                loader.load()?
            }
        };
        let loader = self
            .loader
            .unwrap_or_else(|| Arc::new(HookRegistry::new()));
        Ok(SolderHost::assemble(&config, loader))
    }
}

impl Default for HostBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use solder_core::PluginInstance;

    use crate::discovery::HookSet;

    #[tokio::test]
    async fn scan_discovers_resolves_and_initializes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("app.plugin.yaml"),
            "id: com.example.app\nversion: '1.0'\ndependencies:\n  - id: com.example.lib\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("lib.plugin.yaml"),
            "id: com.example.lib\nversion: '1.0'\n",
        )
        .unwrap();

        let hooks = Arc::new(HookRegistry::new());
        hooks.register(
            "com.example.app",
            HookSet::new().construct(Arc::new(|_| {
                Ok(Arc::new("app instance".to_string()) as PluginInstance)
            })),
        );

        let config = SolderConfig {
            plugin_dirs: vec![dir.path().to_path_buf()],
            ..Default::default()
        };
        let host = SolderHost::assemble(&config, hooks);
        host.scan().await;

        let manager = host.manager();
        assert_eq!(manager.registry().len(), 2);
        let report = host.initialize(&InitArgs::new()).unwrap();
        assert_eq!(report.initialized.len(), 2);
        assert!(manager.is_active(&"com.example.app".into()));

        let instance = manager.instance(&"com.example.app".into()).unwrap();
        let text = instance.downcast::<String>().unwrap();
        assert_eq!(text.as_str(), "app instance");
    }

    #[tokio::test]
    async fn blocked_prefixes_from_config_are_applied() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("vendor.plugin.yaml"),
            "id: com.vendor.internal.tool\nversion: '1.0'\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("ok.plugin.yaml"),
            "id: com.example.ok\nversion: '1.0'\n",
        )
        .unwrap();

        let config = SolderConfig {
            plugin_dirs: vec![dir.path().to_path_buf()],
            blocked_prefixes: vec!["com.vendor.internal.".to_string()],
            ..Default::default()
        };
        let host = SolderHost::from_config(&config);
        host.scan().await;

        assert_eq!(host.manager().registry().len(), 1);
        assert!(host.manager().registry().lookup(&"com.example.ok".into()).is_some());
    }

    #[tokio::test]
    async fn run_until_performs_full_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("one.plugin.yaml"),
            "id: com.example.one\nversion: '1.0'\n",
        )
        .unwrap();

        let config = SolderConfig {
            plugin_dirs: vec![dir.path().to_path_buf()],
            ..Default::default()
        };
        let host = SolderHost::from_config(&config);
        host.run_until(&InitArgs::new(), async {}).await.unwrap();

        assert!(host.manager().is_shutting_down());
        assert!(!host.manager().is_active(&"com.example.one".into()));
    }
}
