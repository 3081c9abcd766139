//! The serve loop: pulls raw events from an [`EventSource`], dispatches each
//! one, and writes back exactly one response per event, in order.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use gantry_runtime::Runtime;
//!
//! // Loads gantry.toml from the current directory if there is one.
//! let runtime = Runtime::new();
//! runtime.serve(router).await?;
//!
//! // Explicit configuration
//! let runtime = Runtime::builder()
//!     .config_file("deploy/gantry.toml")
//!     .profile("production")
//!     .build()?;
//! ```

use std::future::Future;
use std::path::Path;

use gantry_core::{BoxedHandler, Response, Router};
use tracing::{Level, debug, error, info, span, warn};

use crate::config::{ConfigLoader, ConfigResult, GantryConfig, LogOutput};
use crate::error::RuntimeResult;
use crate::logging;
use crate::source::{self, EventSource};

/// Counters for one serve loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    /// Events answered.
    pub events: u64,
    /// Responses with a 4xx status.
    pub client_errors: u64,
    /// Responses with a 5xx status.
    pub server_errors: u64,
    /// Events refused for exceeding `source.max_event_bytes`.
    pub oversized: u64,
}

impl ServeStats {
    fn record(&mut self, response: &Response) {
        self.events += 1;
        match response.status_code {
            400..=499 => self.client_errors += 1,
            500..=599 => self.server_errors += 1,
            _ => {}
        }
    }
}

/// What each event is dispatched to.
enum Target {
    Router(Router),
    Chain(Vec<BoxedHandler>),
}

impl Target {
    fn handle(&self, raw: &[u8]) -> Response {
        match self {
            Self::Router(router) => router.handle_event(raw),
            Self::Chain(handlers) => gantry_core::handle_event(raw, handlers),
        }
    }
}

/// Owns the configuration and drives serve loops.
#[derive(Debug, Clone)]
pub struct Runtime {
    config: GantryConfig,
}

impl Runtime {
    /// Loads configuration from the current directory and the environment,
    /// falling back to defaults, and initializes logging.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                GantryConfig::default()
            });

        Self::from_config(&config)
    }

    /// Creates a builder for custom configuration loading.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from an already loaded configuration.
    ///
    /// Installs the global `tracing` subscriber unless one is already set.
    pub fn from_config(config: &GantryConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            max_event_bytes = config.source.max_event_bytes,
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &GantryConfig {
        &self.config
    }

    /// Serves `router` over stdin/stdout until input ends or a shutdown
    /// signal arrives.
    pub async fn serve(&self, router: Router) -> RuntimeResult<ServeStats> {
        self.warn_if_logging_to_stdout();
        self.run(Target::Router(router), self.stdio(), wait_for_shutdown())
            .await
    }

    /// Serves one handler chain for every event over stdin/stdout, without
    /// routing.
    pub async fn serve_chain(&self, handlers: Vec<BoxedHandler>) -> RuntimeResult<ServeStats> {
        self.warn_if_logging_to_stdout();
        self.run(Target::Chain(handlers), self.stdio(), wait_for_shutdown())
            .await
    }

    fn stdio(&self) -> source::StdioSource {
        source::stdio().with_max_event_bytes(self.config.source.max_event_bytes)
    }

    /// Serves `router` from `source` until the source is exhausted.
    pub async fn serve_with<S: EventSource>(
        &self,
        router: Router,
        source: S,
    ) -> RuntimeResult<ServeStats> {
        self.run(Target::Router(router), source, std::future::pending())
            .await
    }

    /// Serves one handler chain from `source` until the source is exhausted.
    pub async fn serve_chain_with<S: EventSource>(
        &self,
        handlers: Vec<BoxedHandler>,
        source: S,
    ) -> RuntimeResult<ServeStats> {
        self.run(Target::Chain(handlers), source, std::future::pending())
            .await
    }

    /// Serves `router` from `source` until the source is exhausted or
    /// `shutdown` completes.
    pub async fn serve_until<S, F>(
        &self,
        router: Router,
        source: S,
        shutdown: F,
    ) -> RuntimeResult<ServeStats>
    where
        S: EventSource,
        F: Future<Output = ()>,
    {
        self.run(Target::Router(router), source, shutdown).await
    }

    async fn run<S, F>(&self, target: Target, mut source: S, shutdown: F) -> RuntimeResult<ServeStats>
    where
        S: EventSource,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut stats = ServeStats::default();

        info!("Serving events");

        loop {
            let event = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping event loop");
                    break;
                }
                event = source.next_event() => event?,
            };

            let Some(raw) = event else {
                debug!("Event source exhausted");
                break;
            };

            let response = self.invoke(&target, stats.events + 1, &raw, &mut stats);
            stats.record(&response);
            source.send_response(&response).await?;
        }

        info!(
            events = stats.events,
            client_errors = stats.client_errors,
            server_errors = stats.server_errors,
            "Event loop finished"
        );

        Ok(stats)
    }

    fn invoke(&self, target: &Target, seq: u64, raw: &[u8], stats: &mut ServeStats) -> Response {
        let span = span!(Level::INFO, "event", seq, bytes = raw.len());
        let _enter = span.enter();

        let limit = self.config.source.max_event_bytes;
        if raw.len() > limit {
            error!(bytes = raw.len(), limit, "Event exceeds size limit");
            stats.oversized += 1;
            return Response::internal_error();
        }

        target.handle(raw)
    }

    fn warn_if_logging_to_stdout(&self) {
        if self.config.logging.output == LogOutput::Stdout {
            warn!("Logging to stdout while serving over stdio; log lines will mix with responses");
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for Ctrl+C or SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("Received Ctrl+C, shutting down");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
                return;
            }
            Err(err) => warn!(error = %err, "Failed to register SIGTERM handler"),
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(err) => {
            warn!(error = %err, "Failed to listen for Ctrl+C; serving until input ends");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`Runtime`] with custom configuration loading.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    /// Loads exactly this configuration file.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges configuration programmatically.
    pub fn merge(mut self, config: GantryConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Loads the configuration and builds the runtime.
    pub fn build(self) -> ConfigResult<Runtime> {
        let config = self.config_loader.load()?;
        Ok(Runtime::from_config(&config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
