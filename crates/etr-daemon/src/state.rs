//! Shared runtime state for etr-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum.

use std::sync::Arc;
use std::time::Instant;

use etr_reconcile::ReconcileEngine;
use etr_registry::RegistryClient;

/// Static build metadata included in health responses.
#[derive(Clone, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            service: "etr-daemon",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

pub struct AppState {
    pub build: BuildInfo,
    pub engine: Arc<ReconcileEngine>,
    /// Used for pass-through lookups that bypass the engine.
    pub registry: Arc<dyn RegistryClient>,
    /// Hash of the effective config, when one was loaded.
    pub config_hash: Option<String>,
    started: Instant,
}

impl AppState {
    pub fn new(engine: Arc<ReconcileEngine>) -> Self {
        let registry = Arc::clone(engine.registry());
        Self {
            build: BuildInfo::default(),
            engine,
            registry,
            config_hash: None,
            started: Instant::now(),
        }
    }

    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}
