//! Command handler modules for the etr CLI.
//!
//! Shared wiring (config, registry client, store) lives here.

pub mod registry;
pub mod sync;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use etr_config::{resolve_secrets, AppConfig, LoadedConfig};
use etr_reconcile::{AggregateStore, MemoryStore, ReconcileEngine};
use etr_registry::HttpRegistryClient;
use serde::Serialize;

/// Effective config for this invocation plus the loaded document, if any.
pub struct Ctx {
    pub cfg: AppConfig,
    pub loaded: Option<LoadedConfig>,
}

impl Ctx {
    pub fn load(config_paths: &[String]) -> Result<Self> {
        let refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
        let (cfg, loaded) = AppConfig::load(&refs)?;
        Ok(Self { cfg, loaded })
    }

    pub fn config_hash(&self) -> Option<&str> {
        self.loaded.as_ref().map(|l| l.config_hash.as_str())
    }

    pub fn registry_client(&self) -> Result<HttpRegistryClient> {
        let r = &self.cfg.registry;
        HttpRegistryClient::new(
            r.base_url.clone(),
            r.referer.clone(),
            r.lang.clone(),
            Duration::from_secs(r.timeout_secs),
        )
        .context("registry client")
    }

    /// Postgres store from the configured env var, or an in-memory store
    /// when `dry_run` is set.
    pub async fn store(&self, dry_run: bool) -> Result<Arc<dyn AggregateStore>> {
        if dry_run {
            return Ok(Arc::new(MemoryStore::new()));
        }
        let secrets = resolve_secrets(&self.cfg);
        let pool = etr_db::connect(secrets.require_database_url()?).await?;
        Ok(Arc::new(etr_db::PgAggregateStore::new(pool)))
    }

    pub async fn engine(&self, dry_run: bool) -> Result<ReconcileEngine> {
        let registry = Arc::new(self.registry_client()?);
        let store = self.store(dry_run).await?;
        Ok(ReconcileEngine::new(registry, store).with_lang(self.cfg.registry.lang.clone()))
    }
}

pub fn print_json<T: Serialize>(v: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(v).context("serialize output")?;
    println!("{s}");
    Ok(())
}
