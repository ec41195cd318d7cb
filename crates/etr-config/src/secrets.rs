//! Runtime secret resolution.
//!
//! Config YAML stores only env var NAMES (`database.url_env`). Binaries
//! resolve them once at startup and pass the result to constructors.
//! Values never appear in `Debug` output or error messages.

use anyhow::{bail, Result};

use crate::AppConfig;

#[derive(Clone)]
pub struct ResolvedSecrets {
    /// Name of the env var the URL was read from.
    pub database_url_env: String,
    /// `None` if the named env var was unset or blank.
    pub database_url: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("database_url_env", &self.database_url_env)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

impl ResolvedSecrets {
    /// The database URL, or an error naming the env var that should hold it.
    pub fn require_database_url(&self) -> Result<&str> {
        match self.database_url.as_deref() {
            Some(url) => Ok(url),
            None => bail!(
                "SECRETS_MISSING: required env var '{}' (database url) is not set or empty",
                self.database_url_env
            ),
        }
    }
}

/// Resolve from the process environment.
pub fn resolve_secrets(cfg: &AppConfig) -> ResolvedSecrets {
    resolve_secrets_with(cfg, |k| std::env::var(k).ok())
}

pub fn resolve_secrets_with(
    cfg: &AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> ResolvedSecrets {
    let name = cfg.database.url_env.trim().to_string();
    let database_url = lookup(&name).filter(|v| !v.trim().is_empty());
    ResolvedSecrets {
        database_url_env: name,
        database_url,
    }
}
