//! Registry client boundary.
//!
//! This module defines **only** the client trait and its error type. The
//! reqwest-backed implementation lives in `lib.rs`; fakes for tests live in
//! `etr-testkit`.

use async_trait::async_trait;
use etr_schemas::{LicenseDetail, RegistrationInfo};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors a [`RegistryClient`] may return.
///
/// `NotFound` means the registry was reachable and has no record;
/// `Unavailable` means it could not be reached or answered with a server
/// error. Callers that only care about "do we have a payload" can treat both
/// alike, but they are kept apart so the distinction survives into logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("not found in registry: {0}")]
    NotFound(String),

    #[error("registry unavailable: {0}")]
    Unavailable(String),

    #[error("registry response decode failed: {0}")]
    Decode(String),

    #[error("registry client config error: {0}")]
    Config(String),
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound(_))
    }
}

// ---------------------------------------------------------------------------
// Client trait
// ---------------------------------------------------------------------------

/// Read-only lookups against the government business registry.
///
/// Object safe so the engine can hold an `Arc<dyn RegistryClient>`.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Human-readable name of the backing source (e.g. `"etrade-http"`).
    fn source_name(&self) -> &'static str;

    /// Registration record for `tin`, including the basic per-license entries.
    async fn registration_info(&self, tin: &str) -> Result<RegistrationInfo, RegistryError>;

    /// Detailed record for one license. `lang` is the registry language code
    /// (`"en"`, `"am"`).
    async fn license_detail(
        &self,
        licence_no: &str,
        tin: &str,
        lang: &str,
    ) -> Result<LicenseDetail, RegistryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_names_the_key() {
        let err = RegistryError::NotFound("tin=0012345".to_string());
        assert_eq!(err.to_string(), "not found in registry: tin=0012345");
        assert!(err.is_not_found());

        let err = RegistryError::Unavailable("connection refused".to_string());
        assert_eq!(err.to_string(), "registry unavailable: connection refused");
        assert!(!err.is_not_found());
    }
}
