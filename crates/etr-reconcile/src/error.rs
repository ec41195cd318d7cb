use etr_registry::RegistryError;
use thiserror::Error;

use crate::store::StoreError;

/// Coarse classification of a [`ReconciliationError`], used by callers to
/// pick an outcome (e.g. an HTTP status).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// The remote registry has no record for the requested key.
    NotFound,
    /// The company or license is not stored locally.
    LocalMissing,
    /// A reachable payload lacks a required field.
    Validation,
    /// The registry could not be reached or answered with garbage.
    UpstreamUnavailable,
    /// Every license failed while creating a company.
    Incomplete,
    /// The aggregate store failed.
    Store,
}

/// Error surfaced by the public engine operations.
///
/// The message always names the offending TIN or license number(s).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ReconciliationError {
    pub kind: FailureKind,
    pub message: String,
}

impl ReconciliationError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Validation, message)
    }

    pub fn local_missing(message: impl Into<String>) -> Self {
        Self::new(FailureKind::LocalMissing, message)
    }

    /// Wrap a registry failure, prefixing `context`.
    pub fn from_registry(context: &str, err: &RegistryError) -> Self {
        let kind = match err {
            RegistryError::NotFound(_) => FailureKind::NotFound,
            RegistryError::Unavailable(_) | RegistryError::Decode(_) | RegistryError::Config(_) => {
                FailureKind::UpstreamUnavailable
            }
        };
        Self::new(kind, format!("{context}: {err}"))
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == FailureKind::NotFound
    }
}

impl From<StoreError> for ReconciliationError {
    fn from(e: StoreError) -> Self {
        Self::new(FailureKind::Store, e.to_string())
    }
}

/// Why a single license could not be merged. Never escapes the engine on its
/// own; it is either absorbed (fallback / skip) or folded into a
/// [`ReconciliationError`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub(crate) enum LicenceError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
