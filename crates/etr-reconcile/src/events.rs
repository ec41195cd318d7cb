//! Structured observability hook for the engine.
//!
//! The engine reports what it did as [`ReconcileEvent`]s; how they are
//! rendered is up to the observer. [`TracingObserver`] is the production
//! default.

use tracing::{error, info, warn};

use crate::types::{DetailSource, SyncBranch};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileEvent {
    BranchSelected {
        tin: String,
        branch: SyncBranch,
    },
    /// A registry business entry had no usable license number.
    LicenceSkipped {
        tin: String,
    },
    DetailFetchAttempt {
        tin: String,
        licence_no: String,
    },
    /// Detail lookup failed; the basic registration entry is used instead.
    DetailFallback {
        tin: String,
        licence_no: String,
        cause: String,
    },
    LicenceFailed {
        tin: String,
        licence_no: String,
        cause: String,
    },
    GuidSynthesized {
        tin: String,
        licence_no: String,
        main_guid: String,
    },
    LicenceMerged {
        tin: String,
        licence_no: String,
        source: DetailSource,
        created: bool,
    },
    CompanyPersisted {
        tin: String,
        licences: usize,
    },
}

pub trait ReconcileObserver: Send + Sync {
    fn on_event(&self, event: &ReconcileEvent);
}

/// Renders events as `tracing` events with `tin` / `licence_no` / `cause`
/// fields.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl ReconcileObserver for TracingObserver {
    fn on_event(&self, event: &ReconcileEvent) {
        match event {
            ReconcileEvent::BranchSelected { tin, branch } => {
                info!(tin = %tin, branch = ?branch, "reconcile branch selected");
            }
            ReconcileEvent::LicenceSkipped { tin } => {
                warn!(tin = %tin, "skipping business with empty license number");
            }
            ReconcileEvent::DetailFetchAttempt { tin, licence_no } => {
                info!(tin = %tin, licence_no = %licence_no, "fetching license detail");
            }
            ReconcileEvent::DetailFallback {
                tin,
                licence_no,
                cause,
            } => {
                warn!(
                    tin = %tin,
                    licence_no = %licence_no,
                    cause = %cause,
                    "license detail unavailable, using basic info"
                );
            }
            ReconcileEvent::LicenceFailed {
                tin,
                licence_no,
                cause,
            } => {
                error!(tin = %tin, licence_no = %licence_no, cause = %cause, "license not merged");
            }
            ReconcileEvent::GuidSynthesized {
                tin,
                licence_no,
                main_guid,
            } => {
                info!(tin = %tin, licence_no = %licence_no, main_guid = %main_guid, "synthesized main guid");
            }
            ReconcileEvent::LicenceMerged {
                tin,
                licence_no,
                source,
                created,
            } => {
                info!(
                    tin = %tin,
                    licence_no = %licence_no,
                    source = ?source,
                    created = *created,
                    "license merged"
                );
            }
            ReconcileEvent::CompanyPersisted { tin, licences } => {
                info!(tin = %tin, licences = *licences, "company persisted");
            }
        }
    }
}
