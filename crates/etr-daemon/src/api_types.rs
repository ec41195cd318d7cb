//! Request and response types for the etr-daemon HTTP endpoints.
//!
//! No business logic lives here.

use etr_reconcile::ReconciliationSummary;
use etr_schemas::LicenseDetail;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
    /// `source_name()` of the registry client in use.
    pub registry: String,
    pub uptime_secs: u64,
    pub config_hash: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status code, repeated in the body.
    pub status: u16,
    pub message: String,
    pub timestamp_ms: i64,
}

// ---------------------------------------------------------------------------
// /v1/business/detail
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessDetailQuery {
    pub license_no: String,
    pub tin: String,
    #[serde(default = "default_lang")]
    pub lang: String,
}

fn default_lang() -> String {
    etr_registry::DEFAULT_LANG.to_string()
}

/// Either the stored license was refreshed (`sync` set, `updated = true`)
/// or the license is not stored and the registry detail is passed through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessDetailResponse {
    pub sync: Option<ReconciliationSummary>,
    pub detail: Option<LicenseDetail>,
    pub updated: bool,
}
