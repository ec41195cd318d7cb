use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Company;

/// Which of the three reconciliation branches ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncBranch {
    /// No local company; built from the registry.
    Created,
    /// Every local license renewal-confirmed; no remote calls.
    FastPath,
    /// Local company refreshed from the registry.
    Refreshed,
    /// One license refreshed on request.
    LicenceUpdated,
}

/// Where a merged license's data came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailSource {
    Detail,
    BasicInfo,
}

/// Result of one reconciliation, returned to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationSummary {
    pub tin: String,
    pub business_name: Option<String>,
    pub status: String,
    pub latest_renewed_to: Option<NaiveDate>,
    pub renewable: bool,
    pub message: String,
    pub branch: SyncBranch,
    /// Licenses merged from basic info because the detail lookup failed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded_licences: Vec<String>,
    /// Licenses that could not be merged at all.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_licences: Vec<String>,
}

impl ReconciliationSummary {
    /// Summary of `company` as it stands. `renewable` is decided by the
    /// calling branch, not recomputed here.
    pub fn of(company: &Company, message: impl Into<String>, renewable: bool, branch: SyncBranch) -> Self {
        let message = message.into();
        Self {
            tin: company.tin.to_string(),
            business_name: company.business_name.clone(),
            status: message.clone(),
            latest_renewed_to: company.latest_renewed_to(),
            renewable,
            message,
            branch,
            degraded_licences: Vec::new(),
            failed_licences: Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.degraded_licences.is_empty() || !self.failed_licences.is_empty()
    }
}

/// Source of "today" and of timestamps used for synthesized identifiers.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
    fn now_millis(&self) -> i64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }

    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Frozen clock for tests and replays.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock {
    pub today: NaiveDate,
    pub millis: i64,
}

impl FixedClock {
    pub fn on(today: NaiveDate) -> Self {
        let millis = today
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or_default();
        Self { today, millis }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.today
    }

    fn now_millis(&self) -> i64 {
        self.millis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Tin;

    #[test]
    fn summary_copies_message_into_status() {
        let mut c = Company::new(Tin::parse("0012345").unwrap());
        c.business_name = Some("Acme Trading".to_string());

        let s = ReconciliationSummary::of(&c, "ok", true, SyncBranch::FastPath);
        assert_eq!(s.tin, "0012345");
        assert_eq!(s.status, "ok");
        assert_eq!(s.message, "ok");
        assert_eq!(s.latest_renewed_to, None);
        assert!(s.renewable);
        assert!(!s.is_degraded());
    }

    #[test]
    fn summary_serializes_camel_case_and_hides_empty_lists() {
        let c = Company::new(Tin::parse("1").unwrap());
        let s = ReconciliationSummary::of(&c, "m", false, SyncBranch::Created);
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["branch"], "created");
        assert!(v.get("latestRenewedTo").is_some());
        assert!(v.get("failedLicences").is_none());
    }

    #[test]
    fn fixed_clock_millis_is_midnight_utc() {
        let c = FixedClock::on(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap());
        assert_eq!(c.now_millis(), 86_400_000);
    }
}
