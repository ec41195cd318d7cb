//! Test support for the etr workspace: a scripted in-process registry, a
//! recording observer, payload fixtures and a wired-up engine harness.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use etr_reconcile::{
    Address, Company, FixedClock, License, MemoryStore, ReconcileEngine, ReconcileEvent,
    ReconcileObserver, SyncBranch, Tin,
};
use etr_registry::{RegistryClient, RegistryError};
use etr_schemas::{BusinessEntry, LicenseDetail, RegistrationInfo};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Registry double. Unscripted keys answer `NotFound`.
#[derive(Default)]
pub struct FakeRegistry {
    registrations: Mutex<HashMap<String, Result<RegistrationInfo, RegistryError>>>,
    details: Mutex<HashMap<String, Result<LicenseDetail, RegistryError>>>,
    registration_calls: Mutex<Vec<String>>,
    detail_calls: Mutex<Vec<String>>,
    latency: Mutex<Option<Duration>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_registration(&self, tin: &str, info: RegistrationInfo) {
        lock(&self.registrations).insert(tin.to_string(), Ok(info));
    }

    pub fn fail_registration(&self, tin: &str, err: RegistryError) {
        lock(&self.registrations).insert(tin.to_string(), Err(err));
    }

    pub fn set_detail(&self, licence_no: &str, detail: LicenseDetail) {
        lock(&self.details).insert(licence_no.to_string(), Ok(detail));
    }

    pub fn fail_detail(&self, licence_no: &str, err: RegistryError) {
        lock(&self.details).insert(licence_no.to_string(), Err(err));
    }

    /// Every call sleeps this long before answering.
    pub fn set_latency(&self, d: Duration) {
        *lock(&self.latency) = Some(d);
    }

    /// TINs looked up, in call order.
    pub fn registration_calls(&self) -> Vec<String> {
        lock(&self.registration_calls).clone()
    }

    /// License numbers looked up, in call order.
    pub fn detail_calls(&self) -> Vec<String> {
        lock(&self.detail_calls).clone()
    }

    pub fn total_calls(&self) -> usize {
        lock(&self.registration_calls).len() + lock(&self.detail_calls).len()
    }

    async fn pause(&self) {
        let latency = *lock(&self.latency);
        if let Some(d) = latency {
            tokio::time::sleep(d).await;
        }
    }
}

#[async_trait]
impl RegistryClient for FakeRegistry {
    fn source_name(&self) -> &'static str {
        "fake"
    }

    async fn registration_info(&self, tin: &str) -> Result<RegistrationInfo, RegistryError> {
        lock(&self.registration_calls).push(tin.to_string());
        self.pause().await;
        let scripted = lock(&self.registrations).get(tin).cloned();
        scripted.unwrap_or_else(|| Err(RegistryError::NotFound(format!("tin={tin}"))))
    }

    async fn license_detail(
        &self,
        licence_no: &str,
        tin: &str,
        _lang: &str,
    ) -> Result<LicenseDetail, RegistryError> {
        lock(&self.detail_calls).push(licence_no.to_string());
        self.pause().await;
        let scripted = lock(&self.details).get(licence_no).cloned();
        scripted.unwrap_or_else(|| {
            Err(RegistryError::NotFound(format!(
                "licence={licence_no} tin={tin}"
            )))
        })
    }
}

/// Observer that keeps every event for later assertions.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ReconcileEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReconcileEvent> {
        lock(&self.events).clone()
    }

    pub fn count(&self, pred: impl Fn(&ReconcileEvent) -> bool) -> usize {
        lock(&self.events).iter().filter(|e| pred(e)).count()
    }

    pub fn branches(&self) -> Vec<SyncBranch> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                ReconcileEvent::BranchSelected { branch, .. } => Some(*branch),
                _ => None,
            })
            .collect()
    }
}

impl ReconcileObserver for RecordingObserver {
    fn on_event(&self, event: &ReconcileEvent) {
        lock(&self.events).push(event.clone());
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// "Today" for every harness-driven scenario.
pub fn today() -> NaiveDate {
    date(2024, 6, 1)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

/// Registry-style US date string.
pub fn us_date(d: NaiveDate) -> String {
    d.format("%-m/%-d/%Y").to_string()
}

pub fn registration(tin: &str, business_name: &str, businesses: Vec<BusinessEntry>) -> RegistrationInfo {
    RegistrationInfo {
        tin: Some(tin.to_string()),
        legal_condition: Some("PLC".to_string()),
        reg_no: Some(format!("MT/AA/{tin}")),
        reg_date: Some("3/14/2019".to_string()),
        business_name: Some(business_name.to_string()),
        business_name_amh: None,
        paid_up_capital: None,
        associate_short_infos: Vec::new(),
        businesses,
    }
}

pub fn business(licence_no: &str, renewed_to: Option<NaiveDate>) -> BusinessEntry {
    BusinessEntry {
        main_guid: Some(format!("basic-{licence_no}")),
        licence_number: Some(licence_no.to_string()),
        trades_name: Some(format!("{licence_no} trading")),
        renewed_to: renewed_to.map(us_date),
        ..Default::default()
    }
}

pub fn detail(licence_no: &str, renewed_to: Option<NaiveDate>) -> LicenseDetail {
    LicenseDetail {
        main_guid: Some(format!("detail-{licence_no}")),
        licence_number: Some(licence_no.to_string()),
        trade_name: Some(format!("{licence_no} detailed")),
        status: Some(2),
        renewed_to: renewed_to.map(|d| d.format("%Y-%m-%dT00:00:00").to_string()),
        ..Default::default()
    }
}

pub fn licence(licence_no: &str, renewed_to: Option<NaiveDate>) -> License {
    License {
        main_guid: format!("stored-{licence_no}"),
        licence_number: licence_no.to_string(),
        trade_name: Some(format!("{licence_no} stored")),
        trade_name_amh: None,
        date_registered: None,
        renewal_date: None,
        renewed_from: None,
        renewed_to,
        status: Some(1),
        capital: None,
        address: Address::default(),
        sub_groups: Vec::new(),
    }
}

pub fn company(tin: Tin, licences: Vec<License>) -> Company {
    let mut c = Company::new(tin);
    c.business_name = Some("Stored Co".to_string());
    c.businesses = licences;
    c
}

/// Engine wired to a [`FakeRegistry`], a [`MemoryStore`], a
/// [`RecordingObserver`] and a clock frozen at [`today`].
pub struct Harness {
    pub registry: Arc<FakeRegistry>,
    pub store: MemoryStore,
    pub observer: Arc<RecordingObserver>,
    pub engine: Arc<ReconcileEngine>,
}

impl Harness {
    pub fn new() -> Self {
        let registry = Arc::new(FakeRegistry::new());
        let store = MemoryStore::new();
        let observer = Arc::new(RecordingObserver::new());
        let engine = ReconcileEngine::new(registry.clone(), Arc::new(store.clone()))
            .with_observer(observer.clone())
            .with_clock(Arc::new(FixedClock::on(today())));
        Self {
            registry,
            store,
            observer,
            engine: Arc::new(engine),
        }
    }

    pub fn stored(&self, tin: &str) -> Option<Company> {
        let tin = Tin::parse(tin).ok()?;
        self.store.get_committed(&tin).ok().flatten()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
