use std::sync::Arc;

use etr_registry::{RegistryClient, DEFAULT_LANG};
use etr_schemas::{BusinessEntry, RegistrationInfo};

use crate::error::{FailureKind, LicenceError, ReconciliationError};
use crate::events::{ReconcileEvent, ReconcileObserver, TracingObserver};
use crate::mapping::{
    apply_registration, licence_from_basic, licence_from_detail, update_from_basic,
    update_from_detail, verify_detail, VerifiedDetail,
};
use crate::model::{Company, Tin};
use crate::store::{AggregateStore, AggregateTxn};
use crate::types::{Clock, DetailSource, ReconciliationSummary, SyncBranch, SystemClock};

pub const MSG_FAST_PATH: &str = "Data exists with valid licenses";
pub const MSG_CREATED: &str = "Successfully added new customer";
pub const MSG_CREATED_DEGRADED: &str = "Added new customer with some businesses using basic info";
pub const MSG_REFRESHED: &str = "Successfully updated with renewable licenses";
pub const MSG_REFRESHED_STALE: &str = "Updated but some licenses are expired or not renewable";

/// Outcome of merging one registry business entry.
enum Merge {
    Skipped,
    Merged(DetailSource),
    Failed(String),
}

/// Per-run tally of license outcomes.
#[derive(Default)]
struct Tally {
    attempted: usize,
    degraded: Vec<String>,
    failed: Vec<String>,
}

/// Brings the locally stored company for a TIN in line with the registry.
///
/// Each run holds the store's transaction for that TIN from the first read
/// to the commit, so concurrent runs for one TIN are serialized.
pub struct ReconcileEngine {
    registry: Arc<dyn RegistryClient>,
    store: Arc<dyn AggregateStore>,
    observer: Arc<dyn ReconcileObserver>,
    clock: Arc<dyn Clock>,
    lang: String,
}

impl ReconcileEngine {
    pub fn new(registry: Arc<dyn RegistryClient>, store: Arc<dyn AggregateStore>) -> Self {
        Self {
            registry,
            store,
            observer: Arc::new(TracingObserver),
            clock: Arc::new(SystemClock),
            lang: DEFAULT_LANG.to_string(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ReconcileObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Language used for detail lookups during `reconcile`.
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn registry(&self) -> &Arc<dyn RegistryClient> {
        &self.registry
    }

    fn emit(&self, event: ReconcileEvent) {
        self.observer.on_event(&event);
    }

    /// Create, fast-path, or refresh the company for `tin`.
    pub async fn reconcile(&self, tin: &str) -> Result<ReconciliationSummary, ReconciliationError> {
        let tin = Tin::parse(tin)?;
        let mut tx = self.store.begin(&tin).await?;
        let today = self.clock.today();

        match tx.get().await? {
            None => {
                self.select(&tin, SyncBranch::Created);
                self.create_from_remote(tx, tin).await
            }
            Some(company) if !company.needs_attention(today) => {
                self.select(&tin, SyncBranch::FastPath);
                Ok(ReconciliationSummary::of(
                    &company,
                    MSG_FAST_PATH,
                    true,
                    SyncBranch::FastPath,
                ))
            }
            Some(company) => {
                self.select(&tin, SyncBranch::Refreshed);
                self.refresh_expired(tx, company).await
            }
        }
    }

    fn select(&self, tin: &Tin, branch: SyncBranch) {
        self.emit(ReconcileEvent::BranchSelected {
            tin: tin.to_string(),
            branch,
        });
    }

    async fn fetch_registration(&self, tin: &Tin) -> Result<RegistrationInfo, ReconciliationError> {
        self.registry
            .registration_info(tin.as_str())
            .await
            .map_err(|e| {
                ReconciliationError::from_registry(
                    &format!("Registration lookup failed for TIN: {tin}"),
                    &e,
                )
            })
    }

    async fn create_from_remote(
        &self,
        mut tx: Box<dyn AggregateTxn>,
        tin: Tin,
    ) -> Result<ReconciliationSummary, ReconciliationError> {
        let info = self.fetch_registration(&tin).await?;
        check_registration(&tin, &info)?;

        let mut company = Company::new(tin.clone());
        apply_registration(&mut company, &info);

        let mut tally = Tally::default();
        for entry in &info.businesses {
            self.merge_entry(&mut company, entry, &mut tally).await;
        }

        if tally.attempted > 0 && tally.failed.len() == tally.attempted {
            return Err(ReconciliationError::new(
                FailureKind::Incomplete,
                format!(
                    "Failed to add customer for TIN: {tin}: every license failed ({})",
                    tally.failed.join(", ")
                ),
            ));
        }

        self.persist(&mut tx, &company).await?;
        tx.commit().await?;

        let renewable = !company.needs_attention(self.clock.today());
        let message = if tally.degraded.is_empty() && tally.failed.is_empty() {
            MSG_CREATED.to_string()
        } else if tally.failed.is_empty() {
            MSG_CREATED_DEGRADED.to_string()
        } else {
            format!("{MSG_CREATED_DEGRADED} (failed: {})", tally.failed.join(", "))
        };

        Ok(self.finish(&company, message, renewable, SyncBranch::Created, tally))
    }

    async fn refresh_expired(
        &self,
        mut tx: Box<dyn AggregateTxn>,
        mut company: Company,
    ) -> Result<ReconciliationSummary, ReconciliationError> {
        let info = self.fetch_registration(&company.tin).await?;
        check_registration(&company.tin, &info)?;
        apply_registration(&mut company, &info);

        let mut tally = Tally::default();
        for entry in &info.businesses {
            self.merge_entry(&mut company, entry, &mut tally).await;
        }

        self.persist(&mut tx, &company).await?;
        tx.commit().await?;

        let renewable = !company.needs_attention(self.clock.today());
        let message = if renewable {
            MSG_REFRESHED
        } else {
            MSG_REFRESHED_STALE
        };

        Ok(self.finish(&company, message, renewable, SyncBranch::Refreshed, tally))
    }

    /// Merge one registry business entry into `company`, preferring the
    /// detail lookup and falling back to the entry itself when the lookup
    /// fails. A detail payload that fails validation drops the license.
    async fn merge_entry(&self, company: &mut Company, entry: &BusinessEntry, tally: &mut Tally) {
        let tin = company.tin.to_string();
        let Some(licence_no) = entry.licence_no().map(str::to_string) else {
            self.emit(ReconcileEvent::LicenceSkipped { tin });
            return;
        };
        tally.attempted += 1;

        let outcome = match self.fetch_detail(&tin, &licence_no, &self.lang).await {
            Ok(v) => {
                let created = match company.licence_mut(&licence_no) {
                    Some(existing) => {
                        update_from_detail(existing, &v);
                        false
                    }
                    None => {
                        company.businesses.push(licence_from_detail(&v));
                        true
                    }
                };
                self.merged(&tin, &licence_no, DetailSource::Detail, created);
                Merge::Merged(DetailSource::Detail)
            }
            Err(LicenceError::Validation(cause)) => Merge::Failed(cause),
            Err(LicenceError::Registry(e)) => {
                self.emit(ReconcileEvent::DetailFallback {
                    tin: tin.clone(),
                    licence_no: licence_no.clone(),
                    cause: e.to_string(),
                });
                match company.licence_mut(&licence_no) {
                    Some(existing) => {
                        update_from_basic(existing, entry);
                        self.merged(&tin, &licence_no, DetailSource::BasicInfo, false);
                        Merge::Merged(DetailSource::BasicInfo)
                    }
                    None => match licence_from_basic(entry, self.clock.now_millis()) {
                        Some(lic) => {
                            company.businesses.push(lic);
                            self.merged(&tin, &licence_no, DetailSource::BasicInfo, true);
                            Merge::Merged(DetailSource::BasicInfo)
                        }
                        None => Merge::Skipped,
                    },
                }
            }
        };

        match outcome {
            Merge::Merged(DetailSource::Detail) | Merge::Skipped => {}
            Merge::Merged(DetailSource::BasicInfo) => tally.degraded.push(licence_no),
            Merge::Failed(cause) => {
                self.emit(ReconcileEvent::LicenceFailed {
                    tin,
                    licence_no: licence_no.clone(),
                    cause,
                });
                tally.failed.push(licence_no);
            }
        }
    }

    async fn fetch_detail(
        &self,
        tin: &str,
        licence_no: &str,
        lang: &str,
    ) -> Result<VerifiedDetail, LicenceError> {
        self.emit(ReconcileEvent::DetailFetchAttempt {
            tin: tin.to_string(),
            licence_no: licence_no.to_string(),
        });
        let detail = self.registry.license_detail(licence_no, tin, lang).await?;
        let v = verify_detail(detail, licence_no, self.clock.now_millis())?;
        if v.guid_synthesized {
            self.emit(ReconcileEvent::GuidSynthesized {
                tin: tin.to_string(),
                licence_no: licence_no.to_string(),
                main_guid: v.main_guid.clone(),
            });
        }
        Ok(v)
    }

    fn merged(&self, tin: &str, licence_no: &str, source: DetailSource, created: bool) {
        self.emit(ReconcileEvent::LicenceMerged {
            tin: tin.to_string(),
            licence_no: licence_no.to_string(),
            source,
            created,
        });
    }

    async fn persist(
        &self,
        tx: &mut Box<dyn AggregateTxn>,
        company: &Company,
    ) -> Result<(), ReconciliationError> {
        tx.put(company).await?;
        self.emit(ReconcileEvent::CompanyPersisted {
            tin: company.tin.to_string(),
            licences: company.businesses.len(),
        });
        Ok(())
    }

    fn finish(
        &self,
        company: &Company,
        message: impl Into<String>,
        renewable: bool,
        branch: SyncBranch,
        tally: Tally,
    ) -> ReconciliationSummary {
        let mut summary = ReconciliationSummary::of(company, message, renewable, branch);
        summary.degraded_licences = tally.degraded;
        summary.failed_licences = tally.failed;
        summary
    }

    /// Refresh one stored license from its detail record.
    ///
    /// Both the company and the license must already be stored. `lang`
    /// defaults to the engine's language.
    pub async fn update_business_details(
        &self,
        licence_no: &str,
        tin: &str,
        lang: Option<&str>,
    ) -> Result<ReconciliationSummary, ReconciliationError> {
        let tin = Tin::parse(tin)?;
        let licence_no = licence_no.trim();
        if licence_no.is_empty() {
            return Err(ReconciliationError::validation("License number cannot be empty"));
        }
        let lang = lang.unwrap_or(&self.lang);

        let mut tx = self.store.begin(&tin).await?;
        let mut company = tx.get().await?.ok_or_else(|| {
            ReconciliationError::local_missing(format!(
                "Customer not found in company database for TIN: {tin}"
            ))
        })?;
        if company.licence(licence_no).is_none() {
            return Err(ReconciliationError::local_missing(format!(
                "Business not found in company database for license: {licence_no}"
            )));
        }
        self.select(&tin, SyncBranch::LicenceUpdated);

        let v = match self.fetch_detail(tin.as_str(), licence_no, lang).await {
            Ok(v) => v,
            Err(LicenceError::Validation(cause)) => {
                self.emit(ReconcileEvent::LicenceFailed {
                    tin: tin.to_string(),
                    licence_no: licence_no.to_string(),
                    cause: cause.clone(),
                });
                return Err(ReconciliationError::validation(format!(
                    "Invalid business detail for license: {licence_no}: {cause}"
                )));
            }
            Err(LicenceError::Registry(e)) => {
                self.emit(ReconcileEvent::LicenceFailed {
                    tin: tin.to_string(),
                    licence_no: licence_no.to_string(),
                    cause: e.to_string(),
                });
                return Err(ReconciliationError::from_registry(
                    &format!("Failed to fetch business details for license: {licence_no}"),
                    &e,
                ));
            }
        };

        let renewable = match company.licence_mut(licence_no) {
            Some(lic) => {
                update_from_detail(lic, &v);
                lic.is_renewal_confirmed(self.clock.today())
            }
            None => false,
        };
        self.merged(tin.as_str(), licence_no, DetailSource::Detail, false);

        self.persist(&mut tx, &company).await?;
        tx.commit().await?;

        Ok(ReconciliationSummary::of(
            &company,
            format!("Successfully updated business details for license: {licence_no}"),
            renewable,
            SyncBranch::LicenceUpdated,
        ))
    }
}

/// Reject a registration payload lacking required header fields before any
/// of it reaches the aggregate.
fn check_registration(tin: &Tin, info: &RegistrationInfo) -> Result<(), ReconciliationError> {
    let missing = info.missing_required_fields();
    if missing.is_empty() {
        return Ok(());
    }
    Err(ReconciliationError::validation(format!(
        "Invalid registration info for TIN: {tin}: missing required fields ({})",
        missing.join(", ")
    )))
}
