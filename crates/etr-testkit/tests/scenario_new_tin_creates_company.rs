//! Scenario: unseen TIN takes the creation path.
//!
//! 1. No local company => create, never refresh.
//! 2. Detail wins over basic info (future renewal => renewable).
//! 3. One failed detail lookup out of two => both persisted, degraded.
//! 4. Every license failing validation => nothing persisted.
//! 5. Missing main GUID is synthesized from the license number.

use etr_reconcile::{
    DetailSource, FailureKind, ReconcileEvent, SyncBranch, MSG_CREATED, MSG_CREATED_DEGRADED,
};
use etr_registry::RegistryError;
use etr_schemas::LicenseDetail;
use etr_testkit::{business, date, detail, registration, today, Harness};

#[tokio::test]
async fn acme_expired_basic_but_renewed_detail_is_renewable() {
    let h = Harness::new();
    let past = date(2023, 7, 7);
    let next_year = date(2025, 6, 1);

    h.registry.set_registration(
        "0012345",
        registration("0012345", "Acme Trading", vec![business("LIC-1", Some(past))]),
    );
    h.registry.set_detail("LIC-1", detail("LIC-1", Some(next_year)));

    let s = h.engine.reconcile("0012345").await.unwrap();

    assert_eq!(s.branch, SyncBranch::Created);
    assert_eq!(s.message, MSG_CREATED);
    assert!(s.renewable);
    assert_eq!(s.latest_renewed_to, Some(next_year));
    assert_eq!(s.business_name.as_deref(), Some("Acme Trading"));

    let stored = h.stored("0012345").expect("company persisted");
    assert_eq!(stored.businesses.len(), 1);
    assert_eq!(stored.businesses[0].renewed_to, Some(next_year));
    assert_eq!(stored.businesses[0].main_guid, "detail-LIC-1");
    assert_eq!(stored.reg_date, Some(date(2019, 3, 14)));

    assert_eq!(h.observer.branches(), vec![SyncBranch::Created]);
    assert_eq!(h.registry.registration_calls(), vec!["0012345".to_string()]);
    assert!(today() < next_year);
}

#[tokio::test]
async fn one_failed_detail_falls_back_to_basic_info() {
    let h = Harness::new();
    let future = date(2025, 1, 1);

    h.registry.set_registration(
        "T2",
        registration(
            "T2",
            "Two Shops",
            vec![business("A", Some(future)), business("B", Some(future))],
        ),
    );
    h.registry.set_detail("A", detail("A", Some(future)));
    h.registry
        .fail_detail("B", RegistryError::Unavailable("connection reset".to_string()));

    let s = h.engine.reconcile("T2").await.unwrap();

    assert_eq!(s.branch, SyncBranch::Created);
    assert_eq!(s.message, MSG_CREATED_DEGRADED);
    assert_eq!(s.degraded_licences, vec!["B".to_string()]);
    assert!(s.failed_licences.is_empty());
    assert!(s.is_degraded());

    let stored = h.stored("T2").unwrap();
    let a = stored.licence("A").unwrap();
    let b = stored.licence("B").unwrap();
    assert_eq!(a.main_guid, "detail-A");
    assert_eq!(a.status, Some(2));
    assert_eq!(b.main_guid, "basic-B");
    assert_eq!(b.status, Some(1));
    assert!(b.address.is_empty());

    assert_eq!(
        h.observer.count(|e| matches!(e, ReconcileEvent::DetailFallback { licence_no, .. } if licence_no == "B")),
        1
    );
    assert_eq!(
        h.observer.count(|e| matches!(
            e,
            ReconcileEvent::LicenceMerged { source: DetailSource::BasicInfo, .. }
        )),
        1
    );
}

#[tokio::test]
async fn every_licence_failing_persists_nothing() {
    let h = Harness::new();
    h.registry.set_registration(
        "T3",
        registration("T3", "Broken Co", vec![business("A", None), business("B", None)]),
    );
    // Reachable detail payloads without a license number fail validation.
    h.registry.set_detail("A", LicenseDetail::default());
    h.registry.set_detail("B", LicenseDetail::default());

    let err = h.engine.reconcile("T3").await.unwrap_err();

    assert_eq!(err.kind, FailureKind::Incomplete);
    assert!(err.message.contains("T3"));
    assert!(err.message.contains("A, B"));
    assert!(h.stored("T3").is_none());
    assert!(h.store.is_empty());
    assert_eq!(
        h.observer.count(|e| matches!(e, ReconcileEvent::LicenceFailed { .. })),
        2
    );
    assert_eq!(
        h.observer.count(|e| matches!(e, ReconcileEvent::CompanyPersisted { .. })),
        0
    );
}

#[tokio::test]
async fn partial_validation_failure_names_failed_licences() {
    let h = Harness::new();
    let future = date(2025, 1, 1);
    h.registry.set_registration(
        "T4",
        registration("T4", "Half Co", vec![business("A", Some(future)), business("B", None)]),
    );
    h.registry.set_detail("A", detail("A", Some(future)));
    h.registry.set_detail("B", LicenseDetail::default());

    let s = h.engine.reconcile("T4").await.unwrap();

    assert_eq!(s.failed_licences, vec!["B".to_string()]);
    assert_eq!(s.message, format!("{MSG_CREATED_DEGRADED} (failed: B)"));
    let stored = h.stored("T4").unwrap();
    assert_eq!(stored.businesses.len(), 1);
    assert!(stored.licence("B").is_none());
}

#[tokio::test]
async fn missing_main_guid_is_synthesized() {
    let h = Harness::new();
    let future = date(2025, 1, 1);
    h.registry.set_registration(
        "T5",
        registration("T5", "Guidless", vec![business("AA/12-3", Some(future))]),
    );
    let mut d = detail("AA/12-3", Some(future));
    d.main_guid = None;
    d.trade_name = None;
    h.registry.set_detail("AA/12-3", d);

    h.engine.reconcile("T5").await.unwrap();

    let stored = h.stored("T5").unwrap();
    let lic = &stored.businesses[0];
    assert!(lic.main_guid.starts_with("GUID_AA_12_3_"), "{}", lic.main_guid);
    assert_eq!(lic.trade_name.as_deref(), Some("N/A"));
    assert_eq!(
        h.observer.count(|e| matches!(e, ReconcileEvent::GuidSynthesized { .. })),
        1
    );
}

#[tokio::test]
async fn blank_licence_numbers_are_skipped() {
    let h = Harness::new();
    let future = date(2025, 1, 1);
    let mut blank = business("X", None);
    blank.licence_number = Some("   ".to_string());
    h.registry.set_registration(
        "T6",
        registration("T6", "Skipper", vec![blank, business("A", Some(future))]),
    );
    h.registry.set_detail("A", detail("A", Some(future)));

    let s = h.engine.reconcile("T6").await.unwrap();

    assert_eq!(s.message, MSG_CREATED);
    assert_eq!(h.registry.detail_calls(), vec!["A".to_string()]);
    assert_eq!(
        h.observer.count(|e| matches!(e, ReconcileEvent::LicenceSkipped { .. })),
        1
    );
}

#[tokio::test]
async fn registry_without_record_is_not_found() {
    let h = Harness::new();
    let err = h.engine.reconcile("UNKNOWN").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::NotFound);
    assert!(err.message.contains("UNKNOWN"));
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn registration_missing_required_fields_is_validation() {
    let h = Harness::new();
    let mut info = registration("T7", "Nameless", vec![]);
    info.business_name = None;
    info.reg_no = None;
    h.registry.set_registration("T7", info);

    let err = h.engine.reconcile("T7").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Validation);
    assert!(err.message.contains("BusinessName, RegNo"));
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn no_businesses_creates_empty_company_not_renewable() {
    let h = Harness::new();
    h.registry
        .set_registration("T8", registration("T8", "Shell Co", vec![]));

    let s = h.engine.reconcile("T8").await.unwrap();
    assert!(!s.renewable);
    assert_eq!(s.latest_renewed_to, None);
    assert!(h.stored("T8").unwrap().businesses.is_empty());
}

#[tokio::test]
async fn blank_tin_is_rejected_before_any_call() {
    let h = Harness::new();
    let err = h.engine.reconcile("   ").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Validation);
    assert_eq!(h.registry.total_calls(), 0);
}
