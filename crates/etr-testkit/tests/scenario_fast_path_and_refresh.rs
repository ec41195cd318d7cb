//! Scenario: stored companies.
//!
//! Fully renewal-confirmed companies are answered locally. Anything else is
//! refreshed from the registry with one registration lookup and one detail
//! lookup per license, merging in place and never dropping licenses.

use etr_reconcile::{
    FailureKind, SyncBranch, Tin, MSG_FAST_PATH, MSG_REFRESHED, MSG_REFRESHED_STALE,
};
use etr_registry::RegistryError;
use etr_schemas::LicenseDetail;
use etr_testkit::{business, company, date, detail, licence, registration, Harness};

fn tin(s: &str) -> Tin {
    Tin::parse(s).unwrap()
}

#[tokio::test]
async fn renewal_confirmed_company_makes_no_remote_calls() {
    let h = Harness::new();
    let latest = date(2026, 3, 1);
    h.store
        .insert(company(
            tin("F1"),
            vec![
                licence("A", Some(date(2025, 1, 1))),
                licence("B", Some(latest)),
                licence("C", Some(date(2024, 6, 2))),
            ],
        ))
        .unwrap();

    let s = h.engine.reconcile("F1").await.unwrap();

    assert_eq!(s.branch, SyncBranch::FastPath);
    assert_eq!(s.message, MSG_FAST_PATH);
    assert!(s.renewable);
    assert_eq!(s.latest_renewed_to, Some(latest));
    assert_eq!(h.registry.total_calls(), 0);
}

#[tokio::test]
async fn renewed_to_today_is_not_confirmed() {
    let h = Harness::new();
    h.store
        .insert(company(tin("F2"), vec![licence("A", Some(etr_testkit::today()))]))
        .unwrap();
    h.registry.set_registration("F2", registration("F2", "Edge Co", vec![]));

    let s = h.engine.reconcile("F2").await.unwrap();
    assert_eq!(s.branch, SyncBranch::Refreshed);
    assert_eq!(h.registry.registration_calls().len(), 1);
}

#[tokio::test]
async fn refresh_does_one_registration_and_one_detail_per_licence() {
    let h = Harness::new();
    let future = date(2025, 5, 5);
    h.store
        .insert(company(
            tin("R1"),
            vec![licence("A", Some(date(2023, 1, 1))), licence("B", None)],
        ))
        .unwrap();
    h.registry.set_registration(
        "R1",
        registration(
            "R1",
            "Refreshed Co",
            vec![
                business("A", None),
                business("B", None),
                business("C", None),
            ],
        ),
    );
    for no in ["A", "B", "C"] {
        h.registry.set_detail(no, detail(no, Some(future)));
    }

    let s = h.engine.reconcile("R1").await.unwrap();

    assert_eq!(s.branch, SyncBranch::Refreshed);
    assert_eq!(s.message, MSG_REFRESHED);
    assert!(s.renewable);
    assert_eq!(h.registry.registration_calls(), vec!["R1".to_string()]);
    assert_eq!(
        h.registry.detail_calls(),
        vec!["A".to_string(), "B".to_string(), "C".to_string()]
    );

    let stored = h.stored("R1").unwrap();
    assert_eq!(stored.businesses.len(), 3);
    // Updated in place: identity kept, order kept, new license appended.
    assert_eq!(stored.businesses[0].licence_number, "A");
    assert_eq!(stored.businesses[0].main_guid, "stored-A");
    assert_eq!(stored.businesses[0].renewed_to, Some(future));
    assert_eq!(stored.businesses[2].licence_number, "C");
    assert_eq!(stored.businesses[2].main_guid, "detail-C");
    assert_eq!(stored.business_name.as_deref(), Some("Refreshed Co"));
}

#[tokio::test]
async fn refresh_never_removes_local_licences() {
    let h = Harness::new();
    h.store
        .insert(company(
            tin("R2"),
            vec![licence("GONE", Some(date(2020, 1, 1))), licence("A", None)],
        ))
        .unwrap();
    h.registry.set_registration(
        "R2",
        registration("R2", "Shrinking Co", vec![business("A", None)]),
    );
    h.registry.set_detail("A", detail("A", Some(date(2025, 1, 1))));

    let s = h.engine.reconcile("R2").await.unwrap();

    let stored = h.stored("R2").unwrap();
    assert!(stored.licence("GONE").is_some());
    assert_eq!(stored.businesses.len(), 2);
    // The absent license is still expired.
    assert!(!s.renewable);
    assert_eq!(s.message, MSG_REFRESHED_STALE);
}

#[tokio::test]
async fn refresh_failures_fall_back_or_skip_and_still_persist() {
    let h = Harness::new();
    let basic_future = date(2025, 2, 2);
    h.store
        .insert(company(
            tin("R3"),
            vec![licence("A", None), licence("B", Some(date(2022, 1, 1)))],
        ))
        .unwrap();
    h.registry.set_registration(
        "R3",
        registration(
            "R3",
            "Flaky Co",
            vec![
                business("A", Some(basic_future)),
                business("B", Some(basic_future)),
            ],
        ),
    );
    h.registry
        .fail_detail("A", RegistryError::Unavailable("timeout".to_string()));
    h.registry.set_detail("B", LicenseDetail::default());

    let s = h.engine.reconcile("R3").await.unwrap();

    assert_eq!(s.degraded_licences, vec!["A".to_string()]);
    assert_eq!(s.failed_licences, vec!["B".to_string()]);

    let stored = h.stored("R3").unwrap();
    let a = stored.licence("A").unwrap();
    assert_eq!(a.renewed_to, Some(basic_future));
    assert_eq!(a.main_guid, "basic-A");
    // Validation failure leaves the stored license untouched.
    assert_eq!(stored.licence("B").unwrap().renewed_to, Some(date(2022, 1, 1)));
    assert!(!s.renewable);
}

#[tokio::test]
async fn zero_licence_company_is_refreshed() {
    let h = Harness::new();
    h.store.insert(company(tin("R4"), vec![])).unwrap();
    h.registry.set_registration(
        "R4",
        registration("R4", "Late Co", vec![business("A", None)]),
    );
    h.registry.set_detail("A", detail("A", Some(date(2025, 1, 1))));

    let s = h.engine.reconcile("R4").await.unwrap();
    assert_eq!(s.branch, SyncBranch::Refreshed);
    assert!(s.renewable);
    assert_eq!(h.stored("R4").unwrap().businesses.len(), 1);
}

#[tokio::test]
async fn refresh_without_registry_record_fails_and_keeps_store() {
    let h = Harness::new();
    let before = company(tin("R5"), vec![licence("A", None)]);
    h.store.insert(before.clone()).unwrap();

    let err = h.engine.reconcile("R5").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::NotFound);
    assert_eq!(h.stored("R5"), Some(before));
}

#[tokio::test]
async fn refresh_with_registry_down_is_upstream_unavailable() {
    let h = Harness::new();
    h.store.insert(company(tin("R6"), vec![licence("A", None)])).unwrap();
    h.registry
        .fail_registration("R6", RegistryError::Unavailable("http status 503".to_string()));

    let err = h.engine.reconcile("R6").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::UpstreamUnavailable);
}

#[tokio::test]
async fn refresh_rejects_registration_missing_header_fields() {
    let h = Harness::new();
    let before = company(tin("R5"), vec![licence("A", Some(date(2023, 1, 1)))]);
    h.store.insert(before.clone()).unwrap();

    let mut info = registration("R5", "ignored", vec![business("A", None)]);
    info.business_name = None;
    info.reg_no = None;
    h.registry.set_registration("R5", info);
    h.registry.set_detail("A", detail("A", Some(date(2026, 1, 1))));

    let err = h.engine.reconcile("R5").await.unwrap_err();

    assert_eq!(err.kind, FailureKind::Validation);
    assert!(err.message.contains("R5"));
    assert!(err.message.contains("BusinessName"));
    assert!(err.message.contains("RegNo"));
    assert_eq!(h.stored("R5").unwrap(), before);
    assert!(h.registry.detail_calls().is_empty());
}

#[tokio::test]
async fn refresh_updates_in_place_when_registry_echoes_another_spelling() {
    let h = Harness::new();
    let renewed = date(2026, 1, 1);
    h.store
        .insert(company(tin("R6"), vec![licence("LIC-1", Some(date(2023, 1, 1)))]))
        .unwrap();
    h.registry.set_registration(
        "R6",
        registration("R6", "Echo Co", vec![business("LIC-1", None)]),
    );
    h.registry.set_detail("LIC-1", detail("lic-1", Some(renewed)));

    let s = h.engine.reconcile("R6").await.unwrap();

    let stored = h.stored("R6").unwrap();
    assert_eq!(stored.businesses.len(), 1);
    let lic = stored.licence("LIC-1").unwrap();
    assert_eq!(lic.renewed_to, Some(renewed));
    assert_eq!(lic.main_guid, "stored-LIC-1");
    assert!(s.renewable);
    assert_eq!(s.message, MSG_REFRESHED);
}
