//! Registry payload -> aggregate mapping.
//!
//! Creation and update share one set of rules: dates go through
//! [`crate::dates`], sub-groups are replaced wholesale, and a detail payload
//! is checked and repaired by [`verify_detail`] before it touches a license.

use etr_schemas::{
    AddressInfo, AssociateInfo, BusinessEntry, LicenseDetail, LicensingGroup, RegistrationInfo,
    SubGroupEntry,
};
use rust_decimal::Decimal;

use crate::dates::parse_opt;
use crate::error::LicenceError;
use crate::model::{Address, Associate, Company, License, SubGroup};

/// Trade name used when the detail payload carries none.
pub const TRADE_NAME_PLACEHOLDER: &str = "N/A";

/// Status code given to licenses built from basic registration info.
pub const BASIC_INFO_STATUS: i32 = 1;

/// `GUID_<licence no, non-alphanumerics as '_'>_<millis>`.
pub fn synthesize_guid(licence_no: &str, now_millis: i64) -> String {
    let safe: String = licence_no
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("GUID_{safe}_{now_millis}")
}

/// A detail payload that passed validation, with its gaps filled.
#[derive(Clone, Debug)]
pub struct VerifiedDetail {
    pub detail: LicenseDetail,
    pub licence_number: String,
    pub main_guid: String,
    /// Set when `main_guid` was synthesized rather than sent.
    pub guid_synthesized: bool,
}

/// Check a detail payload fetched for `requested_licence_no`.
///
/// A missing license number is fatal for this license; a present one is
/// replaced by the requested number. A missing main GUID is
/// synthesized from the requested number; a missing trade name becomes
/// [`TRADE_NAME_PLACEHOLDER`].
pub(crate) fn verify_detail(
    mut detail: LicenseDetail,
    requested_licence_no: &str,
    now_millis: i64,
) -> Result<VerifiedDetail, LicenceError> {
    if detail
        .licence_number
        .as_deref()
        .map_or(true, |n| n.trim().is_empty())
    {
        return Err(LicenceError::Validation(format!(
            "missing required fields (LicenceNumber) for license: {requested_licence_no}"
        )));
    }
    // The license stays keyed on the number it was requested under, whatever
    // spelling the registry echoes back.
    let licence_number = requested_licence_no.trim().to_string();

    let (main_guid, guid_synthesized) = match detail.main_guid.as_deref() {
        Some(g) if !g.trim().is_empty() => (g.to_string(), false),
        _ => (synthesize_guid(requested_licence_no, now_millis), true),
    };
    detail.main_guid = Some(main_guid.clone());

    if detail.trade_name.is_none() {
        detail.trade_name = Some(TRADE_NAME_PLACEHOLDER.to_string());
    }

    Ok(VerifiedDetail {
        detail,
        licence_number,
        main_guid,
        guid_synthesized,
    })
}

fn detail_renewed_to(d: &LicenseDetail) -> Option<chrono::NaiveDate> {
    parse_opt(d.renewed_to.as_deref()).or_else(|| parse_opt(d.renewed_to_date_string.as_deref()))
}

pub fn licence_from_detail(v: &VerifiedDetail) -> License {
    let d = &v.detail;
    License {
        main_guid: v.main_guid.clone(),
        licence_number: v.licence_number.clone(),
        trade_name: d.trade_name.clone(),
        trade_name_amh: d.trade_name.clone(),
        date_registered: parse_opt(d.date_registered.as_deref()),
        renewal_date: parse_opt(d.renewal_date.as_deref()),
        renewed_from: parse_opt(d.renewed_from.as_deref()),
        renewed_to: detail_renewed_to(d),
        status: d.status,
        capital: d.capital,
        address: address_from(d.address_info.as_ref()),
        sub_groups: sub_groups_from_detail(d),
    }
}

/// Build from the basic registration entry. Returns `None` when the entry has
/// no usable license number.
pub fn licence_from_basic(entry: &BusinessEntry, now_millis: i64) -> Option<License> {
    let licence_no = entry.licence_no()?;
    Some(License {
        main_guid: entry
            .main_guid
            .clone()
            .filter(|g| !g.trim().is_empty())
            .unwrap_or_else(|| synthesize_guid(licence_no, now_millis)),
        licence_number: licence_no.to_string(),
        trade_name: entry.trades_name.clone(),
        trade_name_amh: entry.trade_name_amh.clone(),
        date_registered: parse_opt(entry.date_registered.as_deref()),
        renewal_date: parse_opt(entry.renewal_date.as_deref()),
        renewed_from: parse_opt(entry.renewed_from.as_deref()),
        renewed_to: parse_opt(entry.renewed_to.as_deref()),
        status: Some(BASIC_INFO_STATUS),
        capital: Some(Decimal::ZERO),
        address: Address::default(),
        sub_groups: simple_sub_groups(&entry.sub_groups),
    })
}

/// Merge a verified detail into an existing license. Identity
/// (`main_guid`, `licence_number`) is kept.
pub fn update_from_detail(lic: &mut License, v: &VerifiedDetail) {
    let d = &v.detail;
    lic.trade_name = d.trade_name.clone();
    lic.trade_name_amh = d.trade_name.clone();
    lic.date_registered = parse_opt(d.date_registered.as_deref());
    lic.renewal_date = parse_opt(d.renewal_date.as_deref());
    lic.renewed_from = parse_opt(d.renewed_from.as_deref());
    lic.renewed_to = detail_renewed_to(d);
    lic.status = d.status;
    lic.capital = d.capital;
    lic.address = address_from(d.address_info.as_ref());
    lic.sub_groups = sub_groups_from_detail(d);
}

/// Merge the basic registration entry into an existing license. Address,
/// status and capital are not part of the basic entry and stay as they are.
pub fn update_from_basic(lic: &mut License, entry: &BusinessEntry) {
    if let Some(g) = entry.main_guid.as_deref().filter(|g| !g.trim().is_empty()) {
        lic.main_guid = g.to_string();
    }
    lic.trade_name = entry.trades_name.clone();
    lic.trade_name_amh = entry.trade_name_amh.clone();
    lic.date_registered = parse_opt(entry.date_registered.as_deref());
    lic.renewal_date = parse_opt(entry.renewal_date.as_deref());
    lic.renewed_from = parse_opt(entry.renewed_from.as_deref());
    lic.renewed_to = parse_opt(entry.renewed_to.as_deref());
    lic.sub_groups = simple_sub_groups(&entry.sub_groups);
}

fn address_from(info: Option<&AddressInfo>) -> Address {
    match info {
        None => Address::default(),
        Some(a) => Address {
            region: a.region.clone(),
            zone: a.zone.clone(),
            woreda: a.woreda.clone(),
            kebele: a.kebele.clone(),
            house_no: a.house_no.clone(),
            mobile_phone: a.mobile_phone.clone(),
            regular_phone: a.regular_phone.clone(),
        },
    }
}

/// Licensing groups win over the simple list; neither means no sub-groups.
fn sub_groups_from_detail(d: &LicenseDetail) -> Vec<SubGroup> {
    if !d.business_licensing_group_main.is_empty() {
        d.business_licensing_group_main
            .iter()
            .map(sub_group_from_licensing)
            .collect()
    } else {
        simple_sub_groups(&d.sub_groups)
    }
}

fn simple_sub_groups(entries: &[SubGroupEntry]) -> Vec<SubGroup> {
    entries
        .iter()
        .map(|s| SubGroup {
            code: s.code,
            description: s.description.clone(),
        })
        .collect()
}

fn sub_group_from_licensing(g: &LicensingGroup) -> SubGroup {
    SubGroup {
        code: g.sub_group,
        description: Some(group_description(g)),
    }
}

/// `(<sub>) Division <majorDivision>/<division> - Group <majorGroup>/<bGroup>/<sub>`
pub fn group_description(g: &LicensingGroup) -> String {
    fn code(v: Option<i32>) -> String {
        v.map_or_else(|| "-".to_string(), |n| n.to_string())
    }
    format!(
        "({sub}) Division {md}/{div} - Group {mg}/{bg}/{sub}",
        sub = code(g.sub_group),
        md = code(g.major_division),
        div = code(g.division),
        mg = code(g.major_group),
        bg = code(g.b_group),
    )
}

fn associate_from(a: &AssociateInfo) -> Associate {
    Associate {
        position: a.position.clone(),
        manager_name: a.manager_name.clone(),
        manager_name_eng: a.manager_name_eng.clone(),
        photo: a.photo.clone(),
        mobile_phone: a.mobile_phone.clone(),
        regular_phone: a.regular_phone.clone(),
    }
}

/// Copy header fields and replace associates. Licenses are untouched.
pub fn apply_registration(company: &mut Company, info: &RegistrationInfo) {
    company.legal_condition = info.legal_condition.clone();
    company.reg_no = info.reg_no.clone();
    company.reg_date = parse_opt(info.reg_date.as_deref());
    company.business_name = info.business_name.clone();
    company.business_name_amh = info.business_name_amh.clone();
    company.paid_up_capital = info.paid_up_capital;
    company.associates = info.associate_short_infos.iter().map(associate_from).collect();
}
