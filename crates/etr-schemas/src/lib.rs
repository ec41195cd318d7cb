//! Wire shapes of the government business registry.
//!
//! Field names follow the registry's PascalCase JSON (including its
//! `LegalCondtion` and `OwnerTIN` spellings). Dates stay as the raw strings
//! the registry sends; normalization happens in `etr-reconcile`.
//! Lists that the registry sends as `null` decode as empty.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

fn null_as_empty<'de, D, T>(de: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(de)?.unwrap_or_default())
}

/// Registration lookup by TIN.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegistrationInfo {
    #[serde(default)]
    pub tin: Option<String>,
    #[serde(default, rename = "LegalCondtion")]
    pub legal_condition: Option<String>,
    #[serde(default)]
    pub reg_no: Option<String>,
    #[serde(default)]
    pub reg_date: Option<String>,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub business_name_amh: Option<String>,
    #[serde(default)]
    pub paid_up_capital: Option<Decimal>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub associate_short_infos: Vec<AssociateInfo>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub businesses: Vec<BusinessEntry>,
}

impl RegistrationInfo {
    /// Names of required fields that are absent, in registry spelling.
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.business_name.is_none() {
            missing.push("BusinessName");
        }
        if self.reg_no.is_none() {
            missing.push("RegNo");
        }
        missing
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AssociateInfo {
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub manager_name: Option<String>,
    #[serde(default)]
    pub manager_name_eng: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub mobile_phone: Option<String>,
    #[serde(default)]
    pub regular_phone: Option<String>,
}

/// Basic per-license entry embedded in [`RegistrationInfo::businesses`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BusinessEntry {
    #[serde(default)]
    pub main_guid: Option<String>,
    #[serde(default, rename = "OwnerTIN")]
    pub owner_tin: Option<String>,
    #[serde(default)]
    pub date_registered: Option<String>,
    #[serde(default)]
    pub trade_name_amh: Option<String>,
    #[serde(default)]
    pub trades_name: Option<String>,
    #[serde(default)]
    pub licence_number: Option<String>,
    #[serde(default)]
    pub renewal_date: Option<String>,
    #[serde(default)]
    pub renewed_from: Option<String>,
    #[serde(default)]
    pub renewed_to: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sub_groups: Vec<SubGroupEntry>,
}

impl BusinessEntry {
    /// Trimmed license number, `None` when absent or blank.
    pub fn licence_no(&self) -> Option<&str> {
        self.licence_number
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubGroupEntry {
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Detail lookup by license number + TIN + language.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LicenseDetail {
    #[serde(default)]
    pub main_guid: Option<String>,
    #[serde(default, rename = "OwnerTIN")]
    pub owner_tin: Option<String>,
    #[serde(default)]
    pub date_registered: Option<String>,
    #[serde(default)]
    pub trade_name: Option<String>,
    #[serde(default)]
    pub licence_number: Option<String>,
    #[serde(default)]
    pub status: Option<i32>,
    #[serde(default)]
    pub capital: Option<Decimal>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub associate_short_infos: Vec<AssociateInfo>,
    #[serde(default)]
    pub address_info: Option<AddressInfo>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub business_licensing_group_main: Vec<LicensingGroup>,
    #[serde(default)]
    pub renewed_to: Option<String>,
    #[serde(default)]
    pub renewed_to_date_string: Option<String>,
    #[serde(default)]
    pub renewal_date: Option<String>,
    #[serde(default)]
    pub renewed_from: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sub_groups: Vec<SubGroupEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddressInfo {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub woreda: Option<String>,
    #[serde(default)]
    pub kebele: Option<String>,
    #[serde(default)]
    pub house_no: Option<String>,
    #[serde(default)]
    pub mobile_phone: Option<String>,
    #[serde(default)]
    pub regular_phone: Option<String>,
}

/// One row of the detail payload's licensing classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LicensingGroup {
    #[serde(default)]
    pub main_guid: Option<String>,
    #[serde(default)]
    pub business_main_guid: Option<String>,
    #[serde(default)]
    pub major_division: Option<i32>,
    #[serde(default)]
    pub division: Option<i32>,
    #[serde(default)]
    pub major_group: Option<i32>,
    #[serde(default, rename = "BGroup")]
    pub b_group: Option<i32>,
    #[serde(default)]
    pub sub_group: Option<i32>,
    #[serde(default)]
    pub tinc: Option<String>,
}
