use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ReconciliationError;

/// Taxpayer identification number. Trimmed and non-empty by construction.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tin(String);

impl Tin {
    pub fn parse(raw: &str) -> Result<Self, ReconciliationError> {
        let t = raw.trim();
        if t.is_empty() {
            return Err(ReconciliationError::validation("TIN cannot be empty"));
        }
        Ok(Self(t.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Tin {
    type Error = ReconciliationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Tin::parse(&s)
    }
}

impl From<Tin> for String {
    fn from(t: Tin) -> Self {
        t.0
    }
}

impl fmt::Display for Tin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Aggregate root: one company and everything it owns, keyed by TIN.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub tin: Tin,
    pub legal_condition: Option<String>,
    pub reg_no: Option<String>,
    pub reg_date: Option<NaiveDate>,
    pub business_name: Option<String>,
    pub business_name_amh: Option<String>,
    pub paid_up_capital: Option<Decimal>,
    pub associates: Vec<Associate>,
    pub businesses: Vec<License>,
}

impl Company {
    pub fn new(tin: Tin) -> Self {
        Self {
            tin,
            legal_condition: None,
            reg_no: None,
            reg_date: None,
            business_name: None,
            business_name_amh: None,
            paid_up_capital: None,
            associates: Vec::new(),
            businesses: Vec::new(),
        }
    }

    pub fn licence(&self, licence_no: &str) -> Option<&License> {
        self.businesses
            .iter()
            .find(|b| b.licence_number == licence_no)
    }

    pub fn licence_mut(&mut self, licence_no: &str) -> Option<&mut License> {
        self.businesses
            .iter_mut()
            .find(|b| b.licence_number == licence_no)
    }

    /// True when there are no licenses or any license is not renewal-confirmed.
    pub fn needs_attention(&self, today: NaiveDate) -> bool {
        self.businesses.is_empty()
            || self
                .businesses
                .iter()
                .any(|b| !b.is_renewal_confirmed(today))
    }

    /// Latest `renewed_to` across all licenses, `None` if no license has one.
    pub fn latest_renewed_to(&self) -> Option<NaiveDate> {
        self.businesses.iter().filter_map(|b| b.renewed_to).max()
    }
}

/// One business license. Identity within its company is `licence_number`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub main_guid: String,
    pub licence_number: String,
    pub trade_name: Option<String>,
    pub trade_name_amh: Option<String>,
    pub date_registered: Option<NaiveDate>,
    pub renewal_date: Option<NaiveDate>,
    pub renewed_from: Option<NaiveDate>,
    pub renewed_to: Option<NaiveDate>,
    pub status: Option<i32>,
    pub capital: Option<Decimal>,
    pub address: Address,
    pub sub_groups: Vec<SubGroup>,
}

impl License {
    /// `renewed_to` present and strictly after `today`.
    pub fn is_renewal_confirmed(&self, today: NaiveDate) -> bool {
        self.renewed_to.is_some_and(|d| d > today)
    }

    /// `renewed_to` present and strictly before `today`.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.renewed_to.is_some_and(|d| d < today)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub region: Option<String>,
    pub zone: Option<String>,
    pub woreda: Option<String>,
    pub kebele: Option<String>,
    pub house_no: Option<String>,
    pub mobile_phone: Option<String>,
    pub regular_phone: Option<String>,
}

impl Address {
    pub fn is_empty(&self) -> bool {
        *self == Address::default()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubGroup {
    pub code: Option<i32>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Associate {
    pub position: Option<String>,
    pub manager_name: Option<String>,
    pub manager_name_eng: Option<String>,
    pub photo: Option<String>,
    pub mobile_phone: Option<String>,
    pub regular_phone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn licence(no: &str, renewed_to: Option<NaiveDate>) -> License {
        License {
            main_guid: format!("g-{no}"),
            licence_number: no.to_string(),
            trade_name: None,
            trade_name_amh: None,
            date_registered: None,
            renewal_date: None,
            renewed_from: None,
            renewed_to,
            status: None,
            capital: None,
            address: Address::default(),
            sub_groups: Vec::new(),
        }
    }

    #[test]
    fn tin_is_trimmed_and_non_empty() {
        assert_eq!(Tin::parse("  0012345 ").unwrap().as_str(), "0012345");
        assert!(Tin::parse("   ").is_err());
        assert!(serde_json::from_str::<Tin>("\"\"").is_err());
    }

    #[test]
    fn renewal_confirmed_is_strictly_after_today() {
        let today = d(2026, 10, 18);
        assert!(licence("A", Some(d(2026, 10, 19))).is_renewal_confirmed(today));
        assert!(!licence("A", Some(today)).is_renewal_confirmed(today));
        assert!(!licence("A", None).is_renewal_confirmed(today));
        assert!(licence("A", Some(d(2026, 10, 17))).is_expired(today));
        assert!(!licence("A", None).is_expired(today));
    }

    #[test]
    fn empty_company_needs_attention() {
        let today = d(2026, 10, 18);
        let mut c = Company::new(Tin::parse("1").unwrap());
        assert!(c.needs_attention(today));

        c.businesses.push(licence("A", Some(d(2027, 1, 1))));
        assert!(!c.needs_attention(today));

        c.businesses.push(licence("B", None));
        assert!(c.needs_attention(today));
    }

    #[test]
    fn latest_renewed_to_over_zero_one_and_many() {
        let mut c = Company::new(Tin::parse("1").unwrap());
        assert_eq!(c.latest_renewed_to(), None);

        c.businesses.push(licence("A", Some(d(2021, 3, 1))));
        assert_eq!(c.latest_renewed_to(), Some(d(2021, 3, 1)));

        c.businesses.push(licence("B", None));
        c.businesses.push(licence("C", Some(d(2029, 6, 30))));
        assert_eq!(c.latest_renewed_to(), Some(d(2029, 6, 30)));
    }

    #[test]
    fn licence_lookup_by_number() {
        let mut c = Company::new(Tin::parse("1").unwrap());
        c.businesses.push(licence("A", None));
        assert!(c.licence("A").is_some());
        assert!(c.licence("B").is_none());
        c.licence_mut("A").unwrap().status = Some(3);
        assert_eq!(c.businesses[0].status, Some(3));
    }
}
