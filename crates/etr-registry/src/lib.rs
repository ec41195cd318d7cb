//! etr-registry
//!
//! Read-only access to the government business registry.
//!
//! This crate owns the client abstraction and the HTTP implementation.
//! It does **not** validate or merge payloads; `etr-reconcile` does that.

pub mod client;

pub use client::{RegistryClient, RegistryError};

use std::time::Duration;

use async_trait::async_trait;
use etr_schemas::{LicenseDetail, RegistrationInfo};
use reqwest::header::{ACCEPT, REFERER};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://etrade.gov.et/api";
pub const DEFAULT_REFERER: &str = "https://etrade.gov.et";
pub const DEFAULT_LANG: &str = "en";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// reqwest-backed registry client.
///
/// Every request carries the configured `Referer`; the registry refuses
/// requests without it.
#[derive(Debug, Clone)]
pub struct HttpRegistryClient {
    http: reqwest::Client,
    base_url: String,
    referer: String,
    lang: String,
}

impl HttpRegistryClient {
    pub fn new(
        base_url: impl Into<String>,
        referer: impl Into<String>,
        lang: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RegistryError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RegistryError::Config(format!("http client build failed: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            referer: referer.into(),
            lang: lang.into(),
        })
    }

    pub fn new_with_base_url(base_url: impl Into<String>) -> Result<Self, RegistryError> {
        Self::new(base_url, DEFAULT_REFERER, DEFAULT_LANG, DEFAULT_TIMEOUT)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, RegistryError> {
        let mut url = Url::parse(self.base_url.trim_end_matches('/'))
            .map_err(|e| RegistryError::Config(format!("invalid base url {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| RegistryError::Config(format!("base url cannot carry a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn registration_url(&self, tin: &str) -> Result<Url, RegistryError> {
        self.endpoint(&["Registration", "GetRegistrationInfoByTin", tin, &self.lang])
    }

    fn detail_url(&self, licence_no: &str, tin: &str, lang: &str) -> Result<Url, RegistryError> {
        let mut url = self.endpoint(&["BusinessMain", "GetBusinessByLicenseNo"])?;
        url.query_pairs_mut()
            .append_pair("LicenseNo", licence_no)
            .append_pair("Tin", tin)
            .append_pair("Lang", lang);
        Ok(url)
    }

    /// GET `url` and decode the JSON body.
    ///
    /// 404, 204, an empty body and a literal `null` all mean "no record".
    async fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T, RegistryError> {
        debug!(url = %url, "registry request");

        let resp = self
            .http
            .get(url)
            .header(REFERER, self.referer.as_str())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| RegistryError::Unavailable(format!("{what}: {e}")))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
            return Err(RegistryError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            return Err(RegistryError::Unavailable(format!(
                "{what}: http status {}",
                status.as_u16()
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| RegistryError::Unavailable(format!("{what}: body read failed: {e}")))?;

        let body = body.trim();
        if body.is_empty() || body == "null" {
            return Err(RegistryError::NotFound(what.to_string()));
        }

        serde_json::from_str(body).map_err(|e| RegistryError::Decode(format!("{what}: {e}")))
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    fn source_name(&self) -> &'static str {
        "etrade-http"
    }

    async fn registration_info(&self, tin: &str) -> Result<RegistrationInfo, RegistryError> {
        let url = self.registration_url(tin)?;
        self.get_json(url, &format!("registration tin={tin}")).await
    }

    async fn license_detail(
        &self,
        licence_no: &str,
        tin: &str,
        lang: &str,
    ) -> Result<LicenseDetail, RegistryError> {
        let url = self.detail_url(licence_no, tin, lang)?;
        self.get_json(url, &format!("licence={licence_no} tin={tin}"))
            .await
    }
}

// -----------------
// Tests (no network)
// -----------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_url_appends_tin_and_lang() {
        let c = HttpRegistryClient::new_with_base_url("https://etrade.gov.et/api/").unwrap();
        let url = c.registration_url("0012345").unwrap();
        assert_eq!(
            url.as_str(),
            "https://etrade.gov.et/api/Registration/GetRegistrationInfoByTin/0012345/en"
        );
    }

    #[test]
    fn detail_url_encodes_query() {
        let c = HttpRegistryClient::new_with_base_url("https://etrade.gov.et/api").unwrap();
        let url = c.detail_url("AA/14/1 2", "0012345", "am").unwrap();
        assert_eq!(
            url.as_str(),
            "https://etrade.gov.et/api/BusinessMain/GetBusinessByLicenseNo?LicenseNo=AA%2F14%2F1+2&Tin=0012345&Lang=am"
        );
    }

    #[test]
    fn path_segments_are_escaped() {
        let c = HttpRegistryClient::new_with_base_url("https://etrade.gov.et/api").unwrap();
        let url = c.registration_url("00/12").unwrap();
        assert!(url.as_str().ends_with("/GetRegistrationInfoByTin/00%2F12/en"));
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let c = HttpRegistryClient::new_with_base_url("not a url").unwrap();
        assert!(matches!(
            c.registration_url("1"),
            Err(RegistryError::Config(_))
        ));
    }
}
