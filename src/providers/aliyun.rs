// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Alibaba Cloud DNS adapter.
//!
//! Talks to the Alidns RPC API (version `2015-01-09`). Every call is a `POST`
//! with all parameters in a sorted, RFC 3986 encoded query string and an
//! empty body, signed with ACS3-HMAC-SHA256:
//!
//! ```text
//! CanonicalRequest = POST \n / \n <query> \n <canonical headers> \n <signed headers> \n sha256("")
//! StringToSign     = "ACS3-HMAC-SHA256" \n hex(sha256(CanonicalRequest))
//! Authorization    = ACS3-HMAC-SHA256 Credential=<id>,SignedHeaders=<..>,Signature=hex(hmac(secret, StringToSign))
//! ```
//!
//! Records are addressed by their RR (the name relative to the provider's
//! domain), so `app.example.com` on provider `example.com` is RR `app`.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error};
use url::Url;

use super::{DnsProvider, ProviderFactory};
use crate::constants::DEFAULT_DNS_RECORD_TTL_SECS;
use crate::crd::{DNSProviderSpec, DNSRecord};
use crate::dns_errors::ProviderError;

/// Public Alidns endpoint
pub const ALIYUN_DNS_ENDPOINT: &str = "https://alidns.cn-hangzhou.aliyuncs.com";

/// Alidns API version
pub const ALIYUN_DNS_VERSION: &str = "2015-01-09";

const SIGNATURE_ALGORITHM: &str = "ACS3-HMAC-SHA256";

/// SHA-256 of the empty request body
const EMPTY_BODY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

const SIGNED_HEADERS: &str =
    "host;x-acs-action;x-acs-content-sha256;x-acs-date;x-acs-signature-nonce;x-acs-version";

/// Largest page `DescribeDomainRecords` returns
const MAX_PAGE_SIZE: &str = "500";

const PROVIDER: &str = "ALIYUN";

type HmacSha256 = Hmac<Sha256>;

/// Builds [`AliyunProvider`]s.
pub struct AliyunFactory {
    http: reqwest::Client,
    endpoint: String,
}

impl AliyunFactory {
    /// Factory against the public Alidns endpoint.
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_endpoint(http, ALIYUN_DNS_ENDPOINT)
    }

    /// Factory against another endpoint (tests, private regions).
    #[must_use]
    pub fn with_endpoint(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ProviderFactory for AliyunFactory {
    async fn build(&self, spec: &DNSProviderSpec) -> Result<Arc<dyn DnsProvider>> {
        let config = spec
            .aliyun
            .as_ref()
            .filter(|c| !c.access_key_id.is_empty() && !c.access_key_secret.is_empty())
            .ok_or_else(|| ProviderError::MissingCredentials {
                provider: PROVIDER.to_string(),
                reason: "aliyun accessKeyId and accessKeySecret are required".to_string(),
            })?;

        let provider = AliyunProvider::new(
            self.http.clone(),
            &self.endpoint,
            &config.access_key_id,
            &config.access_key_secret,
            &spec.domain_name,
        )?;
        provider
            .describe_domain()
            .await
            .with_context(|| format!("aliyun rejected domain {}", spec.domain_name))?;

        Ok(Arc::new(provider))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AliyunRecord {
    record_id: String,
    #[serde(rename = "RR")]
    rr: String,
    #[serde(rename = "Type")]
    record_type: String,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeDomainRecordsResponse {
    #[serde(default)]
    domain_records: DomainRecords,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DomainRecords {
    #[serde(default)]
    record: Vec<AliyunRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecordIdResponse {
    record_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeDomainInfoResponse {
    domain_name: String,
}

/// Alidns adapter bound to one domain.
pub struct AliyunProvider {
    http: reqwest::Client,
    endpoint: String,
    host: String,
    access_key_id: String,
    access_key_secret: String,
    domain_name: String,
}

impl AliyunProvider {
    /// Adapter for `domain_name` using the given `AccessKey` pair.
    ///
    /// # Errors
    ///
    /// Returns an error when `endpoint` is not an absolute URL with a host.
    pub fn new(
        http: reqwest::Client,
        endpoint: &str,
        access_key_id: &str,
        access_key_secret: &str,
        domain_name: &str,
    ) -> Result<Self> {
        let url = Url::parse(endpoint).with_context(|| format!("invalid endpoint {endpoint}"))?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => anyhow::bail!("endpoint {endpoint} has no host"),
        };

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            host,
            access_key_id: access_key_id.to_string(),
            access_key_secret: access_key_secret.to_string(),
            domain_name: domain_name.to_string(),
        })
    }

    /// `Authorization` header value for one request.
    pub(crate) fn sign(
        &self,
        action: &str,
        query: &str,
        timestamp: &str,
        nonce: &str,
    ) -> Result<String> {
        let canonical_headers = format!(
            "host:{}\nx-acs-action:{action}\nx-acs-content-sha256:{EMPTY_BODY_SHA256}\nx-acs-date:{timestamp}\nx-acs-signature-nonce:{nonce}\nx-acs-version:{ALIYUN_DNS_VERSION}\n",
            self.host
        );
        let canonical_request = format!(
            "POST\n/\n{query}\n{canonical_headers}\n{SIGNED_HEADERS}\n{EMPTY_BODY_SHA256}"
        );
        let hashed_request = hex::encode(Sha256::digest(canonical_request.as_bytes()));
        let string_to_sign = format!("{SIGNATURE_ALGORITHM}\n{hashed_request}");

        let mut mac = HmacSha256::new_from_slice(self.access_key_secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("invalid aliyun secret: {e}"))?;
        mac.update(string_to_sign.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(format!(
            "{SIGNATURE_ALGORITHM} Credential={},SignedHeaders={SIGNED_HEADERS},Signature={signature}",
            self.access_key_id
        ))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        action: &str,
        params: &BTreeMap<&str, String>,
    ) -> Result<T> {
        let query = canonical_query(params);
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let nonce = uuid::Uuid::new_v4().to_string();
        let authorization = self.sign(action, &query, &timestamp, &nonce)?;

        let url = if query.is_empty() {
            format!("{}/", self.endpoint)
        } else {
            format!("{}/?{query}", self.endpoint)
        };

        debug!(action, domain = %self.domain_name, "Calling aliyun DNS API");
        let response = self
            .http
            .post(&url)
            .header("host", &self.host)
            .header("x-acs-action", action)
            .header("x-acs-version", ALIYUN_DNS_VERSION)
            .header("x-acs-date", &timestamp)
            .header("x-acs-signature-nonce", &nonce)
            .header("x-acs-content-sha256", EMPTY_BODY_SHA256)
            .header("authorization", authorization)
            .send()
            .await
            .with_context(|| format!("aliyun {action} request failed"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("failed to read aliyun {action} response"))?;
        let value: serde_json::Value = serde_json::from_str(&body).map_err(|_| {
            ProviderError::Api {
                provider: PROVIDER.to_string(),
                code: status.as_u16().to_string(),
                message: body.clone(),
            }
        })?;

        if let (Some(code), Some(message)) = (
            value.get("Code").and_then(serde_json::Value::as_str),
            value.get("Message").and_then(serde_json::Value::as_str),
        ) {
            error!(action, code, message, "Aliyun DNS API error");
            return Err(ProviderError::Api {
                provider: PROVIDER.to_string(),
                code: code.to_string(),
                message: message.to_string(),
            }
            .into());
        }
        if !status.is_success() {
            return Err(ProviderError::Api {
                provider: PROVIDER.to_string(),
                code: status.as_u16().to_string(),
                message: body,
            }
            .into());
        }

        serde_json::from_value(value)
            .with_context(|| format!("unexpected aliyun {action} response"))
    }

    async fn describe_domain(&self) -> Result<String> {
        let params = BTreeMap::from([("DomainName", self.domain_name.clone())]);
        let info: DescribeDomainInfoResponse = self.call("DescribeDomainInfo", &params).await?;
        Ok(info.domain_name)
    }

    async fn record_by_id(&self, id: &str) -> Result<AliyunRecord> {
        let params = BTreeMap::from([("RecordId", id.to_string())]);
        self.call("DescribeDomainRecordInfo", &params).await
    }

    /// Any record type counts: `update` rewrites the type of a match.
    async fn record_by_rr(&self, rr: &str) -> Result<Option<AliyunRecord>> {
        let params = BTreeMap::from([
            ("DomainName", self.domain_name.clone()),
            ("RRKeyWord", rr.to_string()),
            ("PageSize", MAX_PAGE_SIZE.to_string()),
        ]);
        let response: DescribeDomainRecordsResponse =
            self.call("DescribeDomainRecords", &params).await?;

        // Keyword search is fuzzy: "app" also returns "app2" and "api.app".
        Ok(response
            .domain_records
            .record
            .into_iter()
            .find(|r| r.rr == rr))
    }

    fn record_params(&self, record: &DNSRecord) -> BTreeMap<&'static str, String> {
        let ttl = record.spec.ttl.unwrap_or(DEFAULT_DNS_RECORD_TTL_SECS);
        BTreeMap::from([
            ("RR", record.spec.relative_name(&self.domain_name)),
            ("Type", record.spec.record_type.as_str().to_string()),
            ("Value", record.spec.value.clone()),
            ("TTL", ttl.to_string()),
        ])
    }
}

#[async_trait]
impl DnsProvider for AliyunProvider {
    async fn search(&self, record: &DNSRecord) -> Result<Option<String>> {
        let remembered = record
            .status
            .as_ref()
            .and_then(|s| s.record_id.as_deref())
            .filter(|id| !id.is_empty());
        if let Some(id) = remembered {
            match self.record_by_id(id).await {
                Ok(found) => return Ok(Some(found.record_id)),
                Err(e) => debug!(record_id = id, error = %e, "Remembered aliyun record id not found"),
            }
        }

        let rr = record.spec.relative_name(&self.domain_name);
        let found = self.record_by_rr(&rr).await?;
        Ok(found.map(|r| r.record_id))
    }

    async fn create(&self, record: &DNSRecord) -> Result<String> {
        let mut params = self.record_params(record);
        params.insert("DomainName", self.domain_name.clone());
        let created: RecordIdResponse = self.call("AddDomainRecord", &params).await?;
        Ok(created.record_id)
    }

    async fn update(&self, record: &DNSRecord, id: &str) -> Result<()> {
        let current = self.record_by_id(id).await?;
        let rr = record.spec.relative_name(&self.domain_name);
        if current.rr == rr
            && current.record_type == record.spec.record_type.as_str()
            && current.value == record.spec.value
        {
            debug!(record_id = id, rr = %rr, "Aliyun record already up to date");
            return Ok(());
        }

        let mut params = self.record_params(record);
        params.insert("RecordId", id.to_string());
        let _: RecordIdResponse = self.call("UpdateDomainRecord", &params).await?;
        Ok(())
    }

    async fn delete(&self, _record: &DNSRecord, id: &str) -> Result<()> {
        let params = BTreeMap::from([("RecordId", id.to_string())]);
        let _: RecordIdResponse = self.call("DeleteDomainRecord", &params).await?;
        Ok(())
    }
}

/// Sorted `key=value&...` with RFC 3986 percent-encoding.
pub(crate) fn canonical_query(params: &BTreeMap<&str, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
#[path = "aliyun_tests.rs"]
mod aliyun_tests;
