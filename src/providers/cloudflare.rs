// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloudflare DNS adapter (REST API v4).
//!
//! The zone is resolved once when the adapter is built. Records are written
//! with their fully qualified name, and the proxy flag comes from the
//! `dnsmanager.firestoned.io/record-proxied` annotation when present, else
//! from the provider's `proxied` default.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};
use url::Url;

use super::{DnsProvider, ProviderFactory};
use crate::constants::DEFAULT_DNS_RECORD_TTL_SECS;
use crate::crd::{CloudflareProviderConfig, DNSProviderSpec, DNSRecord};
use crate::dns_errors::ProviderError;
use crate::labels::ANNOTATION_RECORD_PROXIED;

/// Public Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

const PROVIDER: &str = "CLOUDFLARE";

/// How the adapter authenticates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    /// Scoped API token, sent as a bearer token
    Token(String),
    /// Global API key plus account email
    Key { key: String, email: String },
}

impl Credentials {
    /// Credentials from the provider config; a token wins over key/email.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::MissingCredentials`] when neither form is set.
    pub fn from_config(config: Option<&CloudflareProviderConfig>) -> Result<Self, ProviderError> {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        let config = config.cloned().unwrap_or_default();

        if let Some(token) = non_empty(&config.api_token) {
            return Ok(Self::Token(token));
        }
        match (non_empty(&config.key), non_empty(&config.email)) {
            (Some(key), Some(email)) => Ok(Self::Key { key, email }),
            _ => Err(ProviderError::MissingCredentials {
                provider: PROVIDER.to_string(),
                reason: "cloudflare api token or key and email is required".to_string(),
            }),
        }
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Token(token) => request.bearer_auth(token),
            Self::Key { key, email } => request
                .header("X-Auth-Key", key)
                .header("X-Auth-Email", email),
        }
    }
}

/// Builds [`CloudflareProvider`]s.
pub struct CloudflareFactory {
    http: reqwest::Client,
    base_url: String,
}

impl CloudflareFactory {
    /// Factory against the public API.
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_base_url(http, CLOUDFLARE_API_BASE)
    }

    /// Factory against another base URL (tests).
    #[must_use]
    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ProviderFactory for CloudflareFactory {
    async fn build(&self, spec: &DNSProviderSpec) -> Result<Arc<dyn DnsProvider>> {
        let credentials = Credentials::from_config(spec.cloudflare.as_ref())?;
        let zone_name = spec
            .cloudflare
            .as_ref()
            .and_then(|c| c.zone_name.clone())
            .filter(|z| !z.is_empty())
            .unwrap_or_else(|| spec.domain_name.clone());
        let default_proxied = spec.cloudflare.as_ref().is_some_and(|c| c.proxied);

        let provider = CloudflareProvider::connect(
            self.http.clone(),
            &self.base_url,
            credentials,
            &zone_name,
            default_proxied,
        )
        .await?;
        Ok(Arc::new(provider))
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CloudflareRecord {
    id: String,
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    content: String,
    #[serde(default)]
    proxied: bool,
}

#[derive(Debug, Serialize)]
struct RecordBody<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    content: &'a str,
    ttl: i32,
    proxied: bool,
}

/// Cloudflare adapter bound to one zone.
#[derive(Debug)]
pub struct CloudflareProvider {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    zone_id: String,
    default_proxied: bool,
}

impl CloudflareProvider {
    /// Resolve `zone_name` and return an adapter bound to it.
    ///
    /// # Errors
    ///
    /// Fails when the credentials are rejected or the zone does not exist.
    pub async fn connect(
        http: reqwest::Client,
        base_url: &str,
        credentials: Credentials,
        zone_name: &str,
        default_proxied: bool,
    ) -> Result<Self> {
        let mut provider = Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            zone_id: String::new(),
            default_proxied,
        };

        let zones: Vec<Zone> = provider
            .call(Method::GET, "/zones", &[("name", zone_name)], None)
            .await
            .with_context(|| format!("failed to look up cloudflare zone {zone_name}"))?;
        let zone = zones
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ZoneNotFound {
                provider: PROVIDER.to_string(),
                zone: zone_name.to_string(),
            })?;

        info!(zone = zone_name, zone_id = %zone.id, "Resolved cloudflare zone");
        provider.zone_id = zone.id;
        Ok(provider)
    }

    /// Effective proxy flag for `record`.
    #[must_use]
    pub fn proxied(&self, record: &DNSRecord) -> bool {
        match record
            .metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(ANNOTATION_RECORD_PROXIED))
            .filter(|v| !v.is_empty())
        {
            Some(value) => value == "true",
            None => self.default_proxied,
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&RecordBody<'_>>,
    ) -> Result<T> {
        let raw = format!("{}{path}", self.base_url);
        let url = if query.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, query)
        }
        .with_context(|| format!("invalid cloudflare url {raw}"))?;
        debug!(%method, url = %url, "Calling cloudflare API");

        let mut request = self.credentials.apply(self.http.request(method.clone(), url));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("cloudflare {method} {path} failed"))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .with_context(|| format!("failed to read cloudflare {method} {path} response"))?;

        let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|_| ProviderError::Api {
            provider: PROVIDER.to_string(),
            code: status.as_u16().to_string(),
            message: text.clone(),
        })?;

        if !envelope.success {
            let code = envelope
                .errors
                .first()
                .map_or_else(|| status.as_u16().to_string(), |e| e.code.to_string());
            let message = envelope
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            error!(%method, path, code = %code, message = %message, "Cloudflare API error");
            return Err(ProviderError::Api {
                provider: PROVIDER.to_string(),
                code,
                message,
            }
            .into());
        }

        envelope
            .result
            .ok_or_else(|| anyhow::anyhow!("cloudflare {method} {path} returned no result"))
    }

    fn records_path(&self) -> String {
        format!("/zones/{}/dns_records", self.zone_id)
    }

    fn record_path(&self, id: &str) -> String {
        format!("/zones/{}/dns_records/{id}", self.zone_id)
    }

    fn body<'a>(&self, record: &'a DNSRecord) -> RecordBody<'a> {
        RecordBody {
            record_type: record.spec.record_type.as_str(),
            name: &record.spec.name,
            content: &record.spec.value,
            ttl: record.spec.ttl.unwrap_or(DEFAULT_DNS_RECORD_TTL_SECS),
            proxied: self.proxied(record),
        }
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn search(&self, record: &DNSRecord) -> Result<Option<String>> {
        let remembered = record
            .status
            .as_ref()
            .and_then(|s| s.record_id.as_deref())
            .filter(|id| !id.is_empty());
        if let Some(id) = remembered {
            match self
                .call::<CloudflareRecord>(Method::GET, &self.record_path(id), &[], None)
                .await
            {
                Ok(found) => return Ok(Some(found.id)),
                Err(e) => debug!(record_id = id, error = %e, "Remembered cloudflare record id not found"),
            }
        }

        let records: Vec<CloudflareRecord> = self
            .call(
                Method::GET,
                &self.records_path(),
                &[("name", record.spec.name.as_str())],
                None,
            )
            .await?;
        Ok(records.into_iter().next().map(|r| r.id))
    }

    async fn create(&self, record: &DNSRecord) -> Result<String> {
        let created: CloudflareRecord = self
            .call(
                Method::POST,
                &self.records_path(),
                &[],
                Some(&self.body(record)),
            )
            .await?;
        Ok(created.id)
    }

    async fn update(&self, record: &DNSRecord, id: &str) -> Result<()> {
        let current: CloudflareRecord = self
            .call(Method::GET, &self.record_path(id), &[], None)
            .await?;
        let body = self.body(record);
        if current.name == body.name
            && current.record_type == body.record_type
            && current.content == body.content
            && current.proxied == body.proxied
        {
            debug!(record_id = id, name = body.name, "Cloudflare record already up to date");
            return Ok(());
        }

        let _: CloudflareRecord = self
            .call(Method::PUT, &self.record_path(id), &[], Some(&body))
            .await?;
        Ok(())
    }

    async fn delete(&self, _record: &DNSRecord, id: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call(Method::DELETE, &self.record_path(id), &[], None)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "cloudflare_tests.rs"]
mod cloudflare_tests;
