// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for DNS management.
//!
//! This module defines the Kubernetes Custom Resource Definitions used by
//! dns-manager to project routing objects into records on external DNS providers.
//!
//! # Resource Types
//!
//! - [`DNSRecord`] - One desired DNS record and its reconciliation phase
//! - [`DNSProvider`] - An external DNS backend serving one domain
//! - [`DNSGenerator`] - A named strategy turning an `Ingress` into records
//!
//! # Example: A record synced through a provider
//!
//! ```rust
//! use dns_manager::crd::{DNSRecordSpec, RecordType};
//!
//! let spec = DNSRecordSpec {
//!     record_type: RecordType::A,
//!     name: "app.example.com".to_string(),
//!     value: "203.0.113.7".to_string(),
//!     ttl: Some(300),
//! };
//!
//! assert!(spec.matches_domain("example.com"));
//! assert_eq!(spec.relative_name("example.com"), "app");
//! assert_eq!(spec.object_name(), "app-example-com");
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    DEFAULT_DDNS_CACHE_EXPIRE_SECS, DEFAULT_DDNS_CLEAN_INTERVAL_SECS,
    DEFAULT_DDNS_REFRESH_INTERVAL_SECS, DEFAULT_DDNS_TIMEOUT_SECS,
};

// ============================================================================
// DNSRecord
// ============================================================================

/// DNS record types supported by dns-manager.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    AAAA,
    CNAME,
    TXT,
    MX,
    SRV,
    NS,
    CAA,
}

impl RecordType {
    /// Wire name of the record type (e.g. `"CNAME"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::AAAA => "AAAA",
            Self::CNAME => "CNAME",
            Self::TXT => "TXT",
            Self::MX => "MX",
            Self::SRV => "SRV",
            Self::NS => "NS",
            Self::CAA => "CAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `DNSRecord` declares one desired record on whichever provider serves its domain.
///
/// Records are normally created by the `Ingress` projector and owned by the
/// `Ingress` they were derived from, but they can also be written by hand.
///
/// # Example
///
/// ```yaml
/// apiVersion: dnsmanager.firestoned.io/v1alpha1
/// kind: DNSRecord
/// metadata:
///   name: app-example-com
///   namespace: default
/// spec:
///   recordType: A
///   name: app.example.com
///   value: 203.0.113.7
///   ttl: 300
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "dnsmanager.firestoned.io",
    version = "v1alpha1",
    kind = "DNSRecord",
    namespaced,
    doc = "DNSRecord is a desired DNS record. The controller matches it to the DNSProvider serving its domain and keeps the backend record in sync.",
    printcolumn = r#"{"name":"Type","type":"string","jsonPath":".spec.recordType"}"#,
    printcolumn = r#"{"name":"Name","type":"string","jsonPath":".spec.name"}"#,
    printcolumn = r#"{"name":"Value","type":"string","jsonPath":".spec.value"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#
)]
#[kube(status = "DNSRecordStatus")]
#[serde(rename_all = "camelCase")]
pub struct DNSRecordSpec {
    /// Record type (A, AAAA, CNAME, TXT, MX, SRV, NS, CAA).
    pub record_type: RecordType,

    /// Fully qualified record name (e.g. "app.example.com").
    #[schemars(regex(
        pattern = r"^([a-zA-Z0-9_*]([a-zA-Z0-9-_]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?$"
    ))]
    pub name: String,

    /// Record value (address, target name or text, depending on the type).
    pub value: String,

    /// Time To Live in seconds. The operator default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 2_147_483_647))]
    pub ttl: Option<i32>,
}

impl DNSRecordSpec {
    /// Dot-boundary suffix test: `a.example.com` matches `example.com`,
    /// `badexample.com` and `example.com` itself do not.
    #[must_use]
    pub fn matches_domain(&self, domain: &str) -> bool {
        if domain.is_empty() {
            return false;
        }
        self.name
            .strip_suffix(domain)
            .is_some_and(|head| head.ends_with('.'))
    }

    /// Name relative to `domain`, as backends expect it (the "RR").
    ///
    /// Returns the full name unchanged when it is not under `domain`.
    #[must_use]
    pub fn relative_name(&self, domain: &str) -> String {
        let suffix = format!(".{domain}");
        self.name
            .strip_suffix(&suffix)
            .unwrap_or(&self.name)
            .to_string()
    }

    /// Kubernetes object name derived from the record name.
    #[must_use]
    pub fn object_name(&self) -> String {
        self.name.replace('.', "-").to_lowercase().trim().to_string()
    }
}

/// Reconciliation phase of a `DNSRecord`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum RecordPhase {
    /// First observed, nothing done yet
    Pending,
    /// Looking for a provider whose domain covers the record
    Matching,
    /// Talking to the provider backend
    Syncing,
    /// Backend converged (or the record was removed during deletion)
    Success,
    /// The last backend call failed; retried on a fixed interval
    Failed,
}

impl fmt::Display for RecordPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::Matching => "Matching",
            Self::Syncing => "Syncing",
            Self::Success => "Success",
            Self::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Non-owning reference from a record to the provider it syncs through.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRef {
    /// Provider namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Provider name
    pub name: String,
}

impl fmt::Display for ProviderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}/{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Status of a `DNSRecord`.
///
/// Fields are serialized even when `None` so that a merge patch clears them.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DNSRecordStatus {
    /// Provider the record is matched to
    #[serde(default)]
    pub provider_ref: Option<ProviderRef>,

    /// Current reconciliation phase
    #[serde(default)]
    pub phase: Option<RecordPhase>,

    /// Human-readable outcome of the last step
    #[serde(default)]
    pub message: Option<String>,

    /// Backend identifier of the record, used as the fast search path
    #[serde(default)]
    pub record_id: Option<String>,

    /// SHA-256 of spec, labels and annotations at the last sync attempt
    #[serde(default)]
    pub record_hash: Option<String>,

    /// RFC 3339 timestamp of the last status change
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl DNSRecordStatus {
    /// Compare two statuses ignoring `last_updated`.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.provider_ref == other.provider_ref
            && self.phase == other.phase
            && self.message == other.message
            && self.record_id == other.record_id
            && self.record_hash == other.record_hash
    }
}

// ============================================================================
// DNSProvider
// ============================================================================

/// Backend vendor behind a `DNSProvider`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum ProviderType {
    /// Alibaba Cloud DNS
    #[serde(rename = "ALIYUN")]
    Aliyun,
    /// Cloudflare DNS
    #[serde(rename = "CLOUDFLARE")]
    Cloudflare,
}

impl ProviderType {
    /// Registry key for this provider type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aliyun => "ALIYUN",
            Self::Cloudflare => "CLOUDFLARE",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alibaba Cloud credentials.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AliyunProviderConfig {
    /// `AccessKey` ID
    pub access_key_id: String,
    /// `AccessKey` secret
    pub access_key_secret: String,
}

/// Cloudflare credentials and record defaults.
///
/// Either `apiToken` or both `key` and `email` must be set.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CloudflareProviderConfig {
    /// Scoped API token (preferred)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// Global API key, used together with `email`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Account email, used together with `key`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Zone to write into. Defaults to the provider's `domainName`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,
    /// Default for the Cloudflare proxy flag on created records
    #[serde(default)]
    pub proxied: bool,
}

/// `DNSProvider` configures one external DNS backend for one domain.
///
/// # Example
///
/// ```yaml
/// apiVersion: dnsmanager.firestoned.io/v1alpha1
/// kind: DNSProvider
/// metadata:
///   name: example-com
///   namespace: dns-system
/// spec:
///   domainName: example.com
///   providerType: CLOUDFLARE
///   cloudflare:
///     apiToken: "..."
///     proxied: false
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "dnsmanager.firestoned.io",
    version = "v1alpha1",
    kind = "DNSProvider",
    namespaced,
    doc = "DNSProvider is an external DNS backend. DNSRecords whose name falls under domainName are synced through it.",
    printcolumn = r#"{"name":"Domain","type":"string","jsonPath":".spec.domainName"}"#,
    printcolumn = r#"{"name":"Type","type":"string","jsonPath":".spec.providerType"}"#,
    printcolumn = r#"{"name":"Valid","type":"boolean","jsonPath":".status.valid"}"#
)]
#[kube(status = "ValidityStatus")]
#[serde(rename_all = "camelCase")]
pub struct DNSProviderSpec {
    /// Domain served by this provider (e.g. "example.com").
    #[schemars(regex(
        pattern = r"^([a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)*[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?$"
    ))]
    pub domain_name: String,

    /// Backend vendor.
    pub provider_type: ProviderType,

    /// Alibaba Cloud settings, required for `ALIYUN`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliyun: Option<AliyunProviderConfig>,

    /// Cloudflare settings, required for `CLOUDFLARE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudflare: Option<CloudflareProviderConfig>,
}

/// Status shared by `DNSProvider` and `DNSGenerator`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidityStatus {
    /// Whether the object could be turned into a working adapter or generator
    #[serde(default)]
    pub valid: bool,
    /// Construction error, or "ok"
    #[serde(default)]
    pub message: Option<String>,
}

// ============================================================================
// DNSGenerator
// ============================================================================

/// Strategy implemented by a `DNSGenerator`.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum GeneratorType {
    /// One A record per host, pointing at the discovered public IPv4
    DDNS,
    /// One CNAME record per host, pointing at a fixed target
    CNAME,
}

impl GeneratorType {
    /// Registry key for this generator type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DDNS => "DDNS",
            Self::CNAME => "CNAME",
        }
    }
}

impl fmt::Display for GeneratorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_ddns_timeout() -> u64 {
    DEFAULT_DDNS_TIMEOUT_SECS
}

fn default_ddns_cache_expire() -> u64 {
    DEFAULT_DDNS_CACHE_EXPIRE_SECS
}

fn default_ddns_clean_interval() -> u64 {
    DEFAULT_DDNS_CLEAN_INTERVAL_SECS
}

fn default_ddns_refresh_interval() -> u64 {
    DEFAULT_DDNS_REFRESH_INTERVAL_SECS
}

/// Dynamic-address generator settings. All durations are in seconds.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DdnsGeneratorConfig {
    /// Timeout for each public IP endpoint
    #[serde(default = "default_ddns_timeout")]
    pub timeout: u64,

    /// Extra endpoints queried for the public IP
    #[serde(default)]
    pub extra_apis: Vec<String>,

    /// How long a discovered IP is cached
    #[serde(default = "default_ddns_cache_expire")]
    pub cache_expire: u64,

    /// Ignored. Every DDNS generator shares one address cache, evicted on the
    /// operator's `--ddns-clean-interval`.
    #[serde(default = "default_ddns_clean_interval")]
    pub clean_interval: u64,

    /// How often sources using this generator are re-derived
    #[serde(default = "default_ddns_refresh_interval")]
    pub refresh_interval: u64,
}

impl Default for DdnsGeneratorConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_DDNS_TIMEOUT_SECS,
            extra_apis: Vec::new(),
            cache_expire: DEFAULT_DDNS_CACHE_EXPIRE_SECS,
            clean_interval: DEFAULT_DDNS_CLEAN_INTERVAL_SECS,
            refresh_interval: DEFAULT_DDNS_REFRESH_INTERVAL_SECS,
        }
    }
}

/// Alias generator settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CnameGeneratorConfig {
    /// CNAME target used when the source carries no override annotation
    #[serde(default)]
    pub value: String,
}

/// `DNSGenerator` registers a named generator that `Ingress` objects can select
/// through the `dnsmanager.firestoned.io/generator` annotation.
///
/// # Example
///
/// ```yaml
/// apiVersion: dnsmanager.firestoned.io/v1alpha1
/// kind: DNSGenerator
/// metadata:
///   name: home-ddns
///   namespace: dns-system
/// spec:
///   generatorType: DDNS
///   ddns:
///     refreshInterval: 300
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "dnsmanager.firestoned.io",
    version = "v1alpha1",
    kind = "DNSGenerator",
    namespaced,
    doc = "DNSGenerator registers a named strategy that turns Ingress hosts into DNSRecords.",
    printcolumn = r#"{"name":"Type","type":"string","jsonPath":".spec.generatorType"}"#,
    printcolumn = r#"{"name":"Valid","type":"boolean","jsonPath":".status.valid"}"#
)]
#[kube(status = "ValidityStatus")]
#[serde(rename_all = "camelCase")]
pub struct DNSGeneratorSpec {
    /// Strategy to build.
    pub generator_type: GeneratorType,

    /// Settings for `DDNS`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ddns: Option<DdnsGeneratorConfig>,

    /// Settings for `CNAME`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cname: Option<CnameGeneratorConfig>,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
