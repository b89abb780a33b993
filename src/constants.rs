// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the dns-manager operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Kind Constants
// ============================================================================

/// Kind name for `DNSRecord` resource
pub const KIND_DNS_RECORD: &str = "DNSRecord";

/// Kind name for `DNSProvider` resource
pub const KIND_DNS_PROVIDER: &str = "DNSProvider";

/// Kind name for `DNSGenerator` resource
pub const KIND_DNS_GENERATOR: &str = "DNSGenerator";

/// Kind name for the `Ingress` source objects
pub const KIND_INGRESS: &str = "Ingress";

// ============================================================================
// Kubernetes Controller Constants
// ============================================================================

/// Requeue delay after a reconciliation error surfaced to the error policy
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Fixed retry interval for negative or indeterminate outcomes
/// (no provider found, provider invalid, backend call failed)
pub const RETRY_INTERVAL_SECS: u64 = 60;

/// Maximum attempts for a status write that keeps hitting 409 conflicts
pub const MAX_STATUS_UPDATE_ATTEMPTS: u32 = 5;

/// Reporting component name used on Kubernetes Events
pub const EVENT_REPORTING_COMPONENT: &str = "dns-manager";

// ============================================================================
// DNS Record Defaults
// ============================================================================

/// Default TTL applied to records that do not declare one
pub const DEFAULT_DNS_RECORD_TTL_SECS: i32 = 300;

// ============================================================================
// Generator Defaults
// ============================================================================

/// Timeout for each public IP discovery endpoint
pub const DEFAULT_DDNS_TIMEOUT_SECS: u64 = 2;

/// How long a discovered public IP stays cached
pub const DEFAULT_DDNS_CACHE_EXPIRE_SECS: u64 = 60;

/// How often expired public IP cache entries are evicted
pub const DEFAULT_DDNS_CLEAN_INTERVAL_SECS: u64 = 30;

/// How often a DDNS-backed source is re-derived
pub const DEFAULT_DDNS_REFRESH_INTERVAL_SECS: u64 = 600;

/// Multiplier applied to the endpoint timeout for the single fallback lookup
pub const PUBLIC_IP_FALLBACK_TIMEOUT_MULTIPLIER: u32 = 5;

// ============================================================================
// Provider Defaults
// ============================================================================

/// How long a constructed provider adapter is reused before being rebuilt
pub const DEFAULT_PROVIDER_CACHE_TTL_SECS: u64 = 300;

/// Request timeout for backend DNS API calls
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for the Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Thread name prefix for the Tokio runtime
pub const TOKIO_THREAD_NAME: &str = "dns-manager";

// ============================================================================
// Telemetry Constants
// ============================================================================

/// Default bind address of the Prometheus metrics server
pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default bind address of the health probe server
pub const DEFAULT_HEALTH_PROBE_BIND_ADDRESS: &str = "0.0.0.0:8081";

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path for the liveness probe
pub const HEALTHZ_PATH: &str = "/healthz";

/// Path for the readiness probe
pub const READYZ_PATH: &str = "/readyz";
