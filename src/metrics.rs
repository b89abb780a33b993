// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the dns-manager operator.
//!
//! All metrics use the namespace prefix `dnsmanager_firestoned_io_`
//! (prometheus-safe version of "dnsmanager.firestoned.io").
//!
//! Metrics are created lazily on first use and registered in
//! [`METRICS_REGISTRY`], which [`gather_metrics`] encodes for `/metrics`.
//!
//! # Example
//!
//! ```rust,no_run
//! use dns_manager::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("DNSRecord", std::time::Duration::from_secs(1));
//! ```

use prometheus::core::Collector;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

/// Prefix of every metric name (prometheus-safe form of the API group)
const METRICS_NAMESPACE: &str = "dnsmanager_firestoned_io";

/// Reconciliation durations, 1 ms to 1 min
const DURATION_BUCKETS: [f64; 10] = [0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0];

/// Registry exposed on `/metrics`.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn registered<C: Collector + Clone + 'static>(collector: C) -> C {
    // Metric names are static and unique.
    METRICS_REGISTRY
        .register(Box::new(collector.clone()))
        .unwrap();
    collector
}

fn counter(name: &str, help: &str, labels: &[&str]) -> CounterVec {
    let opts = Opts::new(format!("{METRICS_NAMESPACE}_{name}"), help);
    registered(CounterVec::new(opts, labels).unwrap())
}

// ----------------------------------------------------------------------------
// Reconciliation
// ----------------------------------------------------------------------------

/// Reconciliations by `resource_type` and `status` (`success`, `error`, `requeue`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "reconciliations_total",
        "Total number of reconciliations by resource type and status",
        &["resource_type", "status"],
    )
});

/// Reconciliation duration in seconds by `resource_type`
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by resource type",
    )
    .buckets(DURATION_BUCKETS.to_vec());
    registered(HistogramVec::new(opts, &["resource_type"]).unwrap())
});

/// Requeues by `resource_type` and `reason`
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "requeues_total",
        "Total number of requeue operations by resource type and reason",
        &["resource_type", "reason"],
    )
});

// ----------------------------------------------------------------------------
// Projection, backends and public IP discovery
// ----------------------------------------------------------------------------

/// `DNSRecord` objects written by the Ingress projector, by `action`
/// (`create`, `update`, `delete`)
pub static RECORDS_PROJECTED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "records_projected_total",
        "Total number of DNSRecord objects created, updated or deleted from sources",
        &["action"],
    )
});

/// Provider API calls by `provider_type`, `operation` and `status`
pub static BACKEND_OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "backend_operations_total",
        "Total number of DNS backend operations by provider type, operation and status",
        &["provider_type", "operation", "status"],
    )
});

/// Public IP lookups by `result` (`cache_hit`, `resolved`, `failed`)
pub static PUBLIC_IP_LOOKUPS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "public_ip_lookups_total",
        "Total number of public IP lookups by result",
        &["result"],
    )
});

fn finish_reconciliation(resource_type: &str, status: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, status])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Count a successful pass of a `resource_type` controller.
pub fn record_reconciliation_success(resource_type: &str, duration: Duration) {
    finish_reconciliation(resource_type, "success", duration);
}

/// Count a failed pass of a `resource_type` controller.
pub fn record_reconciliation_error(resource_type: &str, duration: Duration) {
    finish_reconciliation(resource_type, "error", duration);
}

/// Count a requeue issued by an error policy.
pub fn record_reconciliation_requeue(resource_type: &str, reason: &str) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "requeue"])
        .inc();
    REQUEUE_TOTAL.with_label_values(&[resource_type, reason]).inc();
}

pub fn record_projection(action: &str) {
    RECORDS_PROJECTED_TOTAL.with_label_values(&[action]).inc();
}

pub fn record_backend_operation(provider_type: &str, operation: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    BACKEND_OPERATIONS_TOTAL
        .with_label_values(&[provider_type, operation, status])
        .inc();
}

pub fn record_public_ip_lookup(result: &str) {
    PUBLIC_IP_LOOKUPS_TOTAL.with_label_values(&[result]).inc();
}

/// Encode every registered metric in the Prometheus text format.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&METRICS_REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
