// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label, annotation and finalizer constants used across all reconcilers.
//!
//! Annotations on an `Ingress` steer which generator runs and how records are
//! shaped; the `record-` prefixed keys are carried onto every generated
//! `DNSRecord` so that providers can read per-record hints.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Value for `app.kubernetes.io/managed-by` on records projected from a source
pub const MANAGED_BY_DNS_MANAGER: &str = "dns-manager";

// ============================================================================
// Source Annotations
// ============================================================================

/// Names the generator instance that should project an `Ingress`.
///
/// Falls back to the configured default generator when absent.
pub const ANNOTATION_GENERATOR: &str = "dnsmanager.firestoned.io/generator";

/// Overrides the CNAME target used by the CNAME generator.
pub const ANNOTATION_CNAME: &str = "dnsmanager.firestoned.io/cname";

/// Prefix of labels and annotations copied from a source onto its records.
pub const RECORD_ANNOTATION_PREFIX: &str = "dnsmanager.firestoned.io/record-";

// ============================================================================
// Record Annotations
// ============================================================================

/// Per-record override of the Cloudflare `proxied` flag (`"true"` enables it).
pub const ANNOTATION_RECORD_PROXIED: &str = "dnsmanager.firestoned.io/record-proxied";

// ============================================================================
// Finalizers
// ============================================================================

/// Finalizer gating `DNSRecord` deletion until the backend record is gone
pub const FINALIZER_DNS_RECORD: &str = "dnsmanager.firestoned.io/finalizer";
