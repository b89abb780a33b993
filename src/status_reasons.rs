// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Event reasons and event types emitted by dns-manager reconcilers.
//!
//! Reasons are programmatic identifiers in `CamelCase` attached to Kubernetes
//! Events. They are observability only; no controller branches on them.

// ============================================================================
// Event Types
// ============================================================================

/// Informational Kubernetes Event type
pub const EVENT_TYPE_NORMAL: &str = "Normal";

/// Warning Kubernetes Event type
pub const EVENT_TYPE_WARNING: &str = "Warning";

// ============================================================================
// Generic Reasons
// ============================================================================

/// Informational progress on a record or source
pub const REASON_INFO: &str = "Info";

/// A reconciliation step failed; the message carries the error
pub const REASON_ERROR: &str = "Error";

/// A non-fatal condition the user should look at
pub const REASON_WARNING: &str = "Warning";

// ============================================================================
// Projection Reasons
// ============================================================================

/// A `DNSRecord` was created from a source
pub const REASON_RECORD_CREATED: &str = "RecordCreated";

/// A `DNSRecord` drifted from its source and was rewritten
pub const REASON_RECORD_UPDATED: &str = "RecordUpdated";

/// A `DNSRecord` is no longer produced by its source and was deleted
pub const REASON_RECORD_DELETED: &str = "RecordDeleted";

/// Another owner already controls a `DNSRecord` with the projected name
pub const REASON_RECORD_CONFLICT: &str = "RecordConflict";

// ============================================================================
// Record Messages
// ============================================================================

/// Message for the first observed pass of a record
pub const MSG_START_RECONCILING: &str = "start reconciling";

/// Message while a record waits for its provider to become valid
pub const MSG_WAIT_PROVIDER_VALID: &str = "wait for provider to be valid";

/// Message after a successful upsert
pub const MSG_SYNCED: &str = "synced";

/// Message after the backend record was removed (or found absent)
pub const MSG_DELETED: &str = "deleted";
