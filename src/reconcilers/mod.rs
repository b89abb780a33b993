// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes controllers for dns-manager.
//!
//! # Available Controllers
//!
//! - [`run_dnsrecord_controller`] - Drives each `DNSRecord` through matching
//!   and backend sync, re-checking records when their `DNSProvider` changes
//! - [`run_dnsprovider_controller`] - Validates `DNSProvider` credentials and
//!   reports `status.valid`
//! - [`run_dnsgenerator_controller`] - Builds and registers named generators
//!   from `DNSGenerator` objects
//! - [`run_ingress_controller`] - Projects `Ingress` hosts into owned
//!   `DNSRecord` objects
//!
//! Every controller shares one [`crate::context::Context`] and maps failures
//! to [`ReconcileError`], which the error policies requeue after
//! [`crate::constants::ERROR_REQUEUE_DURATION_SECS`].

pub mod dnsgenerator;
pub mod dnsprovider;
pub mod dnsrecord;
pub mod events;
pub mod finalizers;
pub mod ingress;
pub mod retry;
pub mod status;

pub use dnsgenerator::{reconcile_dnsgenerator, run_dnsgenerator_controller};
pub use dnsprovider::{reconcile_dnsprovider, run_dnsprovider_controller};
pub use dnsrecord::{reconcile_dnsrecord, run_dnsrecord_controller};
pub use ingress::{reconcile_ingress, run_ingress_controller};

/// Error type returned to the kube-rs controller runtime.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ReconcileError(#[from] anyhow::Error);
