// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # dns-manager - Ingress driven DNS records for Kubernetes
//!
//! dns-manager watches `Ingress` objects and keeps matching records on
//! external DNS providers (Alibaba Cloud DNS, Cloudflare) in sync.
//!
//! ## Overview
//!
//! - A [`generators`] strategy selected per Ingress turns its hosts into
//!   desired `DNSRecord` specs (a CNAME to a fixed target, or an A record to
//!   the discovered public address).
//! - The Ingress controller projects those specs into owned `DNSRecord`
//!   objects.
//! - The `DNSRecord` controller matches each record to the `DNSProvider`
//!   serving its domain and drives it through
//!   `Pending -> Matching -> Syncing -> Success | Failed`.
//! - [`providers`] adapters talk to the vendor APIs.
//!
//! ## Modules
//!
//! - [`crd`] - `DNSRecord`, `DNSProvider` and `DNSGenerator` resources
//! - [`reconcilers`] - One controller per watched kind
//! - [`providers`] - Backend adapters and their registry
//! - [`generators`] - Record generators and their registry
//! - [`public_ip`] - Public address discovery and cache
//! - [`context`] - Shared controller context
//! - [`config`] - Command-line and environment configuration
//! - [`server`] - Metrics and health endpoints
//!
//! ## Example
//!
//! ```rust,no_run
//! use dns_manager::crd::{DNSRecordSpec, RecordType};
//!
//! let spec = DNSRecordSpec {
//!     record_type: RecordType::A,
//!     name: "app.example.com".to_string(),
//!     value: "203.0.113.7".to_string(),
//!     ttl: Some(300),
//! };
//! assert!(spec.matches_domain("example.com"));
//! assert_eq!(spec.relative_name("example.com"), "app");
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod dns_errors;
pub mod generators;
pub mod labels;
pub mod metrics;
pub mod providers;
pub mod public_ip;
pub mod reconcilers;
pub mod server;
pub mod status_reasons;
