// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `DNSRecord` reconciliation.
//!
//! Each pass advances a record through
//! `Pending → Matching → Syncing → Success | Failed` by at most one step and
//! says when to look again:
//!
//! - **Pending**: first observation; the phase is recorded and the record is
//!   requeued immediately.
//! - **Matching**: the record is assigned to the `DNSProvider` whose
//!   `domainName` is its longest dot-boundary suffix.
//! - **Re-validation**: an assigned provider is re-read on every pass. A
//!   missing or no longer matching provider sends the record back to
//!   Matching; an invalid one parks it for [`RETRY_INTERVAL_SECS`].
//! - **Syncing**: the backend record is searched, then updated or created
//!   (or deleted while the record is being deleted).
//!
//! The decision logic lives in [`step`], which only talks to the cluster
//! through [`ProviderDirectory`] and [`FinalizerGate`]. [`reconcile_dnsrecord`]
//! wires it to the Kubernetes API and writes the resulting status.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use kube::api::ListParams;
use kube::runtime::controller::Action;
use kube::runtime::reflector::ObjectRef;
use kube::runtime::{watcher, Controller};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::events::create_event;
use super::finalizers::{ensure_finalizer, has_finalizer, remove_finalizer};
use super::retry::retry_api_call;
use super::status::update_status;
use super::ReconcileError;
use crate::constants::{ERROR_REQUEUE_DURATION_SECS, KIND_DNS_RECORD, RETRY_INTERVAL_SECS};
use crate::context::Context;
use crate::crd::{DNSProvider, DNSRecord, DNSRecordStatus, ProviderRef, RecordPhase, ValidityStatus};
use crate::labels::FINALIZER_DNS_RECORD;
use crate::metrics;
use crate::providers::{select_provider, DnsProvider, ProviderRegistry};
use crate::status_reasons::{
    EVENT_TYPE_NORMAL, EVENT_TYPE_WARNING, MSG_DELETED, MSG_START_RECONCILING, MSG_SYNCED,
    MSG_WAIT_PROVIDER_VALID, REASON_ERROR, REASON_INFO, REASON_WARNING,
};

/// Where the state machine finds providers and their adapters.
#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    /// Every `DNSProvider` in the cluster.
    async fn list(&self) -> Result<Vec<DNSProvider>>;

    /// One provider, `None` when it does not exist.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<DNSProvider>>;

    /// Backend adapter for `provider`.
    async fn adapter(&self, provider: &DNSProvider) -> Result<Arc<dyn DnsProvider>>;

    /// Record on the provider that it could not be turned into an adapter.
    async fn mark_invalid(&self, provider: &DNSProvider, message: &str) -> Result<()>;
}

/// Attaches and releases the record finalizer.
#[async_trait]
pub trait FinalizerGate: Send + Sync {
    async fn attach(&self, record: &DNSRecord) -> Result<()>;
    async fn release(&self, record: &DNSRecord) -> Result<()>;
}

/// When to reconcile the record again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Next {
    Requeue(Duration),
    AwaitChange,
}

impl Next {
    #[must_use]
    pub fn now() -> Self {
        Self::Requeue(Duration::ZERO)
    }

    #[must_use]
    pub fn retry() -> Self {
        Self::Requeue(Duration::from_secs(RETRY_INTERVAL_SECS))
    }

    #[must_use]
    pub fn into_action(self) -> Action {
        match self {
            Self::Requeue(after) => Action::requeue(after),
            Self::AwaitChange => Action::await_change(),
        }
    }
}

/// Event to emit alongside a status change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub event_type: &'static str,
    pub reason: &'static str,
    pub message: String,
}

/// Outcome of one pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    /// Status the record should have (`last_updated` is stamped on write)
    pub status: DNSRecordStatus,
    pub notice: Option<Notice>,
    pub next: Next,
    /// The finalizer was released; the object may already be gone
    pub released: bool,
}

impl Transition {
    fn hold(status: DNSRecordStatus, next: Next) -> Self {
        Self {
            status,
            notice: None,
            next,
            released: false,
        }
    }

    fn info(status: DNSRecordStatus, next: Next) -> Self {
        let message = status.message.clone().unwrap_or_default();
        Self {
            status,
            notice: Some(Notice {
                event_type: EVENT_TYPE_NORMAL,
                reason: REASON_INFO,
                message,
            }),
            next,
            released: false,
        }
    }

    fn warning(status: DNSRecordStatus, reason: &'static str, next: Next) -> Self {
        let message = status.message.clone().unwrap_or_default();
        Self {
            status,
            notice: Some(Notice {
                event_type: EVENT_TYPE_WARNING,
                reason,
                message,
            }),
            next,
            released: false,
        }
    }
}

/// Knobs of [`step`] that come from configuration and the clock.
#[derive(Clone, Copy, Debug)]
pub struct StepOptions {
    pub default_ttl: i32,
    pub now: DateTime<Utc>,
}

/// SHA-256 (hex) over spec, labels and annotations.
///
/// # Errors
///
/// Returns an error if the record cannot be serialized.
pub fn record_hash(record: &DNSRecord) -> Result<String> {
    let payload = json!({
        "spec": record.spec,
        "labels": record.metadata.labels,
        "annotations": record.metadata.annotations,
    });
    let digest = Sha256::digest(serde_json::to_vec(&payload)?);
    Ok(hex::encode(digest))
}

/// Time left before a Failed record may be retried.
#[must_use]
pub fn failure_backoff_remaining(status: &DNSRecordStatus, now: DateTime<Utc>) -> Option<Duration> {
    let last = status
        .last_updated
        .as_deref()
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())?
        .with_timezone(&Utc);
    let retry_at = last + chrono::Duration::seconds(i64::try_from(RETRY_INTERVAL_SECS).ok()?);
    (retry_at - now).to_std().ok().filter(|d| !d.is_zero())
}

fn with_message(mut status: DNSRecordStatus, message: impl Into<String>) -> DNSRecordStatus {
    status.message = Some(message.into());
    status
}

fn back_to_matching(mut status: DNSRecordStatus, message: impl Into<String>) -> DNSRecordStatus {
    status.provider_ref = None;
    status.phase = Some(RecordPhase::Matching);
    with_message(status, message)
}

fn failed(
    mut status: DNSRecordStatus,
    operation: &str,
    err: &anyhow::Error,
    hash: String,
) -> Transition {
    status.phase = Some(RecordPhase::Failed);
    status.record_hash = Some(hash);
    let status = with_message(status, format!("unable to {operation} record: {err:#}"));
    Transition::warning(status, REASON_ERROR, Next::retry())
}

/// Advance `record` by one step.
///
/// # Errors
///
/// Returns cluster-side failures (listing providers, finalizer patches).
/// Backend failures are not errors: they become a Failed phase.
#[allow(clippy::too_many_lines)]
pub async fn step(
    record: &DNSRecord,
    directory: &dyn ProviderDirectory,
    gate: &dyn FinalizerGate,
    options: StepOptions,
) -> Result<Transition> {
    let current = record.status.clone().unwrap_or_default();
    let name = record.spec.name.as_str();
    let deleting = record.metadata.deletion_timestamp.is_some();

    if deleting && !has_finalizer(record, FINALIZER_DNS_RECORD) {
        return Ok(Transition::hold(current, Next::AwaitChange));
    }

    let Some(phase) = current.phase else {
        let mut status = current;
        status.phase = Some(RecordPhase::Pending);
        return Ok(Transition::info(
            with_message(status, MSG_START_RECONCILING),
            Next::now(),
        ));
    };

    let Some(provider_ref) = current.provider_ref.clone() else {
        if phase != RecordPhase::Matching {
            let status = back_to_matching(current, format!("start matching provider for {name}"));
            return Ok(Transition::info(status, Next::now()));
        }

        let providers = directory.list().await?;
        // A deleting record keeps its finalizer until a backend confirms the delete.
        let Some(provider) = select_provider(&record.spec, &providers) else {
            let status = with_message(current, format!("no provider found for {name}"));
            return Ok(Transition::warning(status, REASON_WARNING, Next::retry()));
        };

        let provider_ref = ProviderRef {
            namespace: provider.namespace(),
            name: provider.name_any(),
        };
        let mut status = with_message(
            current,
            format!("provider found for {name} provider: {provider_ref}"),
        );
        status.provider_ref = Some(provider_ref);
        return Ok(Transition::info(status, Next::now()));
    };

    let namespace = provider_ref
        .namespace
        .clone()
        .or_else(|| record.namespace())
        .unwrap_or_default();
    let provider = match directory.get(&namespace, &provider_ref.name).await {
        Ok(Some(provider)) => provider,
        Ok(None) => {
            let status = back_to_matching(current, format!("provider {provider_ref} not found for {name}"));
            return Ok(Transition::warning(status, REASON_WARNING, Next::now()));
        }
        Err(e) => {
            warn!(record = name, provider = %provider_ref, error = %e, "Failed to fetch provider");
            let status = back_to_matching(current, format!("start matching provider for {name}"));
            return Ok(Transition::warning(status, REASON_WARNING, Next::now()));
        }
    };

    if !record.spec.matches_domain(&provider.spec.domain_name) {
        let status = back_to_matching(current, format!("provider not match for {name}"));
        return Ok(Transition::warning(status, REASON_WARNING, Next::now()));
    }

    if !provider.status.as_ref().is_some_and(|s| s.valid) {
        let status = with_message(current, MSG_WAIT_PROVIDER_VALID);
        return Ok(Transition::warning(status, REASON_WARNING, Next::retry()));
    }

    let hash = record_hash(record)?;
    if !deleting && current.record_hash.as_deref() == Some(hash.as_str()) {
        match phase {
            RecordPhase::Success => return Ok(Transition::hold(current, Next::AwaitChange)),
            RecordPhase::Failed => {
                if let Some(remaining) = failure_backoff_remaining(&current, options.now) {
                    return Ok(Transition::hold(current, Next::Requeue(remaining)));
                }
            }
            _ => {}
        }
    }

    if phase != RecordPhase::Syncing {
        let mut status = current;
        status.phase = Some(RecordPhase::Syncing);
        return Ok(Transition::hold(status, Next::now()));
    }

    let adapter = match directory.adapter(&provider).await {
        Ok(adapter) => adapter,
        Err(e) => {
            let message = format!("{e:#}");
            directory.mark_invalid(&provider, &message).await?;
            let status = back_to_matching(current, message);
            return Ok(Transition::warning(status, REASON_ERROR, Next::now()));
        }
    };

    let mut desired = record.clone();
    desired.spec.ttl.get_or_insert(options.default_ttl);

    let found = match adapter.search(&desired).await {
        Ok(found) => found,
        Err(e) => return Ok(failed(current, "search", &e, hash)),
    };

    if deleting {
        if let Some(id) = found {
            if let Err(e) = adapter.delete(&desired, &id).await {
                return Ok(failed(current, "delete", &e, hash));
            }
            info!(record = name, record_id = %id, "Deleted backend record");
        } else {
            debug!(record = name, "Backend record already absent");
        }
        gate.release(record).await?;

        let mut status = with_message(current, MSG_DELETED);
        status.phase = Some(RecordPhase::Success);
        status.record_id = None;
        let mut transition = Transition::info(status, Next::AwaitChange);
        transition.released = true;
        return Ok(transition);
    }

    gate.attach(record).await?;
    let id = if let Some(id) = found {
        if let Err(e) = adapter.update(&desired, &id).await {
            return Ok(failed(current, "update", &e, hash));
        }
        id
    } else {
        match adapter.create(&desired).await {
            Ok(id) => {
                info!(record = name, record_id = %id, "Created backend record");
                id
            }
            Err(e) => return Ok(failed(current, "create", &e, hash)),
        }
    };

    let mut status = with_message(current, MSG_SYNCED);
    status.phase = Some(RecordPhase::Success);
    status.record_id = Some(id);
    status.record_hash = Some(hash);
    Ok(Transition::info(status, Next::AwaitChange))
}

/// [`ProviderDirectory`] backed by the Kubernetes API and the adapter cache.
pub struct KubeProviderDirectory<'a> {
    client: &'a Client,
    registry: &'a ProviderRegistry,
}

impl<'a> KubeProviderDirectory<'a> {
    #[must_use]
    pub fn new(client: &'a Client, registry: &'a ProviderRegistry) -> Self {
        Self { client, registry }
    }
}

#[async_trait]
impl ProviderDirectory for KubeProviderDirectory<'_> {
    async fn list(&self) -> Result<Vec<DNSProvider>> {
        let api: Api<DNSProvider> = Api::all(self.client.clone());
        let lp = ListParams::default();
        let list = retry_api_call(|| api.list(&lp), "list DNSProviders").await?;
        Ok(list.items)
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<Option<DNSProvider>> {
        let api: Api<DNSProvider> = Api::namespaced(self.client.clone(), namespace);
        retry_api_call(|| api.get_opt(name), &format!("get DNSProvider {namespace}/{name}")).await
    }

    async fn adapter(&self, provider: &DNSProvider) -> Result<Arc<dyn DnsProvider>> {
        self.registry.adapter_for(provider).await
    }

    async fn mark_invalid(&self, provider: &DNSProvider, message: &str) -> Result<()> {
        let namespace = provider.namespace().unwrap_or_default();
        let name = provider.name_any();
        self.registry.invalidate(&namespace, &name);

        let api: Api<DNSProvider> = Api::namespaced(self.client.clone(), &namespace);
        let wanted = ValidityStatus {
            valid: false,
            message: Some(message.to_string()),
        };
        update_status(&api, &name, |live: &DNSProvider| {
            (live.status.as_ref() != Some(&wanted)).then(|| wanted.clone())
        })
        .await?;
        Ok(())
    }
}

/// [`FinalizerGate`] patching the record through the Kubernetes API.
pub struct KubeFinalizerGate<'a> {
    client: &'a Client,
}

impl<'a> KubeFinalizerGate<'a> {
    #[must_use]
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FinalizerGate for KubeFinalizerGate<'_> {
    async fn attach(&self, record: &DNSRecord) -> Result<()> {
        ensure_finalizer(self.client, record, FINALIZER_DNS_RECORD).await
    }

    async fn release(&self, record: &DNSRecord) -> Result<()> {
        remove_finalizer(self.client, record, FINALIZER_DNS_RECORD).await
    }
}

/// Reconcile one `DNSRecord` against the cluster and its backend.
///
/// The record is re-read first so the pass always starts from the latest
/// status, not from a possibly stale watch event.
///
/// # Errors
///
/// Returns Kubernetes API failures; they are retried by the error policy.
pub async fn reconcile_dnsrecord(record: Arc<DNSRecord>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = record.namespace().unwrap_or_default();
    let object_name = record.name_any();
    let api: Api<DNSRecord> = Api::namespaced(ctx.client.clone(), &namespace);

    let Some(record) = retry_api_call(
        || api.get_opt(&object_name),
        &format!("get DNSRecord {namespace}/{object_name}"),
    )
    .await?
    else {
        debug!(namespace, name = object_name, "DNSRecord is gone");
        return Ok(Action::await_change());
    };

    let directory = KubeProviderDirectory::new(&ctx.client, &ctx.providers);
    let gate = KubeFinalizerGate::new(&ctx.client);
    let transition = step(
        &record,
        &directory,
        &gate,
        StepOptions {
            default_ttl: ctx.config.default_record_ttl,
            now: Utc::now(),
        },
    )
    .await?;

    let previous = record.status.clone().unwrap_or_default();
    if !transition.status.same_as(&previous) {
        if !transition.released {
            let wanted = transition.status.clone();
            update_status(&api, &object_name, |live: &DNSRecord| {
                let live_status = live.status.clone().unwrap_or_default();
                (!live_status.same_as(&wanted)).then(|| DNSRecordStatus {
                    last_updated: Some(Utc::now().to_rfc3339()),
                    ..wanted.clone()
                })
            })
            .await?;
        }

        if let Some(notice) = &transition.notice {
            create_event(&ctx.client, &record, notice.event_type, notice.reason, &notice.message)
                .await;
        }
        info!(
            namespace,
            name = object_name,
            phase = ?transition.status.phase,
            message = transition.status.message.as_deref().unwrap_or_default(),
            "DNSRecord advanced"
        );
    }

    Ok(transition.next.into_action())
}

/// Records to re-check when `provider` changes: those assigned to it and
/// those still waiting for a provider.
#[must_use]
pub fn records_affected_by(
    provider: &DNSProvider,
    records: &[Arc<DNSRecord>],
) -> Vec<ObjectRef<DNSRecord>> {
    let namespace = provider.namespace();
    let name = provider.name_any();
    records
        .iter()
        .filter(|record| {
            match record.status.as_ref().and_then(|s| s.provider_ref.as_ref()) {
                None => true,
                Some(r) => {
                    r.name == name
                        && r.namespace.clone().or_else(|| record.namespace()) == namespace
                }
            }
        })
        .map(|record| ObjectRef::from_obj(record.as_ref()))
        .collect()
}

async fn reconcile_dnsrecord_wrapper(
    record: Arc<DNSRecord>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    match reconcile_dnsrecord(record.clone(), ctx).await {
        Ok(action) => {
            metrics::record_reconciliation_success(KIND_DNS_RECORD, start.elapsed());
            Ok(action)
        }
        Err(e) => {
            error!(
                namespace = record.namespace().unwrap_or_default(),
                name = record.name_any(),
                error = %format!("{e:#}"),
                "Failed to reconcile DNSRecord"
            );
            metrics::record_reconciliation_error(KIND_DNS_RECORD, start.elapsed());
            Err(e.into())
        }
    }
}

fn error_policy(_record: Arc<DNSRecord>, _err: &ReconcileError, _ctx: Arc<Context>) -> Action {
    metrics::record_reconciliation_requeue(KIND_DNS_RECORD, "error");
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}

/// Run the `DNSRecord` controller until its watch streams end.
///
/// # Errors
///
/// Never returns an error today; the signature matches the other controllers.
pub async fn run_dnsrecord_controller(ctx: Arc<Context>) -> Result<()> {
    info!("Starting DNSRecord controller");
    let client: Client = ctx.client.clone();

    let controller = Controller::new(Api::<DNSRecord>::all(client.clone()), watcher::Config::default());
    let store = controller.store();
    controller
        .watches(
            Api::<DNSProvider>::all(client),
            watcher::Config::default(),
            move |provider| records_affected_by(&provider, &store.state()),
        )
        .run(reconcile_dnsrecord_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

#[cfg(test)]
#[path = "dnsrecord_tests.rs"]
mod dnsrecord_tests;
