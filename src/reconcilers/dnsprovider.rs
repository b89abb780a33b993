// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `DNSProvider` validation.
//!
//! A provider is valid when its spec can be turned into a backend adapter,
//! which includes checking the credentials against the live backend. The
//! outcome is published as `status.valid` / `status.message`; `DNSRecord`s
//! only sync through valid providers.

use anyhow::Result;
use futures::StreamExt;
use kube::runtime::controller::Action;
use kube::runtime::{watcher, Controller};
use kube::{Api, ResourceExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use super::events::create_event;
use super::status::update_status;
use super::ReconcileError;
use crate::constants::{ERROR_REQUEUE_DURATION_SECS, KIND_DNS_PROVIDER, RETRY_INTERVAL_SECS};
use crate::context::Context;
use crate::crd::{DNSProvider, ValidityStatus};
use crate::metrics;
use crate::status_reasons::{EVENT_TYPE_NORMAL, EVENT_TYPE_WARNING, REASON_ERROR, REASON_INFO};

/// Message reported by valid providers and generators.
pub const VALID_MESSAGE: &str = "ok";

/// Status describing the outcome of building an adapter or generator.
#[must_use]
pub fn validity<T>(built: &Result<T>) -> ValidityStatus {
    match built {
        Ok(_) => ValidityStatus {
            valid: true,
            message: Some(VALID_MESSAGE.to_string()),
        },
        Err(e) => ValidityStatus {
            valid: false,
            message: Some(format!("{e:#}")),
        },
    }
}

/// Next pass: valid objects wait for a change, invalid ones are retried.
#[must_use]
pub fn validity_action(status: &ValidityStatus) -> Action {
    if status.valid {
        Action::await_change()
    } else {
        Action::requeue(Duration::from_secs(RETRY_INTERVAL_SECS))
    }
}

/// Validate one `DNSProvider` and publish the result.
///
/// # Errors
///
/// Returns an error when the status cannot be written.
pub async fn reconcile_dnsprovider(provider: Arc<DNSProvider>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = provider.namespace().unwrap_or_default();
    let name = provider.name_any();

    let built = ctx.providers.adapter_for(&provider).await;
    let wanted = validity(&built);
    if let Err(e) = &built {
        warn!(namespace, name, error = %format!("{e:#}"), "Unable to create provider");
        ctx.providers.invalidate(&namespace, &name);
    }

    let api: Api<DNSProvider> = Api::namespaced(ctx.client.clone(), &namespace);
    let written = update_status(&api, &name, |live: &DNSProvider| {
        (live.status.as_ref() != Some(&wanted)).then(|| wanted.clone())
    })
    .await?;

    if written {
        let message = wanted.message.clone().unwrap_or_default();
        if wanted.valid {
            info!(namespace, name, domain = %provider.spec.domain_name, "DNSProvider is valid");
            create_event(&ctx.client, provider.as_ref(), EVENT_TYPE_NORMAL, REASON_INFO, &message)
                .await;
        } else {
            create_event(&ctx.client, provider.as_ref(), EVENT_TYPE_WARNING, REASON_ERROR, &message)
                .await;
        }
    }

    Ok(validity_action(&wanted))
}

async fn reconcile_dnsprovider_wrapper(
    provider: Arc<DNSProvider>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    match reconcile_dnsprovider(provider.clone(), ctx).await {
        Ok(action) => {
            metrics::record_reconciliation_success(KIND_DNS_PROVIDER, start.elapsed());
            Ok(action)
        }
        Err(e) => {
            error!(name = provider.name_any(), error = %format!("{e:#}"), "Failed to reconcile DNSProvider");
            metrics::record_reconciliation_error(KIND_DNS_PROVIDER, start.elapsed());
            Err(e.into())
        }
    }
}

fn error_policy(_provider: Arc<DNSProvider>, _err: &ReconcileError, _ctx: Arc<Context>) -> Action {
    metrics::record_reconciliation_requeue(KIND_DNS_PROVIDER, "error");
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}

/// Run the `DNSProvider` controller.
///
/// # Errors
///
/// Never returns an error today; the signature matches the other controllers.
pub async fn run_dnsprovider_controller(ctx: Arc<Context>) -> Result<()> {
    info!("Starting DNSProvider controller");

    Controller::new(
        Api::<DNSProvider>::all(ctx.client.clone()),
        watcher::Config::default(),
    )
    .run(reconcile_dnsprovider_wrapper, error_policy, ctx)
    .for_each(|_| futures::future::ready(()))
    .await;

    Ok(())
}

#[cfg(test)]
#[path = "dnsprovider_tests.rs"]
mod dnsprovider_tests;
