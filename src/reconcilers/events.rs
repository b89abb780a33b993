// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes Event helpers.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Event, ObjectReference};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use kube::api::PostParams;
use kube::{Api, Client, Resource, ResourceExt};
use tracing::{info, warn};

use crate::constants::EVENT_REPORTING_COMPONENT;
use crate::generators::Reporter;
use crate::status_reasons::{EVENT_TYPE_NORMAL, EVENT_TYPE_WARNING};

/// Build an Event about `reference`.
#[must_use]
pub fn build_event(
    reference: &ObjectReference,
    event_type: &str,
    reason: &str,
    message: &str,
) -> Event {
    let name = reference.name.clone().unwrap_or_default();
    let now = Time(k8s_openapi::jiff::Timestamp::now());
    Event {
        metadata: ObjectMeta {
            generate_name: Some(format!("{name}-")),
            namespace: reference.namespace.clone(),
            ..Default::default()
        },
        involved_object: reference.clone(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        type_: Some(event_type.to_string()),
        first_timestamp: Some(now.clone()),
        last_timestamp: Some(now),
        count: Some(1),
        reporting_component: Some(EVENT_REPORTING_COMPONENT.to_string()),
        ..Default::default()
    }
}

/// Message of a Warning event: `message: error` when an error is attached.
#[must_use]
pub fn event_message(message: &str, error: Option<&anyhow::Error>) -> String {
    match error {
        Some(e) => format!("{message}: {e}"),
        None => message.to_string(),
    }
}

/// Emit an Event for `reference`. Failures are logged, never returned.
pub async fn publish_event(
    client: &Client,
    reference: &ObjectReference,
    event_type: &str,
    reason: &str,
    message: &str,
) {
    let namespace = reference.namespace.clone().unwrap_or_default();
    let api: Api<Event> = Api::namespaced(client.clone(), &namespace);
    let event = build_event(reference, event_type, reason, message);

    if let Err(e) = api.create(&PostParams::default(), &event).await {
        warn!(
            object = reference.name.as_deref().unwrap_or_default(),
            reason,
            error = %e,
            "Failed to create event"
        );
    }
}

/// Emit an Event about `resource`.
pub async fn create_event<K>(
    client: &Client,
    resource: &K,
    event_type: &str,
    reason: &str,
    message: &str,
) where
    K: Resource<DynamicType = ()> + ResourceExt,
{
    publish_event(client, &resource.object_ref(&()), event_type, reason, message).await;
}

/// [`Reporter`] writing Events on one object.
#[derive(Clone)]
pub struct EventReporter {
    client: Client,
    reference: ObjectReference,
}

impl EventReporter {
    #[must_use]
    pub fn new<K>(client: Client, resource: &K) -> Self
    where
        K: Resource<DynamicType = ()>,
    {
        Self {
            client,
            reference: resource.object_ref(&()),
        }
    }
}

#[async_trait]
impl Reporter for EventReporter {
    async fn report(&self, reason: &str, message: &str, error: Option<&anyhow::Error>) {
        let object = format!(
            "{}/{}",
            self.reference.namespace.as_deref().unwrap_or_default(),
            self.reference.name.as_deref().unwrap_or_default()
        );
        let event_type = if let Some(e) = error {
            warn!(object = %object, reason, error = %e, "{message}");
            EVENT_TYPE_WARNING
        } else if reason == crate::status_reasons::REASON_INFO {
            info!(object = %object, reason, "{message}");
            EVENT_TYPE_NORMAL
        } else {
            warn!(object = %object, reason, "{message}");
            EVENT_TYPE_WARNING
        };
        publish_event(
            &self.client,
            &self.reference,
            event_type,
            reason,
            &event_message(message, error),
        )
        .await;
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod events_tests;
