// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `events.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{DNSRecord, DNSRecordSpec, RecordType};
    use crate::reconcilers::events::{build_event, event_message};
    use kube::Resource;

    fn record() -> DNSRecord {
        let mut record = DNSRecord::new(
            "app-example-com",
            DNSRecordSpec {
                record_type: RecordType::A,
                name: "app.example.com".to_string(),
                value: "1.2.3.4".to_string(),
                ttl: None,
            },
        );
        record.metadata.namespace = Some("web".to_string());
        record.metadata.uid = Some("uid-1".to_string());
        record
    }

    #[test]
    fn test_build_event_targets_object() {
        let reference = record().object_ref(&());
        let event = build_event(&reference, "Warning", "Error", "unable to create record: boom");

        assert_eq!(event.metadata.generate_name.as_deref(), Some("app-example-com-"));
        assert_eq!(event.metadata.namespace.as_deref(), Some("web"));
        assert_eq!(event.involved_object.kind.as_deref(), Some("DNSRecord"));
        assert_eq!(event.involved_object.uid.as_deref(), Some("uid-1"));
        assert_eq!(
            event.involved_object.api_version.as_deref(),
            Some("dnsmanager.firestoned.io/v1alpha1")
        );
        assert_eq!(event.type_.as_deref(), Some("Warning"));
        assert_eq!(event.reason.as_deref(), Some("Error"));
        assert_eq!(event.count, Some(1));
    }

    #[test]
    fn test_event_message_appends_error() {
        let err = anyhow::anyhow!("can't get public ip");
        assert_eq!(
            event_message("generator error", Some(&err)),
            "generator error: can't get public ip"
        );
        assert_eq!(event_message("dns record created", None), "dns record created");
    }
}
