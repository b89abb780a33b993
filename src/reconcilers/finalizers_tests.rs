// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `finalizers.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{DNSRecord, DNSRecordSpec, RecordType};
    use crate::labels::FINALIZER_DNS_RECORD;
    use crate::reconcilers::finalizers::{
        ensure_finalizer, finalizers_with, finalizers_without, has_finalizer, remove_finalizer,
    };
    use kube::Client;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RECORD_PATH: &str =
        "/apis/dnsmanager.firestoned.io/v1alpha1/namespaces/web/dnsrecords/app-example-com";

    fn record(finalizers: &[&str]) -> DNSRecord {
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
        if !finalizers.is_empty() {
            record.metadata.finalizers =
                Some(finalizers.iter().map(ToString::to_string).collect());
        }
        record
    }

    fn client(server: &MockServer) -> Client {
        Client::try_from(kube::Config::new(server.uri().parse().unwrap())).unwrap()
    }

    fn echo(record: &DNSRecord) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::to_value(record).unwrap())
    }

    #[test]
    fn test_has_finalizer() {
        assert!(!has_finalizer(&record(&[]), FINALIZER_DNS_RECORD));
        assert!(has_finalizer(
            &record(&["other", FINALIZER_DNS_RECORD]),
            FINALIZER_DNS_RECORD
        ));
    }

    #[test]
    fn test_finalizers_with_keeps_existing_entries() {
        assert_eq!(
            finalizers_with(&record(&["other"]), FINALIZER_DNS_RECORD),
            Some(vec!["other".to_string(), FINALIZER_DNS_RECORD.to_string()])
        );
        assert_eq!(
            finalizers_with(&record(&[FINALIZER_DNS_RECORD]), FINALIZER_DNS_RECORD),
            None
        );
    }

    #[test]
    fn test_finalizers_without_only_drops_ours() {
        assert_eq!(
            finalizers_without(&record(&["other", FINALIZER_DNS_RECORD]), FINALIZER_DNS_RECORD),
            Some(vec!["other".to_string()])
        );
        assert_eq!(finalizers_without(&record(&[]), FINALIZER_DNS_RECORD), None);
    }

    #[tokio::test]
    async fn test_ensure_finalizer_patches_once() {
        let server = MockServer::start().await;
        let with = record(&[FINALIZER_DNS_RECORD]);
        Mock::given(method("PATCH"))
            .and(path(RECORD_PATH))
            .and(body_json(json!({ "metadata": { "finalizers": [FINALIZER_DNS_RECORD] } })))
            .respond_with(echo(&with))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        ensure_finalizer(&client, &record(&[]), FINALIZER_DNS_RECORD)
            .await
            .unwrap();
        ensure_finalizer(&client, &with, FINALIZER_DNS_RECORD)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_remove_finalizer_patches_remaining_list() {
        let server = MockServer::start().await;
        let remaining = record(&["other"]);
        Mock::given(method("PATCH"))
            .and(path(RECORD_PATH))
            .and(body_json(json!({ "metadata": { "finalizers": ["other"] } })))
            .respond_with(echo(&remaining))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        remove_finalizer(&client, &record(&["other", FINALIZER_DNS_RECORD]), FINALIZER_DNS_RECORD)
            .await
            .unwrap();
        remove_finalizer(&client, &remaining, FINALIZER_DNS_RECORD)
            .await
            .unwrap();
    }
}
