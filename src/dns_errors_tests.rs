// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for DNS error types.

#[cfg(test)]
mod tests {
    use crate::dns_errors::*;

    #[test]
    fn test_generator_not_found_error() {
        let error = RegistryError::GeneratorNotFound {
            name: "DDNS".to_string(),
        };
        assert_eq!(error.to_string(), "generator not found: DDNS");
    }

    #[test]
    fn test_provider_not_found_error() {
        let error = RegistryError::ProviderNotFound {
            name: "ROUTE53".to_string(),
        };
        assert_eq!(error.to_string(), "provider not found: ROUTE53");
    }

    #[test]
    fn test_missing_credentials_error() {
        let error = ProviderError::MissingCredentials {
            provider: "CLOUDFLARE".to_string(),
            reason: "cloudflare api token or key and email is required".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "cloudflare api token or key and email is required"
        );
    }

    #[test]
    fn test_api_error() {
        let error = ProviderError::Api {
            provider: "ALIYUN".to_string(),
            code: "InvalidAccessKeyId.NotFound".to_string(),
            message: "Specified access key is not found.".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "ALIYUN API error InvalidAccessKeyId.NotFound: Specified access key is not found."
        );
    }

    #[test]
    fn test_zone_not_found_error() {
        let error = ProviderError::ZoneNotFound {
            provider: "CLOUDFLARE".to_string(),
            zone: "example.com".to_string(),
        };
        assert_eq!(error.to_string(), "zone 'example.com' not found on CLOUDFLARE");
    }

    #[test]
    fn test_no_public_ip_error() {
        assert_eq!(GeneratorError::NoPublicIp.to_string(), "can't get public ip");
    }

    #[test]
    fn test_conflict_retries_exhausted_error() {
        let error = StatusError::ConflictRetriesExhausted {
            kind: "DNSRecord".to_string(),
            name: "default/app-example-com".to_string(),
            attempts: 5,
        };
        assert!(error.to_string().contains("after 5 attempts"));
    }

    #[test]
    fn test_errors_convert_into_anyhow() {
        let err: anyhow::Error = GeneratorError::NoPublicIp.into();
        assert!(err.downcast_ref::<GeneratorError>().is_some());
    }
}
