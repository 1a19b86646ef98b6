use anyhow::Result;
use regex::Regex;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::SubdomainCheckResponse;

/// Subdomains that can never be claimed by a tenant because the platform
/// routes them itself.
const RESERVED_SUBDOMAINS: &[&str] = &[
    "www", "api", "app", "admin", "billing", "dashboard", "docs", "help",
    "mail", "staging", "static", "status", "support",
];

pub struct SubdomainService {
    supabase: SupabaseClient,
}

impl SubdomainService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Shape check only; no network traffic for malformed input.
    pub fn validate_format(subdomain: &str) -> Result<(), String> {
        if subdomain.len() < 3 || subdomain.len() > 40 {
            return Err("Subdomain must be between 3 and 40 characters".to_string());
        }

        let pattern = Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$")
            .expect("subdomain pattern is valid");
        if !pattern.is_match(subdomain) {
            return Err(
                "Subdomain may only contain lowercase letters, digits and hyphens, \
                 and may not start or end with a hyphen"
                    .to_string(),
            );
        }

        if RESERVED_SUBDOMAINS.contains(&subdomain) {
            return Err(format!("Subdomain '{}' is reserved", subdomain));
        }

        Ok(())
    }

    pub async fn check_availability(&self, subdomain: &str) -> Result<SubdomainCheckResponse> {
        let normalized = subdomain.trim().to_lowercase();
        debug!("Checking subdomain availability: {}", normalized);

        if let Err(reason) = Self::validate_format(&normalized) {
            return Ok(SubdomainCheckResponse {
                subdomain: normalized,
                available: false,
                reason: Some(reason),
            });
        }

        let path = format!(
            "/rest/v1/clinics?subdomain=eq.{}&select=id",
            urlencoding::encode(&normalized)
        );
        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await?;

        if existing.is_empty() {
            Ok(SubdomainCheckResponse {
                subdomain: normalized,
                available: true,
                reason: None,
            })
        } else {
            Ok(SubdomainCheckResponse {
                subdomain: normalized,
                available: false,
                reason: Some("Subdomain is already taken".to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_slug() {
        assert!(SubdomainService::validate_format("sunrise-clinic").is_ok());
        assert!(SubdomainService::validate_format("klinik99").is_ok());
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(SubdomainService::validate_format("ab").is_err());
        assert!(SubdomainService::validate_format("-leading").is_err());
        assert!(SubdomainService::validate_format("trailing-").is_err());
        assert!(SubdomainService::validate_format("Upper Case").is_err());
        assert!(SubdomainService::validate_format(&"x".repeat(41)).is_err());
    }

    #[test]
    fn rejects_reserved_names() {
        assert!(SubdomainService::validate_format("www").is_err());
        assert!(SubdomainService::validate_format("admin").is_err());
        assert!(SubdomainService::validate_format("billing").is_err());
    }
}
