//! Route 53 hosted zones and alias records.

use super::endpoints::Endpoint;
use super::provision_error;
use crate::utils::errors::Result;
use aws_sdk_route53::types::{
    AliasTarget, Change, ChangeAction, ChangeBatch, ResourceRecordSet, RrType,
};
use aws_sdk_route53::Client;
use tracing::info;

/// Hosted zone id AWS uses for every CloudFront alias target
pub const CLOUDFRONT_ZONE_ID: &str = "Z2FDTNDATAQYW2";

const RECORD_COMMENT: &str = "Created by webauto";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedZone {
    pub id: String,
    /// Zone name as Route 53 reports it, trailing dot included
    pub name: String,
}

pub struct DomainManager {
    client: Client,
}

impl DomainManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// First hosted zone whose name is a suffix of `domain_name`.
    pub async fn find_hosted_zone(&self, domain_name: &str) -> Result<Option<HostedZone>> {
        let mut marker: Option<String> = None;
        loop {
            let response = self
                .client
                .list_hosted_zones()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| provision_error("listing hosted zones", e.into_service_error()))?;

            for zone in response.hosted_zones() {
                if zone_matches(zone.name(), domain_name) {
                    return Ok(Some(HostedZone {
                        id: zone.id().to_string(),
                        name: zone.name().to_string(),
                    }));
                }
            }

            if !response.is_truncated() {
                return Ok(None);
            }
            marker = response.next_marker().map(String::from);
            if marker.is_none() {
                return Ok(None);
            }
        }
    }

    /// Create a hosted zone for the registrable part of `domain_name`.
    pub async fn create_hosted_zone(&self, domain_name: &str) -> Result<HostedZone> {
        let zone_name = zone_name_for(domain_name);
        let response = self
            .client
            .create_hosted_zone()
            .name(&zone_name)
            .caller_reference(uuid::Uuid::new_v4().to_string())
            .send()
            .await
            .map_err(|e| provision_error(&format!("creating hosted zone {zone_name}"), e.into_service_error()))?;

        let zone = response
            .hosted_zone()
            .ok_or_else(|| provision_error("creating hosted zone", "no zone returned"))?;

        info!("Created hosted zone {} ({})", zone.name(), zone.id());
        Ok(HostedZone {
            id: zone.id().to_string(),
            name: zone.name().to_string(),
        })
    }

    /// Existing zone for the domain, or a new one.
    pub async fn find_or_create_hosted_zone(&self, domain_name: &str) -> Result<HostedZone> {
        match self.find_hosted_zone(domain_name).await? {
            Some(zone) => Ok(zone),
            None => self.create_hosted_zone(domain_name).await,
        }
    }

    /// Point `domain_name` at an S3 website endpoint.
    pub async fn create_s3_domain_record(
        &self,
        zone: &HostedZone,
        domain_name: &str,
        endpoint: &Endpoint,
    ) -> Result<String> {
        self.upsert_alias(zone, domain_name, endpoint.zone, endpoint.host)
            .await
    }

    /// Point `domain_name` at a CloudFront distribution.
    pub async fn create_cf_domain_record(
        &self,
        zone: &HostedZone,
        domain_name: &str,
        cf_domain: &str,
    ) -> Result<String> {
        self.upsert_alias(zone, domain_name, CLOUDFRONT_ZONE_ID, cf_domain)
            .await
    }

    async fn upsert_alias(
        &self,
        zone: &HostedZone,
        domain_name: &str,
        target_zone: &str,
        target_dns: &str,
    ) -> Result<String> {
        let batch = alias_change_batch(domain_name, target_zone, target_dns)?;

        let response = self
            .client
            .change_resource_record_sets()
            .hosted_zone_id(&zone.id)
            .change_batch(batch)
            .send()
            .await
            .map_err(|e| provision_error(&format!("upserting record {domain_name}"), e.into_service_error()))?;

        let change_id = response
            .change_info()
            .map(|info| info.id().to_string())
            .unwrap_or_default();

        info!("Upserted A alias {} -> {} ({})", domain_name, target_dns, change_id);
        Ok(change_id)
    }
}

/// UPSERT of a single A alias record
pub fn alias_change_batch(domain_name: &str, target_zone: &str, target_dns: &str) -> Result<ChangeBatch> {
    let alias = AliasTarget::builder()
        .hosted_zone_id(target_zone)
        .dns_name(target_dns)
        .evaluate_target_health(false)
        .build()
        .map_err(|e| provision_error("building alias target", e))?;

    let record = ResourceRecordSet::builder()
        .name(domain_name)
        .r#type(RrType::A)
        .alias_target(alias)
        .build()
        .map_err(|e| provision_error("building record set", e))?;

    let change = Change::builder()
        .action(ChangeAction::Upsert)
        .resource_record_set(record)
        .build()
        .map_err(|e| provision_error("building change", e))?;

    ChangeBatch::builder()
        .comment(RECORD_COMMENT)
        .changes(change)
        .build()
        .map_err(|e| provision_error("building change batch", e))
}

/// Zone names from Route 53 carry a trailing dot.
pub fn zone_matches(zone_name: &str, domain_name: &str) -> bool {
    let zone = zone_name.trim_end_matches('.');
    !zone.is_empty() && domain_name.ends_with(zone)
}

/// Last two labels of the domain: `blog.example.com` -> `example.com`
pub fn zone_name_for(domain_name: &str) -> String {
    let labels: Vec<&str> = domain_name.trim_end_matches('.').split('.').collect();
    let start = labels.len().saturating_sub(2);
    labels[start..].join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_matches_suffix() {
        assert!(zone_matches("example.com.", "blog.example.com"));
        assert!(zone_matches("example.com.", "example.com"));
        assert!(!zone_matches("example.org.", "blog.example.com"));
        assert!(!zone_matches(".", "example.com"));
    }

    #[test]
    fn test_zone_name_for() {
        assert_eq!(zone_name_for("blog.example.com"), "example.com");
        assert_eq!(zone_name_for("a.b.example.com"), "example.com");
        assert_eq!(zone_name_for("example.com"), "example.com");
        assert_eq!(zone_name_for("localhost"), "localhost");
    }

    #[test]
    fn test_alias_change_batch() {
        let batch = alias_change_batch("blog.example.com", CLOUDFRONT_ZONE_ID, "d111.cloudfront.net").unwrap();
        assert_eq!(batch.comment(), Some(RECORD_COMMENT));

        assert_eq!(batch.changes().len(), 1);

        let debug = format!("{batch:?}");
        assert!(debug.contains("Upsert"));
        assert!(debug.contains("blog.example.com"));
        assert!(debug.contains(CLOUDFRONT_ZONE_ID));
        assert!(debug.contains("d111.cloudfront.net"));
    }
}
