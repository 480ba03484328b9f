//! CloudFront distributions in front of a website bucket.

use super::provision_error;
use crate::utils::errors::Result;
use aws_sdk_cloudfront::types::{
    Aliases, CookiePreference, DefaultCacheBehavior, DistributionConfig, ForwardedValues, Headers,
    ItemSelection, MinimumProtocolVersion, Origin, Origins, QueryStringCacheKeys, S3OriginConfig,
    SslSupportMethod, TrustedSigners, ViewerCertificate, ViewerProtocolPolicy,
};
use aws_sdk_cloudfront::client::Waiters;
use aws_sdk_cloudfront::Client;
use std::time::Duration;
use tracing::info;

/// 50 polls 30 seconds apart
const DEPLOY_MAX_WAIT: Duration = Duration::from_secs(50 * 30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    pub id: String,
    pub domain_name: String,
    pub status: String,
}

pub struct DistributionManager {
    client: Client,
}

impl DistributionManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Distribution that already serves `domain_name` as an alias
    pub async fn find_matching_dist(&self, domain_name: &str) -> Result<Option<Distribution>> {
        let mut marker: Option<String> = None;
        loop {
            let response = self
                .client
                .list_distributions()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| provision_error("listing distributions", e.into_service_error()))?;

            let Some(list) = response.distribution_list() else {
                return Ok(None);
            };

            for dist in list.items() {
                let aliased = dist
                    .aliases()
                    .map(|a| a.items().iter().any(|alias| alias == domain_name))
                    .unwrap_or(false);
                if aliased {
                    return Ok(Some(Distribution {
                        id: dist.id().to_string(),
                        domain_name: dist.domain_name().to_string(),
                        status: dist.status().to_string(),
                    }));
                }
            }

            if !list.is_truncated() {
                return Ok(None);
            }
            marker = list.next_marker().map(String::from);
            if marker.is_none() {
                return Ok(None);
            }
        }
    }

    /// Create a distribution for `domain_name` backed by `bucket`.
    pub async fn create_dist(&self, domain_name: &str, bucket: &str, cert_arn: &str) -> Result<Distribution> {
        let config = distribution_config(domain_name, bucket, cert_arn, &uuid::Uuid::new_v4().to_string())?;

        let response = self
            .client
            .create_distribution()
            .distribution_config(config)
            .send()
            .await
            .map_err(|e| provision_error(&format!("creating distribution for {domain_name}"), e.into_service_error()))?;

        let dist = response
            .distribution()
            .ok_or_else(|| provision_error("creating distribution", "no distribution returned"))?;

        info!("Created distribution {} ({})", dist.id(), dist.domain_name());
        Ok(Distribution {
            id: dist.id().to_string(),
            domain_name: dist.domain_name().to_string(),
            status: dist.status().to_string(),
        })
    }

    /// Wait until the distribution reports `Deployed`.
    pub async fn await_deploy(&self, dist: &Distribution) -> Result<()> {
        info!(
            "Waiting up to {}s for distribution {} to deploy",
            DEPLOY_MAX_WAIT.as_secs(),
            dist.id
        );

        self.client
            .wait_until_distribution_deployed()
            .id(&dist.id)
            .wait(DEPLOY_MAX_WAIT)
            .await
            .map_err(|e| provision_error(&format!("waiting for distribution {}", dist.id), e))?;

        info!("Distribution {} deployed", dist.id);
        Ok(())
    }
}

/// HTTPS-only distribution with one S3 origin and one alias
pub fn distribution_config(
    domain_name: &str,
    bucket: &str,
    cert_arn: &str,
    caller_reference: &str,
) -> Result<DistributionConfig> {
    let origin_id = format!("S3-{bucket}");

    let origin = Origin::builder()
        .id(&origin_id)
        .domain_name(format!("{bucket}.s3.amazonaws.com"))
        .s3_origin_config(
            S3OriginConfig::builder()
                .origin_access_identity("")
                .build(),
        )
        .build()
        .map_err(|e| provision_error("building origin", e))?;

    let forwarded_values = ForwardedValues::builder()
        .query_string(false)
        .cookies(
            CookiePreference::builder()
                .forward(ItemSelection::from("all"))
                .build()
                .map_err(|e| provision_error("building cookie preference", e))?,
        )
        .headers(
            Headers::builder()
                .quantity(0)
                .build()
                .map_err(|e| provision_error("building headers", e))?,
        )
        .query_string_cache_keys(
            QueryStringCacheKeys::builder()
                .quantity(0)
                .build()
                .map_err(|e| provision_error("building query string cache keys", e))?,
        )
        .build()
        .map_err(|e| provision_error("building forwarded values", e))?;

    let cache_behavior = DefaultCacheBehavior::builder()
        .target_origin_id(&origin_id)
        .viewer_protocol_policy(ViewerProtocolPolicy::from("redirect-to-https"))
        .trusted_signers(
            TrustedSigners::builder()
                .enabled(false)
                .quantity(0)
                .build()
                .map_err(|e| provision_error("building trusted signers", e))?,
        )
        .forwarded_values(forwarded_values)
        .default_ttl(86400)
        .min_ttl(3600)
        .build()
        .map_err(|e| provision_error("building cache behavior", e))?;

    DistributionConfig::builder()
        .caller_reference(caller_reference)
        .aliases(
            Aliases::builder()
                .quantity(1)
                .items(domain_name)
                .build()
                .map_err(|e| provision_error("building aliases", e))?,
        )
        .default_root_object("index.html")
        .comment("Created by webauto")
        .enabled(true)
        .origins(
            Origins::builder()
                .quantity(1)
                .items(origin)
                .build()
                .map_err(|e| provision_error("building origins", e))?,
        )
        .default_cache_behavior(cache_behavior)
        .viewer_certificate(
            ViewerCertificate::builder()
                .acm_certificate_arn(cert_arn)
                .ssl_support_method(SslSupportMethod::from("sni-only"))
                .minimum_protocol_version(MinimumProtocolVersion::from("TLSv1.2_2021"))
                .build(),
        )
        .build()
        .map_err(|e| provision_error("building distribution config", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribution_config() {
        let config = distribution_config(
            "www.example.com",
            "www.example.com",
            "arn:aws:acm:us-east-1:123456789012:certificate/abc",
            "ref-1",
        )
        .unwrap();

        assert_eq!(config.caller_reference(), "ref-1");
        assert_eq!(config.default_root_object(), Some("index.html"));

        let debug = format!("{config:?}");
        assert!(debug.contains("www.example.com.s3.amazonaws.com"));
        assert!(debug.contains("S3-www.example.com"));
        assert!(debug.contains("arn:aws:acm:us-east-1:123456789012:certificate/abc"));
        assert!(debug.contains("RedirectToHttps") || debug.contains("redirect-to-https"));
    }

    #[test]
    fn test_deploy_wait_budget() {
        assert_eq!(DEPLOY_MAX_WAIT, Duration::from_secs(25 * 60));
    }
}
