//! AWS clients shared by every command.
//!
//! Built once at startup from the `[aws]` section and the `--profile` flag,
//! then handed to each manager by reference.

use crate::config::AwsConfig;
use crate::provision::{BucketManager, CertificateManager, DistributionManager, DomainManager};
use crate::transfer::S3Store;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_s3::config::Region;

/// CloudFront only accepts ACM certificates issued in this region.
const CLOUDFRONT_CERT_REGION: &str = "us-east-1";

pub struct AwsContext {
    sdk_config: SdkConfig,
    s3: aws_sdk_s3::Client,
}

impl AwsContext {
    pub async fn load(aws: &AwsConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(profile) = &aws.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = &aws.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let mut s3_config = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &aws.endpoint_url {
            s3_config = s3_config.endpoint_url(endpoint).force_path_style(true);
        }
        let s3 = aws_sdk_s3::Client::from_conf(s3_config.build());

        tracing::debug!(
            "AWS context loaded (profile: {}, region: {})",
            aws.profile.as_deref().unwrap_or("default"),
            sdk_config.region().map(|r| r.as_ref()).unwrap_or("unset")
        );

        Self { sdk_config, s3 }
    }

    /// Region the session resolved to, if any
    pub fn region(&self) -> Option<&str> {
        self.sdk_config.region().map(|r| r.as_ref())
    }

    pub fn store(&self) -> S3Store {
        S3Store::new(self.s3.clone())
    }

    pub fn bucket_manager(&self) -> BucketManager {
        BucketManager::new(self.store(), self.region().map(String::from))
    }

    pub fn domain_manager(&self) -> DomainManager {
        DomainManager::new(aws_sdk_route53::Client::new(&self.sdk_config))
    }

    pub fn certificate_manager(&self) -> CertificateManager {
        let config = aws_sdk_acm::config::Builder::from(&self.sdk_config)
            .region(aws_sdk_acm::config::Region::from_static(CLOUDFRONT_CERT_REGION))
            .build();
        CertificateManager::new(aws_sdk_acm::Client::from_conf(config))
    }

    pub fn distribution_manager(&self) -> DistributionManager {
        DistributionManager::new(aws_sdk_cloudfront::Client::new(&self.sdk_config))
    }
}
