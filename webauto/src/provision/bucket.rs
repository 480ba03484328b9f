//! Bucket provisioning for static site hosting.

use super::endpoints::{get_endpoint, DEFAULT_REGION};
use super::provision_error;
use crate::config::WebsiteConfig;
use crate::transfer::{ObjectStore, RemoteObject, S3Store};
use crate::utils::errors::{Result, WebautoError};
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, ErrorDocument, IndexDocument,
    WebsiteConfiguration,
};
use tracing::{info, warn};

pub struct BucketManager {
    store: S3Store,
    region: Option<String>,
}

impl BucketManager {
    pub fn new(store: S3Store, region: Option<String>) -> Self {
        Self { store, region }
    }

    /// Names of every bucket the credentials can see
    pub async fn all_buckets(&self) -> Result<Vec<String>> {
        let response = self
            .store
            .client()
            .list_buckets()
            .send()
            .await
            .map_err(|e| provision_error("listing buckets", e.into_service_error()))?;

        Ok(response
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(String::from))
            .collect())
    }

    /// Every object in `bucket`, across all listing pages
    pub async fn all_objects(&self, bucket: &str) -> Result<Vec<RemoteObject>> {
        let mut objects = Vec::new();
        let mut continuation = None;
        loop {
            let page = self.store.list_objects_page(bucket, continuation).await?;
            objects.extend(page.objects);
            continuation = page.next_continuation;
            if continuation.is_none() {
                break;
            }
        }
        Ok(objects)
    }

    /// Create `bucket`, or reuse it when this account already owns it.
    pub async fn init_bucket(&self, bucket: &str) -> Result<()> {
        let mut request = self.store.client().create_bucket().bucket(bucket);

        // us-east-1 rejects an explicit location constraint
        if let Some(region) = self.region.as_deref().filter(|r| *r != DEFAULT_REGION) {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                info!("Created bucket {}", bucket);
                Ok(())
            }
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_bucket_already_owned_by_you() {
                    info!("Reusing bucket {}", bucket);
                    Ok(())
                } else {
                    Err(provision_error(&format!("creating bucket {bucket}"), service_error))
                }
            }
        }
    }

    /// Allow anonymous `s3:GetObject` on every object in the bucket.
    pub async fn set_policy(&self, bucket: &str) -> Result<()> {
        // New buckets block public policies; lift that before attaching one
        if let Err(e) = self
            .store
            .client()
            .delete_public_access_block()
            .bucket(bucket)
            .send()
            .await
        {
            warn!(
                "Could not remove public access block on {}: {}",
                bucket,
                e.into_service_error()
            );
        }

        let policy = public_read_policy(bucket)?;
        self.store
            .client()
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy)
            .send()
            .await
            .map_err(|e| provision_error(&format!("setting policy on {bucket}"), e.into_service_error()))?;

        info!("Public read policy set on {}", bucket);
        Ok(())
    }

    /// Enable static website hosting with the configured documents.
    pub async fn configure_website(&self, bucket: &str, website: &WebsiteConfig) -> Result<()> {
        let index = IndexDocument::builder()
            .suffix(&website.index_document)
            .build()
            .map_err(|e| provision_error("building index document", e))?;
        let error = ErrorDocument::builder()
            .key(&website.error_document)
            .build()
            .map_err(|e| provision_error("building error document", e))?;

        self.store
            .client()
            .put_bucket_website()
            .bucket(bucket)
            .website_configuration(
                WebsiteConfiguration::builder()
                    .index_document(index)
                    .error_document(error)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| provision_error(&format!("configuring website on {bucket}"), e.into_service_error()))?;

        info!(
            "Website hosting enabled on {} (index: {}, error: {})",
            bucket, website.index_document, website.error_document
        );
        Ok(())
    }

    /// Region the bucket lives in
    pub async fn get_region(&self, bucket: &str) -> Result<String> {
        let response = self
            .store
            .client()
            .get_bucket_location()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| provision_error(&format!("locating bucket {bucket}"), e.into_service_error()))?;

        Ok(region_from_constraint(
            response.location_constraint().map(|c| c.as_str()),
        ))
    }

    /// Public website URL of the bucket
    pub async fn get_bucket_url(&self, bucket: &str) -> Result<String> {
        let region = self.get_region(bucket).await?;
        website_url(bucket, &region)
    }
}

/// An empty or missing location constraint means us-east-1.
pub fn region_from_constraint(constraint: Option<&str>) -> String {
    match constraint {
        Some(region) if !region.is_empty() => region.to_string(),
        _ => DEFAULT_REGION.to_string(),
    }
}

pub fn website_url(bucket: &str, region: &str) -> Result<String> {
    let endpoint = get_endpoint(region).ok_or_else(|| {
        WebautoError::Provision(format!("no website endpoint known for region {region}"))
    })?;
    Ok(format!("http://{}.{}", bucket, endpoint.host))
}

pub fn public_read_policy(bucket: &str) -> Result<String> {
    let policy = serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Sid": "PublicReadGetObject",
            "Effect": "Allow",
            "Principal": "*",
            "Action": ["s3:GetObject"],
            "Resource": [format!("arn:aws:s3:::{bucket}/*")]
        }]
    });
    Ok(serde_json::to_string(&policy)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_targets_bucket_objects() {
        let policy: serde_json::Value =
            serde_json::from_str(&public_read_policy("example.com").unwrap()).unwrap();
        let statement = &policy["Statement"][0];
        assert_eq!(statement["Effect"], "Allow");
        assert_eq!(statement["Principal"], "*");
        assert_eq!(statement["Action"][0], "s3:GetObject");
        assert_eq!(statement["Resource"][0], "arn:aws:s3:::example.com/*");
    }

    #[test]
    fn test_region_from_constraint() {
        assert_eq!(region_from_constraint(None), "us-east-1");
        assert_eq!(region_from_constraint(Some("")), "us-east-1");
        assert_eq!(region_from_constraint(Some("eu-west-2")), "eu-west-2");
    }

    #[test]
    fn test_website_url() {
        assert_eq!(
            website_url("blog.example.com", "us-east-1").unwrap(),
            "http://blog.example.com.s3-website-us-east-1.amazonaws.com"
        );
        assert_eq!(
            website_url("site", "eu-central-1").unwrap(),
            "http://site.s3-website.eu-central-1.amazonaws.com"
        );
        assert!(website_url("site", "nowhere-1").is_err());
    }
}
