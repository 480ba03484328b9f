//! Manifest of the objects already in the target bucket.
//!
//! A manifest maps every object key to the ETag S3 reports for it. It is
//! loaded once per sync by draining the paginated listing, then only read.

use crate::sync::fingerprint::Fingerprint;
use crate::transfer::ObjectStore;
use crate::utils::errors::Result;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct Manifest {
    bucket: String,
    files: HashMap<String, String>,
}

impl Manifest {
    /// List every object in `bucket`. Any listing error aborts the load.
    pub async fn load(store: &dyn ObjectStore, bucket: &str) -> Result<Self> {
        let mut files = HashMap::new();
        let mut continuation = None;
        let mut pages = 0usize;

        loop {
            let page = store.list_objects_page(bucket, continuation).await?;
            pages += 1;

            for object in page.objects {
                if let Some(etag) = object.etag {
                    files.insert(object.key, etag);
                }
            }

            continuation = page.next_continuation;
            if continuation.is_none() {
                break;
            }
        }

        debug!("Loaded manifest for {}: {} objects in {} pages", bucket, files.len(), pages);

        Ok(Self {
            bucket: bucket.to_string(),
            files,
        })
    }

    pub fn from_entries<I, K, V>(bucket: &str, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            bucket: bucket.to_string(),
            files: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Stored ETag for `key`, quotes included
    pub fn get(&self, key: &str) -> Option<&str> {
        self.files.get(key).map(String::as_str)
    }

    /// True only when a fingerprint exists and equals the stored ETag exactly.
    pub fn matches(&self, key: &str, fingerprint: Option<&Fingerprint>) -> bool {
        match (fingerprint, self.get(key)) {
            (Some(fp), Some(etag)) => fp.as_str() == etag,
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}
