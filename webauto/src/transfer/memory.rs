//! In-memory object store with S3 ETag semantics.

use super::{ObjectPage, ObjectStore, RemoteObject, UploadRequest};
use crate::sync::fingerprint::fingerprint_reader;
use crate::utils::errors::{Result, WebautoError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use tokio::sync::RwLock;

/// ETag S3 reports for a zero-byte object
const EMPTY_ETAG: &str = "\"d41d8cd98f00b204e9800998ecf8427e\"";

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub etag: String,
    pub content_type: String,
}

#[derive(Default)]
struct State {
    buckets: HashMap<String, BTreeMap<String, StoredObject>>,
    uploads: Vec<String>,
    listing_calls: usize,
    failing_keys: HashSet<String>,
    fail_listing: bool,
}

/// Objects held in memory, listed in key order `page_size` at a time.
pub struct MemoryStore {
    page_size: usize,
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(1000)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            state: RwLock::new(State::default()),
        }
    }

    /// Store an object directly, as if another client had written it.
    pub async fn insert(&self, bucket: &str, key: &str, body: Vec<u8>, etag: &str) {
        let mut state = self.state.write().await;
        state.buckets.entry(bucket.to_string()).or_default().insert(
            key.to_string(),
            StoredObject {
                body,
                etag: etag.to_string(),
                content_type: "application/octet-stream".to_string(),
            },
        );
    }

    pub async fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        let state = self.state.read().await;
        state.buckets.get(bucket)?.get(key).cloned()
    }

    pub async fn keys(&self, bucket: &str) -> Vec<String> {
        let state = self.state.read().await;
        state
            .buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Keys uploaded so far, in completion order
    pub async fn uploads(&self) -> Vec<String> {
        self.state.read().await.uploads.clone()
    }

    pub async fn clear_uploads(&self) {
        self.state.write().await.uploads.clear();
    }

    pub async fn listing_calls(&self) -> usize {
        self.state.read().await.listing_calls
    }

    /// Make every upload of `key` fail.
    pub async fn fail_uploads_of(&self, key: &str) {
        self.state.write().await.failing_keys.insert(key.to_string());
    }

    /// Make every listing call fail.
    pub async fn fail_listing(&self) {
        self.state.write().await.fail_listing = true;
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_objects_page(
        &self,
        bucket: &str,
        continuation: Option<String>,
    ) -> Result<ObjectPage> {
        let mut state = self.state.write().await;
        state.listing_calls += 1;

        if state.fail_listing {
            return Err(WebautoError::RemoteListing {
                bucket: bucket.to_string(),
                message: "listing disabled".to_string(),
            });
        }

        let Some(objects) = state.buckets.get(bucket) else {
            return Ok(ObjectPage::default());
        };

        let start = match &continuation {
            Some(after) => Bound::Excluded(after.clone()),
            None => Bound::Unbounded,
        };

        let mut page: Vec<RemoteObject> = objects
            .range((start, Bound::Unbounded))
            .take(self.page_size + 1)
            .map(|(key, object)| RemoteObject {
                key: key.clone(),
                etag: Some(object.etag.clone()),
                size: object.body.len() as u64,
            })
            .collect();

        let next_continuation = if page.len() > self.page_size {
            page.truncate(self.page_size);
            page.last().map(|o| o.key.clone())
        } else {
            None
        };

        Ok(ObjectPage {
            objects: page,
            next_continuation,
        })
    }

    async fn upload(&self, request: &UploadRequest) -> Result<()> {
        if self.state.read().await.failing_keys.contains(&request.key) {
            return Err(WebautoError::RemoteWrite {
                key: request.key.clone(),
                message: "upload rejected".to_string(),
            });
        }

        let body = tokio::fs::read(&request.path)
            .await
            .map_err(|e| WebautoError::local_read(&request.path, e))?;

        let etag = fingerprint_reader(&body[..], request.chunk_size)?
            .map(String::from)
            .unwrap_or_else(|| EMPTY_ETAG.to_string());

        let mut state = self.state.write().await;
        state.buckets.entry(request.bucket.clone()).or_default().insert(
            request.key.clone(),
            StoredObject {
                body,
                etag,
                content_type: request.content_type.clone(),
            },
        );
        state.uploads.push(request.key.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pages_cover_all_keys() {
        let store = MemoryStore::with_page_size(2);
        for key in ["a", "b", "c", "d", "e"] {
            store.insert("site", key, vec![], EMPTY_ETAG).await;
        }

        let mut seen = Vec::new();
        let mut continuation = None;
        loop {
            let page = store.list_objects_page("site", continuation).await.unwrap();
            assert!(page.objects.len() <= 2);
            seen.extend(page.objects.into_iter().map(|o| o.key));
            continuation = page.next_continuation;
            if continuation.is_none() {
                break;
            }
        }

        assert_eq!(seen, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(store.listing_calls().await, 3);
    }

    #[tokio::test]
    async fn test_unknown_bucket_lists_empty() {
        let store = MemoryStore::new();
        let page = store.list_objects_page("missing", None).await.unwrap();
        assert!(page.objects.is_empty());
        assert!(page.next_continuation.is_none());
    }
}
