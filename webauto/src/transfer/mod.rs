//! Transfer executor: the object store seam used by the sync engine.
//!
//! `S3Store` talks to S3 (or an S3-compatible endpoint) through the AWS SDK.
//! `MemoryStore` keeps objects in memory and reports S3-style ETags, which is
//! enough to drive a full sync without network access.

pub mod content_type;
pub mod memory;
pub mod s3;

pub use memory::MemoryStore;
pub use s3::S3Store;

use crate::utils::errors::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// A listed object: its key and ETag exactly as the store reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub key: String,
    pub etag: Option<String>,
    pub size: u64,
}

/// One page of a bucket listing
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub objects: Vec<RemoteObject>,
    /// Token for the next page; None once the listing is exhausted
    pub next_continuation: Option<String>,
}

/// A single file transfer
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub bucket: String,
    pub key: String,
    pub path: PathBuf,
    pub size: u64,
    pub content_type: String,
    /// Multipart threshold and part size
    pub chunk_size: usize,
}

impl UploadRequest {
    /// Uploads larger than one chunk go through the multipart API.
    pub fn is_multipart(&self) -> bool {
        self.size > self.chunk_size as u64
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Fetch one page of the bucket listing, starting at `continuation`.
    async fn list_objects_page(
        &self,
        bucket: &str,
        continuation: Option<String>,
    ) -> Result<ObjectPage>;

    /// Upload a local file, multipart when it exceeds `chunk_size`.
    async fn upload(&self, request: &UploadRequest) -> Result<()>;

    fn name(&self) -> &'static str;
}
