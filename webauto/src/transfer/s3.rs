//! S3 implementation of the object store.

use super::{ObjectPage, ObjectStore, RemoteObject, UploadRequest};
use crate::utils::errors::{Result, WebautoError};
use async_trait::async_trait;
use aws_sdk_s3::primitives::{ByteStream, Length};
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn put_single(&self, request: &UploadRequest) -> Result<()> {
        let body = ByteStream::from_path(&request.path)
            .await
            .map_err(|e| write_error(request, e))?;

        self.client
            .put_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .content_type(&request.content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| write_error(request, e.into_service_error()))?;

        Ok(())
    }

    async fn put_multipart(&self, request: &UploadRequest) -> Result<()> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(&request.bucket)
            .key(&request.key)
            .content_type(&request.content_type)
            .send()
            .await
            .map_err(|e| write_error(request, e.into_service_error()))?;

        let upload_id = created
            .upload_id()
            .ok_or_else(|| write_error(request, "no upload id returned"))?
            .to_string();

        match self.upload_parts(request, &upload_id).await {
            Ok(parts) => {
                self.client
                    .complete_multipart_upload()
                    .bucket(&request.bucket)
                    .key(&request.key)
                    .upload_id(&upload_id)
                    .multipart_upload(
                        CompletedMultipartUpload::builder()
                            .set_parts(Some(parts))
                            .build(),
                    )
                    .send()
                    .await
                    .map_err(|e| write_error(request, e.into_service_error()))?;
                Ok(())
            }
            Err(e) => {
                let aborted = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&request.bucket)
                    .key(&request.key)
                    .upload_id(&upload_id)
                    .send()
                    .await;
                if let Err(abort_err) = aborted {
                    warn!(
                        "Failed to abort multipart upload {} for {}: {}",
                        upload_id,
                        request.key,
                        abort_err.into_service_error()
                    );
                }
                Err(e)
            }
        }
    }

    async fn upload_parts(
        &self,
        request: &UploadRequest,
        upload_id: &str,
    ) -> Result<Vec<CompletedPart>> {
        let chunk = request.chunk_size as u64;
        let part_count = request.size.div_ceil(chunk);
        let mut parts = Vec::with_capacity(part_count as usize);

        for index in 0..part_count {
            let offset = index * chunk;
            let length = chunk.min(request.size - offset);
            // Part numbers are 1-based
            let part_number = (index + 1) as i32;

            let body = ByteStream::read_from()
                .path(&request.path)
                .offset(offset)
                .length(Length::Exact(length))
                .build()
                .await
                .map_err(|e| write_error(request, e))?;

            let uploaded = self
                .client
                .upload_part()
                .bucket(&request.bucket)
                .key(&request.key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(body)
                .send()
                .await
                .map_err(|e| write_error(request, e.into_service_error()))?;

            debug!("Uploaded part {}/{} of {}", part_number, part_count, request.key);

            parts.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .set_e_tag(uploaded.e_tag().map(String::from))
                    .build(),
            );
        }

        Ok(parts)
    }
}

fn write_error(request: &UploadRequest, err: impl std::fmt::Display) -> WebautoError {
    WebautoError::RemoteWrite {
        key: request.key.clone(),
        message: err.to_string(),
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_objects_page(
        &self,
        bucket: &str,
        continuation: Option<String>,
    ) -> Result<ObjectPage> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .set_continuation_token(continuation)
            .send()
            .await
            .map_err(|e| WebautoError::RemoteListing {
                bucket: bucket.to_string(),
                message: e.into_service_error().to_string(),
            })?;

        let objects = response
            .contents()
            .iter()
            .filter_map(|object| {
                Some(RemoteObject {
                    key: object.key()?.to_string(),
                    etag: object.e_tag().map(String::from),
                    size: object.size().unwrap_or(0).max(0) as u64,
                })
            })
            .collect();

        let next_continuation = if response.is_truncated().unwrap_or(false) {
            response.next_continuation_token().map(String::from)
        } else {
            None
        };

        Ok(ObjectPage {
            objects,
            next_continuation,
        })
    }

    async fn upload(&self, request: &UploadRequest) -> Result<()> {
        if request.is_multipart() {
            self.put_multipart(request).await?;
        } else {
            self.put_single(request).await?;
        }

        info!(
            "Uploaded {} bytes to s3://{}/{} ({})",
            request.size, request.bucket, request.key, request.content_type
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}
