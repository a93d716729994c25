//! S3-backed [`ImageStore`].

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_s3::{presigning::PresigningConfig, primitives::ByteStream};
use axum::body::Bytes;

use super::store::{ImageStore, PutOutcome};

/// Longest expiry SigV4 accepts for a presigned request.
pub const MAX_PRESIGN_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub struct S3ImageStore {
    client: aws_sdk_s3::Client,
}

impl S3ImageStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn bucket_exists(&self, bucket: &str) -> anyhow::Result<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let status = err.raw_response().map(|raw| raw.status().as_u16());
                if err.as_service_error().is_some_and(|e| e.is_not_found()) || status == Some(404)
                {
                    Ok(false)
                } else if status == Some(403) {
                    // The bucket is there; the put reports the real failure.
                    tracing::debug!(bucket, "head bucket forbidden; treating bucket as present");
                    Ok(true)
                } else {
                    Err(anyhow::Error::new(err)
                        .context(format!("failed to check bucket {}", bucket)))
                }
            }
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        body: Bytes,
    ) -> anyhow::Result<PutOutcome> {
        let size = body.len();
        let result = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await;

        match result {
            Ok(_) => {
                tracing::info!(bucket, key, size, content_type, "stored object");
                Ok(PutOutcome::Stored)
            }
            Err(err) => match err.raw_response().map(|raw| raw.status().as_u16()) {
                Some(status) => {
                    tracing::warn!(bucket, key, status, error = %err, "object store rejected upload");
                    Ok(PutOutcome::Rejected { status })
                }
                None => Err(anyhow::Error::new(err)
                    .context(format!("failed to upload s3://{}/{}", bucket, key))),
            },
        }
    }

    async fn list_keys(&self, bucket: &str, prefix: &str) -> anyhow::Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token = None;

        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .with_context(|| format!("failed to list s3://{}/{}*", bucket, prefix))?;

            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key().map(ToOwned::to_owned)),
            );

            if page.is_truncated() != Some(true) {
                break;
            }
            match page.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_owned()),
                None => {
                    tracing::warn!(bucket, prefix, "truncated listing without a continuation token");
                    break;
                }
            }
        }

        Ok(keys)
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> anyhow::Result<String> {
        if expires_in > MAX_PRESIGN_EXPIRY {
            tracing::debug!(
                requested_secs = expires_in.as_secs(),
                "presign expiry capped at seven days"
            );
        }
        let config = PresigningConfig::expires_in(expires_in.min(MAX_PRESIGN_EXPIRY))
            .context("invalid presign expiry")?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(config)
            .await
            .with_context(|| format!("failed to presign s3://{}/{}", bucket, key))?;

        Ok(request.uri().to_string())
    }
}
