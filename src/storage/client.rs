use super::{public_url, StorageService};
use crate::{Error, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region, RequestChecksumCalculation};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{types::ObjectCannedAcl, Client as S3Client};

pub struct StorageClient {
    client: S3Client,
    bucket: String,
    public_base_url: String,
}

impl StorageClient {
    pub async fn new(
        access_key_id: String,
        secret_access_key: String,
        endpoint: String,
        bucket: String,
        public_base_url: String,
    ) -> Result<Self> {
        let credentials =
            Credentials::new(access_key_id, secret_access_key, None, None, "storage-hmac");

        // GCS interop ignores the region but SigV4 still needs one
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new("auto"))
            .endpoint_url(endpoint)
            .load()
            .await;

        // Bucket names like `project.appspot.com` contain dots, so no virtual hosts.
        // GCS rejects the flexible checksum headers the SDK sends by default.
        let config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(true)
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .build();

        Ok(Self {
            client: S3Client::from_conf(config),
            bucket,
            public_base_url,
        })
    }
}

#[async_trait]
impl StorageService for StorageClient {
    async fn upload_public(&self, key: &str, data: &[u8], content_type: &str) -> Result<String> {
        let body = ByteStream::from(data.to_vec());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("Failed to upload {}: {}", key, e)))?;

        let url = public_url(&self.public_base_url, &self.bucket, key);
        tracing::info!("Uploaded {} ({} bytes) to {}", key, data.len(), url);
        Ok(url)
    }
}
