use super::{public_url, StorageService};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

#[derive(Clone)]
pub struct MockStorageClient {
    objects: Arc<Mutex<HashMap<String, StoredObject>>>,
    base_url: String,
    bucket: String,
    failure: Option<String>,
    upload_count: Arc<Mutex<usize>>,
}

impl MockStorageClient {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(Mutex::new(HashMap::new())),
            base_url: "https://mock-storage.example.com".to_string(),
            bucket: "mock-bucket".to_string(),
            failure: None,
            upload_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_bucket(mut self, bucket: String) -> Self {
        self.bucket = bucket;
        self
    }

    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn get_upload_count(&self) -> usize {
        *self.upload_count.lock().unwrap()
    }

    pub fn get_objects(&self) -> HashMap<String, StoredObject> {
        self.objects.lock().unwrap().clone()
    }
}

impl Default for MockStorageClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageService for MockStorageClient {
    async fn upload_public(&self, key: &str, data: &[u8], content_type: &str) -> Result<String> {
        let mut count = self.upload_count.lock().unwrap();
        *count += 1;

        if let Some(message) = &self.failure {
            return Err(Error::Storage(message.clone()));
        }

        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(public_url(&self.base_url, &self.bucket, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_storage_upload() {
        let client = MockStorageClient::new();

        let url = client
            .upload_public("character-portraits/U1_1.png", b"png", "image/png")
            .await
            .unwrap();

        assert_eq!(
            url,
            "https://mock-storage.example.com/mock-bucket/character-portraits/U1_1.png"
        );
        assert_eq!(client.get_upload_count(), 1);
        let objects = client.get_objects();
        let stored = &objects["character-portraits/U1_1.png"];
        assert_eq!(stored.data, b"png".to_vec());
        assert_eq!(stored.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_mock_storage_with_custom_base_url() {
        let client = MockStorageClient::new().with_base_url("https://cdn.example.com".to_string());
        let url = client.upload_public("a.png", b"x", "image/png").await.unwrap();
        assert_eq!(url, "https://cdn.example.com/mock-bucket/a.png");

        let client = MockStorageClient::new().with_bucket("party.appspot.com".to_string());
        let url = client.upload_public("a.png", b"x", "image/png").await.unwrap();
        assert_eq!(url, "https://mock-storage.example.com/party.appspot.com/a.png");
    }

    #[tokio::test]
    async fn test_mock_storage_failure() {
        let client = MockStorageClient::new().with_failure("AccessDenied");
        let err = client.upload_public("a.png", b"x", "image/png").await.unwrap_err();

        assert!(matches!(err, Error::Storage(_)));
        assert!(client.get_objects().is_empty());
    }
}
