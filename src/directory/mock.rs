use super::DirectoryService;
use crate::ai::SourceImage;
use crate::models::DirectoryUser;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory directory keyed by email.
#[derive(Clone)]
pub struct MockDirectoryClient {
    users: Arc<Mutex<HashMap<String, DirectoryUser>>>,
    avatar: SourceImage,
    lookups: Arc<Mutex<Vec<String>>>,
    downloads: Arc<Mutex<Vec<String>>>,
}

impl MockDirectoryClient {
    pub fn new() -> Self {
        Self {
            users: Arc::new(Mutex::new(HashMap::new())),
            avatar: SourceImage {
                bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
                mime_type: "image/jpeg".to_string(),
            },
            lookups: Arc::new(Mutex::new(Vec::new())),
            downloads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_user(self, email: &str, id: &str, avatar_url: &str) -> Self {
        self.users.lock().unwrap().insert(
            email.to_string(),
            DirectoryUser {
                id: id.to_string(),
                avatar_url: avatar_url.to_string(),
            },
        );
        self
    }

    /// Known user whose profile has no usable image.
    pub fn with_user_without_avatar(self, email: &str, id: &str) -> Self {
        self.with_user(email, id, "")
    }

    pub fn with_avatar(mut self, avatar: SourceImage) -> Self {
        self.avatar = avatar;
        self
    }

    pub fn get_lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn get_download_count(&self) -> usize {
        self.downloads.lock().unwrap().len()
    }
}

impl Default for MockDirectoryClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DirectoryService for MockDirectoryClient {
    async fn lookup_by_email(&self, email: &str) -> Result<DirectoryUser> {
        self.lookups.lock().unwrap().push(email.to_string());

        // Unknown emails behave like Slack's users_not_found.
        let user = self
            .users
            .lock()
            .unwrap()
            .get(email)
            .cloned()
            .ok_or_else(|| Error::Directory("users_not_found".to_string()))?;
        if user.avatar_url.is_empty() {
            return Err(Error::Directory("No profile image found for user".to_string()));
        }
        Ok(user)
    }

    async fn fetch_avatar(&self, url: &str) -> Result<SourceImage> {
        self.downloads.lock().unwrap().push(url.to_string());
        Ok(self.avatar.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_directory_lookup_and_download() {
        let client = MockDirectoryClient::new().with_user(
            "ada@example.com",
            "U123",
            "https://avatars.example/ada.png",
        );

        let user = client.lookup_by_email("ada@example.com").await.unwrap();
        assert_eq!(user.id, "U123");

        let avatar = client.fetch_avatar(&user.avatar_url).await.unwrap();
        assert_eq!(avatar.mime_type, "image/jpeg");
        assert_eq!(client.get_download_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_directory_unknown_email() {
        let client = MockDirectoryClient::new();
        let err = client.lookup_by_email("nobody@example.com").await.unwrap_err();

        assert!(err.to_string().contains("users_not_found"));
        assert_eq!(client.get_lookups(), vec!["nobody@example.com".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_directory_user_without_avatar() {
        let client = MockDirectoryClient::new().with_user_without_avatar("ada@example.com", "U123");
        let err = client.lookup_by_email("ada@example.com").await.unwrap_err();

        assert!(err.to_string().contains("No profile image"));
    }
}
