use super::DirectoryService;
use crate::ai::mime::resolve_image_mime;
use crate::ai::SourceImage;
use crate::models::DirectoryUser;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://slack.com/api";

#[derive(Debug, Deserialize)]
struct LookupResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    user: Option<SlackUser>,
}

#[derive(Debug, Deserialize)]
struct SlackUser {
    id: String,
    #[serde(default)]
    profile: Option<SlackProfile>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackProfile {
    image_512: Option<String>,
    image_192: Option<String>,
    image_72: Option<String>,
}

impl SlackProfile {
    /// Largest avatar available, preferring 512px, then 192px, then 72px.
    fn best_avatar(&self) -> Option<&str> {
        [&self.image_512, &self.image_192, &self.image_72]
            .into_iter()
            .filter_map(|url| url.as_deref())
            .find(|url| !url.trim().is_empty())
    }
}

pub struct SlackClient {
    client: Client,
    token: String,
    base_url: String,
}

impl SlackClient {
    pub fn new(token: String) -> Self {
        Self::new_with_client(token, Client::new())
    }

    pub fn new_with_client(token: String, client: Client) -> Self {
        Self {
            client,
            token,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl DirectoryService for SlackClient {
    async fn lookup_by_email(&self, email: &str) -> Result<DirectoryUser> {
        let url = format!("{}/users.lookupByEmail", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(30))
            .bearer_auth(&self.token)
            .query(&[("email", email)])
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Slack: {}", e);
                e
            })?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::Directory(format!(
                "Slack API request failed: {}",
                status.as_u16()
            )));
        }

        let lookup: LookupResponse = response.json().await?;
        if !lookup.ok {
            return Err(Error::Directory(
                lookup.error.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        let user = lookup
            .user
            .ok_or_else(|| Error::Directory("Slack response had no user".to_string()))?;

        let avatar_url = user
            .profile
            .as_ref()
            .and_then(SlackProfile::best_avatar)
            .ok_or_else(|| Error::Directory("No profile image found for user".to_string()))?
            .to_string();

        tracing::info!("Found Slack profile image for {}: {}", user.id, avatar_url);

        Ok(DirectoryUser {
            id: user.id,
            avatar_url,
        })
    }

    async fn fetch_avatar(&self, url: &str) -> Result<SourceImage> {
        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(30))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Directory(format!(
                "Failed to download profile image: {}",
                response.status().as_u16()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();
        let mime_type = resolve_image_mime(content_type.as_deref(), &bytes);

        tracing::debug!("Downloaded avatar ({} bytes, {})", bytes.len(), mime_type);

        Ok(SourceImage { bytes, mime_type })
    }
}
