//! Slack directory integration
//!
//! Resolves a player's email to their Slack user and downloads the avatar
//! that seeds the portrait.

pub mod client;
pub mod mock;

pub use client::SlackClient;
pub use mock::MockDirectoryClient;

use crate::ai::SourceImage;
use crate::models::DirectoryUser;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Look a user up by email and pick their largest avatar.
    async fn lookup_by_email(&self, email: &str) -> Result<DirectoryUser>;
    /// Download an avatar image.
    async fn fetch_avatar(&self, url: &str) -> Result<SourceImage>;
}
