//! Firebase admin access
//!
//! Google OAuth tokens for server-to-server calls, the lazily initialised
//! admin handle that owns them, and the Firestore player-record update.

pub mod admin;
pub mod credentials;
pub mod firestore;
pub mod mock;

pub use admin::FirebaseAdmin;
pub use credentials::{MetadataServerAuth, ServiceAccountAuth};
pub use firestore::FirestoreClient;
pub use mock::{MockRecordStore, StaticTokenSource};

use crate::models::PlayerRecordRef;
use crate::Result;
use async_trait::async_trait;

pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// A bearer token valid for at least another minute.
    async fn access_token(&self) -> Result<String>;
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Set the `image` field of an existing player document.
    async fn set_player_image(&self, record: &PlayerRecordRef, image_url: &str) -> Result<()>;
}
