use super::{AccessTokenSource, RecordStore};
use crate::models::PlayerRecordRef;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Always hands out the same token.
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
        }
    }
}

#[async_trait]
impl AccessTokenSource for StaticTokenSource {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// Records image updates instead of writing them.
#[derive(Clone)]
pub struct MockRecordStore {
    updates: Arc<Mutex<Vec<(PlayerRecordRef, String)>>>,
    failure: Option<String>,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self {
            updates: Arc::new(Mutex::new(Vec::new())),
            failure: None,
        }
    }

    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn get_updates(&self) -> Vec<(PlayerRecordRef, String)> {
        self.updates.lock().unwrap().clone()
    }
}

impl Default for MockRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn set_player_image(&self, record: &PlayerRecordRef, image_url: &str) -> Result<()> {
        if let Some(message) = &self.failure {
            return Err(Error::Firestore(message.clone()));
        }
        self.updates
            .lock()
            .unwrap()
            .push((record.clone(), image_url.to_string()));
        Ok(())
    }
}
