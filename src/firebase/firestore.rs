use super::{AccessTokenSource, RecordStore};
use crate::models::PlayerRecordRef;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com";

/// Firestore REST client scoped to the `(default)` database.
pub struct FirestoreClient {
    client: Client,
    project_id: String,
    tokens: Arc<dyn AccessTokenSource>,
    base_url: String,
}

impl FirestoreClient {
    pub fn new(project_id: String, tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self {
            client: Client::new(),
            project_id,
            tokens,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Each ID is pushed as its own percent-encoded path segment.
    fn document_url(&self, record: &PlayerRecordRef) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::Firestore(format!("Invalid Firestore base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Firestore("Firestore base URL cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend([
                "v1",
                "projects",
                self.project_id.as_str(),
                "databases",
                "(default)",
                "documents",
                "games",
                record.game_id.as_str(),
                "players",
                record.player_id.as_str(),
            ]);
        Ok(url)
    }
}

#[async_trait]
impl RecordStore for FirestoreClient {
    async fn set_player_image(&self, record: &PlayerRecordRef, image_url: &str) -> Result<()> {
        let url = self.document_url(record)?;
        let token = self.tokens.access_token().await?;
        let document_path = record.document_path();
        let body = serde_json::json!({
            "fields": { "image": { "stringValue": image_url } }
        });

        // Only `image` is written, and only if the document already exists.
        let response = self
            .client
            .patch(url)
            .timeout(Duration::from_secs(30))
            .bearer_auth(token)
            .query(&[
                ("updateMask.fieldPaths", "image"),
                ("currentDocument.exists", "true"),
            ])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::error!("Firestore update of {} failed ({}): {}", document_path, status, text);
            return Err(Error::Firestore(format!(
                "Failed to update {}: {}",
                document_path,
                status.as_u16()
            )));
        }

        tracing::info!("Updated player document {} with image URL", document_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firebase::StaticTokenSource;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DOCUMENT_PATH: &str =
        "/v1/projects/party-test/databases/(default)/documents/games/g1/players/p1";

    fn record() -> PlayerRecordRef {
        PlayerRecordRef {
            game_id: "g1".to_string(),
            player_id: "p1".to_string(),
        }
    }

    fn make_client(server: &MockServer) -> FirestoreClient {
        FirestoreClient::new(
            "party-test".to_string(),
            Arc::new(StaticTokenSource::new("ya29.test")),
        )
        .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_patch_sets_only_image_on_existing_document() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(DOCUMENT_PATH))
            .and(query_param("updateMask.fieldPaths", "image"))
            .and(query_param("currentDocument.exists", "true"))
            .and(header("Authorization", "Bearer ya29.test"))
            .and(body_json(serde_json::json!({
                "fields": { "image": { "stringValue": "https://img.example/p.png" } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "projects/party-test/databases/(default)/documents/games/g1/players/p1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        make_client(&server)
            .set_player_image(&record(), "https://img.example/p.png")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_ids_stay_inside_their_own_segment() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(
                "/v1/projects/party-test/databases/(default)/documents/games/..%2Fadmins%2Froot%23/players/p%20%231",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let record = PlayerRecordRef {
            game_id: "../admins/root#".to_string(),
            player_id: "p #1".to_string(),
        };
        make_client(&server)
            .set_player_image(&record, "https://img.example/p.png")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_document_is_firestore_error() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(DOCUMENT_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": { "code": 404, "status": "NOT_FOUND" }
            })))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .set_player_image(&record(), "https://img.example/p.png")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Firestore(_)));
        assert!(err.to_string().contains("404"));
    }
}
