use super::{AccessTokenSource, MetadataServerAuth, ServiceAccountAuth};
use crate::Result;
use async_trait::async_trait;
use tokio::sync::OnceCell;

/// Shared Firebase admin handle.
///
/// Credentials are resolved on first use and then reused for the life of
/// the process, including their token cache.
pub struct FirebaseAdmin {
    project_id: String,
    credentials_path: Option<String>,
    source: OnceCell<Box<dyn AccessTokenSource>>,
}

impl FirebaseAdmin {
    pub fn new(project_id: String, credentials_path: Option<String>) -> Self {
        Self {
            project_id,
            credentials_path,
            source: OnceCell::new(),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn is_initialized(&self) -> bool {
        self.source.initialized()
    }

    async fn source(&self) -> Result<&dyn AccessTokenSource> {
        let source = self
            .source
            .get_or_try_init(|| async {
                let source: Box<dyn AccessTokenSource> = match &self.credentials_path {
                    Some(path) => {
                        let auth = ServiceAccountAuth::from_file(path).await?;
                        tracing::info!(
                            "Initialised Firebase admin for {} as {}",
                            self.project_id,
                            auth.client_email()
                        );
                        Box::new(auth)
                    }
                    None => {
                        tracing::info!(
                            "Initialised Firebase admin for {} with metadata server credentials",
                            self.project_id
                        );
                        Box::new(MetadataServerAuth::new())
                    }
                };
                Ok::<_, crate::Error>(source)
            })
            .await?;
        Ok(source.as_ref())
    }
}

#[async_trait]
impl AccessTokenSource for FirebaseAdmin {
    async fn access_token(&self) -> Result<String> {
        self.source().await?.access_token().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firebase::credentials::test_support::service_account_json;
    use std::io::Write;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_admin_initialises_lazily_from_credentials_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.admin",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", service_account_json(&format!("{}/token", server.uri()))).unwrap();

        let admin = FirebaseAdmin::new(
            "party-test".to_string(),
            Some(file.path().to_string_lossy().to_string()),
        );
        assert!(!admin.is_initialized());

        assert_eq!(admin.access_token().await.unwrap(), "ya29.admin");
        assert!(admin.is_initialized());
        assert_eq!(admin.access_token().await.unwrap(), "ya29.admin");
        assert_eq!(admin.project_id(), "party-test");
    }

    #[tokio::test]
    async fn test_missing_credentials_file_fails_and_stays_uninitialised() {
        let admin = FirebaseAdmin::new(
            "party-test".to_string(),
            Some("/nonexistent/service-account.json".to_string()),
        );

        let err = admin.access_token().await.unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
        assert!(!admin.is_initialized());
    }
}
