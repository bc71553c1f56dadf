use super::{TokenVerifier, VerifiedToken};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

#[derive(Debug, Deserialize)]
struct TokenInfo {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    aud: Option<String>,
}

/// Accepts any token Google's tokeninfo endpoint accepts, whatever its audience.
pub struct GoogleTokenInfoVerifier {
    client: Client,
    tokeninfo_url: String,
}

impl GoogleTokenInfoVerifier {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            tokeninfo_url: DEFAULT_TOKENINFO_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_tokeninfo_url(mut self, url: String) -> Self {
        self.tokeninfo_url = url;
        self
    }
}

impl Default for GoogleTokenInfoVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenVerifier for GoogleTokenInfoVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken> {
        let response = self
            .client
            .get(&self.tokeninfo_url)
            .timeout(Duration::from_secs(10))
            .query(&[("id_token", token)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::debug!("tokeninfo rejected token ({}): {}", status, text);
            return Err(Error::Auth(format!(
                "tokeninfo returned {}",
                status.as_u16()
            )));
        }

        let info: TokenInfo = response.json().await?;
        tracing::debug!("tokeninfo audience: {:?}", info.aud);

        Ok(VerifiedToken {
            subject: info.sub,
            email: info.email,
            issuer: "gcp",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_tokeninfo_accepts_valid_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tokeninfo"))
            .and(query_param("id_token", "good-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sub": "1234567890",
                "email": "scheduler@party-test.iam.gserviceaccount.com",
                "aud": "https://example.run.app"
            })))
            .mount(&server)
            .await;

        let verifier =
            GoogleTokenInfoVerifier::new().with_tokeninfo_url(format!("{}/tokeninfo", server.uri()));
        let verified = verifier.verify("good-token").await.unwrap();

        assert_eq!(verified.issuer, "gcp");
        assert_eq!(
            verified.email.as_deref(),
            Some("scheduler@party-test.iam.gserviceaccount.com")
        );
    }

    #[tokio::test]
    async fn test_tokeninfo_rejection_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tokeninfo"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({ "error": "invalid_token" })),
            )
            .mount(&server)
            .await;

        let verifier =
            GoogleTokenInfoVerifier::new().with_tokeninfo_url(format!("{}/tokeninfo", server.uri()));
        let err = verifier.verify("bad-token").await.unwrap_err();

        assert!(matches!(err, Error::Auth(_)));
    }
}
