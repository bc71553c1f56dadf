use super::{AccessTokenSource, DATASTORE_SCOPE};
use crate::{Error, Result};
use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountCredentials {
    client_email: String,
    private_key: String,
    #[serde(default)]
    private_key_id: Option<String>,
    token_uri: String,
}

#[derive(Debug, Serialize)]
struct JwtClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    token: String,
    expires_at: SystemTime,
}

/// Token cache shared by both credential kinds.
#[derive(Default)]
struct TokenCache {
    cached: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    async fn get(&self) -> Option<String> {
        let cached = self.cached.read().await;
        cached
            .as_ref()
            .filter(|t| t.expires_at > SystemTime::now() + REFRESH_MARGIN)
            .map(|t| t.token.clone())
    }

    async fn store(&self, response: &TokenResponse) {
        let lifetime = Duration::from_secs(response.expires_in.unwrap_or(3600));
        *self.cached.write().await = Some(CachedToken {
            token: response.access_token.clone(),
            expires_at: SystemTime::now() + lifetime,
        });
    }
}

async fn read_token_response(response: reqwest::Response) -> Result<TokenResponse> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::error!("Token exchange failed ({}): {}", status, body);
        return Err(Error::Auth(format!("Token exchange failed: {}", status.as_u16())));
    }
    Ok(response.json().await?)
}

/// OAuth2 via a service-account key (JWT bearer grant).
pub struct ServiceAccountAuth {
    credentials: ServiceAccountCredentials,
    client: Client,
    cache: TokenCache,
}

impl ServiceAccountAuth {
    pub async fn from_file(path: &str) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let credentials: ServiceAccountCredentials = serde_json::from_str(json)?;
        Ok(Self {
            credentials,
            client: Client::new(),
            cache: TokenCache::default(),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.credentials.client_email
    }

    fn signed_assertion(&self) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::Invariant(format!("System clock before epoch: {}", e)))?
            .as_secs();

        let claims = JwtClaims {
            iss: self.credentials.client_email.clone(),
            scope: DATASTORE_SCOPE.to_string(),
            aud: self.credentials.token_uri.clone(),
            iat: now,
            exp: now + 3600,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.credentials.private_key_id.clone();
        let key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
            .map_err(|e| Error::Auth(format!("Invalid service account key: {}", e)))?;
        encode(&header, &claims, &key)
            .map_err(|e| Error::Auth(format!("Failed to sign token request: {}", e)))
    }
}

#[async_trait]
impl AccessTokenSource for ServiceAccountAuth {
    async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.cache.get().await {
            return Ok(token);
        }

        let assertion = self.signed_assertion()?;
        let response = self
            .client
            .post(&self.credentials.token_uri)
            .timeout(Duration::from_secs(30))
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let token = read_token_response(response).await?;
        self.cache.store(&token).await;
        tracing::debug!("Refreshed access token for {}", self.credentials.client_email);
        Ok(token.access_token)
    }
}

/// Default credentials of the runtime's attached service account.
pub struct MetadataServerAuth {
    client: Client,
    token_url: String,
    cache: TokenCache,
}

impl MetadataServerAuth {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            token_url: METADATA_TOKEN_URL.to_string(),
            cache: TokenCache::default(),
        }
    }

    #[cfg(test)]
    fn with_token_url(mut self, token_url: String) -> Self {
        self.token_url = token_url;
        self
    }
}

impl Default for MetadataServerAuth {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccessTokenSource for MetadataServerAuth {
    async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.cache.get().await {
            return Ok(token);
        }

        let response = self
            .client
            .get(&self.token_url)
            .timeout(Duration::from_secs(10))
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;

        let token = read_token_response(response).await?;
        self.cache.store(&token).await;
        Ok(token.access_token)
    }
}
