use super::{TokenVerifier, VerifiedToken};
use crate::{Error, Result};
use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const KEYS_TTL: Duration = Duration::from_secs(60 * 60);
/// Floor between JWKS fetches triggered by an unknown kid.
const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Verifies Firebase Auth ID tokens for one project.
pub struct FirebaseIdTokenVerifier {
    client: Client,
    project_id: String,
    jwks_url: String,
    keys: RwLock<Option<CachedKeys>>,
}

impl FirebaseIdTokenVerifier {
    pub fn new(project_id: String) -> Self {
        Self {
            client: Client::new(),
            project_id,
            jwks_url: DEFAULT_JWKS_URL.to_string(),
            keys: RwLock::new(None),
        }
    }

    #[cfg(test)]
    fn with_jwks_url(mut self, url: String) -> Self {
        self.jwks_url = url;
        self
    }

    fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey> {
        {
            let cached = self.keys.read().await;
            if let Some(cached) = cached.as_ref() {
                let age = cached.fetched_at.elapsed();
                if age < KEYS_TTL {
                    if let Some(jwk) = cached.keys.find(kid) {
                        return DecodingKey::from_jwk(jwk)
                            .map_err(|e| Error::Auth(format!("Unusable signing key: {}", e)));
                    }
                    if age < MIN_REFETCH_INTERVAL {
                        return Err(Error::Auth(format!("No signing key matches kid {}", kid)));
                    }
                }
            }
        }

        // Unknown kid or stale cache: Google rotates keys, so refetch once.
        let response = self
            .client
            .get(&self.jwks_url)
            .timeout(Duration::from_secs(10))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Auth(format!(
                "Failed to fetch signing keys: {}",
                response.status().as_u16()
            )));
        }
        let keys: JwkSet = response.json().await?;

        let key = keys
            .find(kid)
            .map(DecodingKey::from_jwk)
            .transpose()
            .map_err(|e| Error::Auth(format!("Unusable signing key: {}", e)))?;

        *self.keys.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });

        key.ok_or_else(|| Error::Auth(format!("No signing key matches kid {}", kid)))
    }
}

#[async_trait]
impl TokenVerifier for FirebaseIdTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken> {
        let header =
            decode_header(token).map_err(|e| Error::Auth(format!("Malformed token: {}", e)))?;
        if header.alg != Algorithm::RS256 {
            return Err(Error::Auth(format!("Unexpected algorithm {:?}", header.alg)));
        }
        let kid = header
            .kid
            .ok_or_else(|| Error::Auth("Token has no kid".to_string()))?;

        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[self.issuer()]);
        validation.set_required_spec_claims(&["exp", "iat", "aud", "iss", "sub"]);

        let data = decode::<IdTokenClaims>(token, &key, &validation)
            .map_err(|e| Error::Auth(format!("Invalid Firebase ID token: {}", e)))?;

        if data.claims.sub.is_empty() {
            return Err(Error::Auth("Firebase ID token has an empty subject".to_string()));
        }

        Ok(VerifiedToken {
            subject: Some(data.claims.sub),
            email: data.claims.email,
            issuer: "firebase",
        })
    }
}
