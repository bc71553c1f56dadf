//! Bearer-token verification for the plain HTTP endpoint
//!
//! Callers present either a Google-issued identity token (service-to-service,
//! checked with Google's tokeninfo endpoint) or a Firebase ID token (checked
//! locally against the securetoken signing keys).

pub mod firebase;
pub mod google;
pub mod mock;

pub use firebase::FirebaseIdTokenVerifier;
pub use google::GoogleTokenInfoVerifier;
pub use mock::MockTokenVerifier;

use crate::{Error, Result};
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject: Option<String>,
    pub email: Option<String>,
    pub issuer: &'static str,
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedToken>;
}

/// The token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Tries each verifier in order; the first that accepts wins.
pub struct ChainedVerifier {
    verifiers: Vec<Box<dyn TokenVerifier>>,
}

impl ChainedVerifier {
    pub fn new(verifiers: Vec<Box<dyn TokenVerifier>>) -> Self {
        Self { verifiers }
    }
}

#[async_trait]
impl TokenVerifier for ChainedVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken> {
        for verifier in &self.verifiers {
            match verifier.verify(token).await {
                Ok(verified) => {
                    tracing::info!(
                        "Verified {} token (subject {:?}, email {:?})",
                        verified.issuer,
                        verified.subject,
                        verified.email
                    );
                    return Ok(verified);
                }
                Err(e) => tracing::info!("Token verification attempt failed: {}", e),
            }
        }

        Err(Error::Auth(
            "Token must be either a valid GCP identity token or Firebase ID token".to_string(),
        ))
    }
}
