use super::{TokenVerifier, VerifiedToken};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Accepts a fixed set of tokens.
#[derive(Clone)]
pub struct MockTokenVerifier {
    issuer: &'static str,
    accepted: Arc<Mutex<HashSet<String>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockTokenVerifier {
    pub fn new(issuer: &'static str) -> Self {
        Self {
            issuer,
            accepted: Arc::new(Mutex::new(HashSet::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn accepting(self, token: &str) -> Self {
        self.accepted.lock().unwrap().insert(token.to_string());
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl TokenVerifier for MockTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken> {
        *self.call_count.lock().unwrap() += 1;

        if self.accepted.lock().unwrap().contains(token) {
            Ok(VerifiedToken {
                subject: Some("mock-subject".to_string()),
                email: None,
                issuer: self.issuer,
            })
        } else {
            Err(Error::Auth(format!("{} rejected token", self.issuer)))
        }
    }
}
