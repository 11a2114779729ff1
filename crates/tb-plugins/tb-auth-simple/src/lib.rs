//! # tb-auth-simple
//!
//! Hash-based implementation of `IdentityProvider`: a bearer token maps to a
//! stable opaque owner id via a salted SHA-256. No accounts, no passwords;
//! authentication policy lives with the deployment, not this service.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tb_core::traits::IdentityProvider;

pub struct SimpleIdentityProvider {
    /// Secret salt so owner ids cannot be derived from tokens off-site.
    salt: String,
}

impl SimpleIdentityProvider {
    /// Accepts a salt string (e.g., from an environment variable).
    pub fn new(salt: &str) -> Self {
        Self {
            salt: salt.to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for SimpleIdentityProvider {
    /// Same token, same id, across restarts with the same salt. Empty tokens
    /// resolve to nobody.
    async fn resolve(&self, token: &str) -> Option<String> {
        if token.is_empty() {
            return None;
        }
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        hasher.update(token.as_bytes());
        let hash = hex::encode(hasher.finalize());
        // 16 hex chars is plenty for an owner id
        Some(hash[..16].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolution_is_stable_and_distinct() {
        let auth = SimpleIdentityProvider::new("pepper");

        let a1 = auth.resolve("token-a").await.unwrap();
        let a2 = auth.resolve("token-a").await.unwrap();
        let b = auth.resolve("token-b").await.unwrap();

        assert_eq!(a1, a2);
        assert_ne!(a1, b);
        assert_eq!(a1.len(), 16);
    }

    #[tokio::test]
    async fn test_empty_token_resolves_to_nobody() {
        let auth = SimpleIdentityProvider::new("pepper");
        assert!(auth.resolve("").await.is_none());
    }

    #[tokio::test]
    async fn test_salt_changes_the_id_space() {
        let a = SimpleIdentityProvider::new("salt-a");
        let b = SimpleIdentityProvider::new("salt-b");
        assert_ne!(a.resolve("token").await, b.resolve("token").await);
    }
}
