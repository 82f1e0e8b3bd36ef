//! Token verification seam.
//!
//! Authentication is an external collaborator: something upstream validates
//! the bearer token and this port only turns it into a `(player_id, admin)`
//! claim. The reference `TrustedTokenVerifier` accepts pre-validated tokens
//! of the form `<player_id>` or `admin:<player_id>`; production deployments
//! put a real JWT validator behind the same trait.

use async_trait::async_trait;

use wayfarer_domain::PlayerId;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing token")]
    Missing,
    #[error("invalid token")]
    Invalid,
}

#[derive(Debug, Clone)]
pub struct AuthClaims {
    pub player_id: PlayerId,
    pub admin: bool,
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthClaims, AuthError>;
}

/// Reference verifier for tokens already validated upstream.
#[derive(Debug, Default, Clone)]
pub struct TrustedTokenVerifier;

fn valid_player_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[async_trait]
impl TokenVerifier for TrustedTokenVerifier {
    async fn verify(&self, token: &str) -> Result<AuthClaims, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::Missing);
        }
        let (admin, player) = match token.strip_prefix("admin:") {
            Some(rest) => (true, rest),
            None => (false, token),
        };
        // Player ids become path segments in the document tree; keep them
        // filesystem-safe.
        if !valid_player_segment(player) {
            return Err(AuthError::Invalid);
        }
        Ok(AuthClaims {
            player_id: PlayerId::new(player),
            admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plain_token_is_player() {
        let claims = TrustedTokenVerifier.verify("alice").await.expect("claims");
        assert_eq!(claims.player_id.as_str(), "alice");
        assert!(!claims.admin);
    }

    #[tokio::test]
    async fn test_admin_prefix() {
        let claims = TrustedTokenVerifier
            .verify("admin:gm-1")
            .await
            .expect("claims");
        assert_eq!(claims.player_id.as_str(), "gm-1");
        assert!(claims.admin);
    }

    #[tokio::test]
    async fn test_rejects_path_unsafe_ids() {
        assert!(matches!(
            TrustedTokenVerifier.verify("").await,
            Err(AuthError::Missing)
        ));
        for bad in ["../etc", "a/b", "admin:", "a b"] {
            assert!(
                matches!(TrustedTokenVerifier.verify(bad).await, Err(AuthError::Invalid)),
                "expected {bad:?} to be rejected"
            );
        }
    }
}
