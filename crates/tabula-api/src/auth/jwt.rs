//! HS256 JWT authentication
//!
//! Tokens carry the user id in `sub` and the tenant in `organization_id`. Expiry is enforced.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tabula_core::models::CallerIdentity;
use tabula_core::AppError;
use tabula_services::Authenticator;

use super::models::JwtClaims;

#[derive(Clone)]
pub struct JwtAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Validate a token and return its claims
    pub fn verify(&self, token: &str) -> Result<JwtClaims, AppError> {
        decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
    }

    /// Sign a token for `caller` valid for `ttl`
    pub fn issue(&self, caller: CallerIdentity, ttl: Duration) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: caller.user_id,
            organization_id: caller.organization_id,
            exp: (now + ttl).timestamp(),
            iat: Some(now.timestamp()),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, credential: Option<&str>) -> Option<CallerIdentity> {
        let token = credential?;
        match self.verify(token) {
            Ok(claims) => Some(claims.caller()),
            Err(e) => {
                tracing::debug!(error = %e, "Rejected bearer token");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const SECRET: &str = "test-secret-that-is-at-least-32-characters";

    #[tokio::test]
    async fn test_issued_token_resolves_caller() {
        let auth = JwtAuthenticator::new(SECRET);
        let caller = CallerIdentity::new(Uuid::new_v4(), Uuid::new_v4());
        let token = auth.issue(caller, Duration::hours(1)).unwrap();

        assert_eq!(auth.authenticate(Some(&token)).await, Some(caller));
    }

    #[tokio::test]
    async fn test_rejects_missing_expired_and_foreign_tokens() {
        let auth = JwtAuthenticator::new(SECRET);
        let caller = CallerIdentity::new(Uuid::new_v4(), Uuid::new_v4());

        assert!(auth.authenticate(None).await.is_none());

        let expired = auth.issue(caller, Duration::hours(-2)).unwrap();
        assert!(auth.authenticate(Some(&expired)).await.is_none());

        let other = JwtAuthenticator::new("another-secret-that-is-32-characters-long");
        let foreign = other.issue(caller, Duration::hours(1)).unwrap();
        assert!(auth.authenticate(Some(&foreign)).await.is_none());

        assert!(auth.authenticate(Some("not-a-jwt")).await.is_none());
    }
}
