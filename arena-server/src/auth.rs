use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use arena_types::User;

/// Signed session payload. Stateless and expiring; nothing is stored
/// server-side, so the claims carry everything the handlers need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub name: String,
    pub is_admin: bool,
    pub iat: u64,
    pub exp: u64,
}

/// Issues and verifies HS256 session tokens.
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl SessionIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let claims = SessionClaims {
            sub: user.id,
            name: user.name.clone(),
            is_admin: user.is_admin,
            iat: now,
            exp: now + self.ttl.as_secs(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("failed to sign session token: {e}");
            AuthError::SigningFailed
        })
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Failed to sign token")]
    SigningFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user(is_admin: bool) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test User".to_string(),
            student_id: "20250001".to_string(),
            is_admin,
        }
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let issuer = SessionIssuer::new("test-secret", Duration::from_secs(3600));
        let user = test_user(true);

        let token = issuer.issue(&user).unwrap();
        let claims = issuer.verify(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.name, "Test User");
        assert!(claims.is_admin);
        assert_eq!(claims.exp, claims.iat + 3600);
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        let issuer = SessionIssuer::new("test-secret", Duration::from_secs(3600));

        let result = issuer.verify("not-a-token");
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_token_from_other_secret_is_invalid() {
        let issuer = SessionIssuer::new("test-secret", Duration::from_secs(3600));
        let other = SessionIssuer::new("other-secret", Duration::from_secs(3600));

        let token = other.issue(&test_user(false)).unwrap();
        assert!(matches!(issuer.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let issuer = SessionIssuer::new("test-secret", Duration::from_secs(0));

        let token = issuer.issue(&test_user(false)).unwrap();
        std::thread::sleep(Duration::from_millis(1100));

        assert!(matches!(issuer.verify(&token), Err(AuthError::TokenExpired)));
    }
}
