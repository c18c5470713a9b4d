//! Signed session tokens (JWT, HS256).
//!
//! Tokens are stateless: there is no server-side revocation list, so a token
//! stays valid until its embedded expiry even after logout. Callers layer a
//! freshness check on top by re-resolving the subject to a live user row.

use chrono::Utc;
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::access::Role;

/// Claims embedded in every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject user id.
    pub sub: i32,
    pub role: Role,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token does not parse")]
    Malformed,

    #[error("token has expired")]
    Expired,

    #[error("token is invalid")]
    Invalid,
}

/// Issues and verifies bearer tokens with a process-wide HMAC secret.
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_hours: i64,
    validation: Validation,
}

impl TokenSigner {
    #[must_use]
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        let mut validation = Validation::default();
        // Expiry is exact; the default 60s leeway would let expired tokens
        // linger past the contract.
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_hours,
            validation,
        }
    }

    /// Issue a token for `user_id` valid for the configured lifetime.
    pub fn issue(&self, user_id: i32, role: Role) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            role,
            iat: now.timestamp(),
            exp: (now + chrono::Duration::hours(self.ttl_hours)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(|_| TokenError::Invalid)
    }

    /// Verify signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => TokenError::Malformed,
                _ => TokenError::Invalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify() {
        let signer = TokenSigner::new("test-secret", 24);

        let token = signer.issue(42, Role::User).unwrap();
        let claims = signer.verify(&token).unwrap();

        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // Negative lifetime puts the expiry in the past.
        let signer = TokenSigner::new("test-secret", -1);
        let token = signer.issue(42, Role::User).unwrap();

        assert!(matches!(signer.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let signer = TokenSigner::new("test-secret", 24);
        let other = TokenSigner::new("another-secret", 24);

        let token = signer.issue(42, Role::Admin).unwrap();

        assert!(matches!(other.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        let signer = TokenSigner::new("test-secret", 24);

        assert!(matches!(
            signer.verify("not-a-jwt"),
            Err(TokenError::Malformed)
        ));
        assert!(matches!(
            signer.verify("aaa.bbb"),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn test_role_survives_roundtrip() {
        let signer = TokenSigner::new("test-secret", 24);
        let token = signer.issue(1, Role::Admin).unwrap();

        assert_eq!(signer.verify(&token).unwrap().role, Role::Admin);
    }
}
