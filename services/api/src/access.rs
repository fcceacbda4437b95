//! services/api/src/access.rs
//!
//! Issues and verifies the bearer credential: an HS256 JWT carrying the
//! account id, valid for 30 days.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifetime of an issued credential.
pub const TOKEN_TTL_DAYS: i64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("JWT configuration error: secret key is missing")]
    MissingSecret,
    #[error("No token provided")]
    MissingToken,
    #[error("Token has expired")]
    Expired,
    #[error("Failed to authenticate token")]
    InvalidToken,
    #[error("Failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    pub iat: usize,
    pub exp: usize,
}

/// Signing and verification keys derived from the configured secret.
#[derive(Clone)]
pub struct CredentialKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl CredentialKeys {
    pub fn from_secret(secret: &str) -> Result<Self, AccessError> {
        if secret.trim().is_empty() {
            return Err(AccessError::MissingSecret);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::days(TOKEN_TTL_DAYS),
        })
    }

    /// Overrides the credential lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn issue(&self, account_id: Uuid) -> Result<String, AccessError> {
        let now = Utc::now();
        let claims = Claims {
            id: account_id,
            iat: now.timestamp().max(0) as usize,
            exp: (now + self.ttl).timestamp().max(0) as usize,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AccessError::Signing(e.to_string()))
    }

    /// Returns the account id embedded in a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Result<Uuid, AccessError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AccessError::MissingToken);
        }
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims.id)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AccessError::Expired,
                _ => AccessError::InvalidToken,
            })
    }
}

/// Pulls the token out of a raw `Authorization` header value. A `Bearer `
/// prefix is accepted but not required.
pub fn token_from_header(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .unwrap_or(value)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_to_the_same_account() {
        let keys = CredentialKeys::from_secret("top-secret").unwrap();
        let account = Uuid::new_v4();
        let token = keys.issue(account).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), account);
    }

    #[test]
    fn empty_secret_is_a_configuration_error() {
        assert!(matches!(
            CredentialKeys::from_secret("  "),
            Err(AccessError::MissingSecret)
        ));
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let ours = CredentialKeys::from_secret("ours").unwrap();
        let theirs = CredentialKeys::from_secret("theirs").unwrap();
        let token = theirs.issue(Uuid::new_v4()).unwrap();
        assert!(matches!(ours.verify(&token), Err(AccessError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_rejected() {
        // Well past the default 60 second leeway.
        let keys = CredentialKeys::from_secret("s")
            .unwrap()
            .with_ttl(Duration::hours(-2));
        let token = keys.issue(Uuid::new_v4()).unwrap();
        assert!(matches!(keys.verify(&token), Err(AccessError::Expired)));
    }

    #[test]
    fn garbage_and_blank_tokens_are_rejected() {
        let keys = CredentialKeys::from_secret("s").unwrap();
        assert!(matches!(keys.verify("not.a.jwt"), Err(AccessError::InvalidToken)));
        assert!(matches!(keys.verify(""), Err(AccessError::MissingToken)));
    }

    #[test]
    fn header_accepts_raw_and_bearer_tokens() {
        assert_eq!(token_from_header("abc.def.ghi"), "abc.def.ghi");
        assert_eq!(token_from_header("Bearer abc.def.ghi"), "abc.def.ghi");
        assert_eq!(token_from_header("  abc  "), "abc");
    }
}
