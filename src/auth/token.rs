use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::constants::{MAX_TOKEN_LENGTH, TOKEN_TTL_SECS};
use crate::core::clock::Clock;
use crate::error::{NihongoError, Result};

/// JWT Claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Email at issuance
    pub email: String,
    /// Issued at (as UTC timestamp)
    pub iat: i64,
    /// Expiration time (as UTC timestamp)
    pub exp: i64,
}

impl Claims {
    /// Expired on or after the `exp` instant
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}

/// Issues and verifies bearer tokens.
///
/// Tokens are stateless: there is no revocation list, so a leaked token stays
/// valid until it expires.
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
    clock: Arc<dyn Clock>,
}

impl TokenManager {
    /// Creates a new token manager with a secret and the standard 7 day lifetime
    pub fn new(secret: &str, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock instead
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_secs: TOKEN_TTL_SECS,
            clock,
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Mint a token for a user
    pub fn issue(&self, user_id: &str, email: &str) -> Result<String> {
        let now = self.clock.now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now,
            exp: now + self.ttl_secs,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| NihongoError::TokenError(format!("Failed to generate token: {}", e)))
    }

    /// Check signature and expiry, returning the embedded claims
    pub fn verify(&self, token: &str) -> Result<Claims> {
        if token.is_empty() || token.len() > MAX_TOKEN_LENGTH {
            return Err(NihongoError::InvalidToken);
        }

        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                log::debug!("Token rejected: {}", e);
                NihongoError::InvalidToken
            })?
            .claims;

        if claims.sub.is_empty() {
            return Err(NihongoError::InvalidToken);
        }

        if claims.is_expired_at(self.clock.now().timestamp()) {
            return Err(NihongoError::ExpiredToken);
        }

        Ok(claims)
    }
}

/// Extracts the token from a `Bearer <token>` header value.
///
/// Exactly two whitespace-separated parts are accepted; the scheme is
/// case-insensitive.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    let mut parts = auth_header.split_whitespace();
    let scheme = parts.next()?;
    let token = parts.next()?;

    if parts.next().is_some() || !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    Some(token)
}
