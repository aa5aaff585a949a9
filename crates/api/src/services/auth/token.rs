//! Bearer token issuing and verification (HS256 JWT).
//!
//! Every token names its signing key in the `kid` header. The active key signs
//! new tokens; previous keys are kept for verification only so that rotating
//! the secret does not log everyone out at once.

use std::collections::HashMap;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use storekeep_core::{AccountId, Role};

use super::AuthError;
use crate::config::TokenConfig;
use crate::models::Account;

/// Claims carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account ID.
    pub sub: AccountId,
    pub email: String,
    pub role: Role,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

/// Signs and verifies bearer tokens.
pub struct TokenIssuer {
    key_id: String,
    encoding_key: EncodingKey,
    decoding_keys: HashMap<String, DecodingKey>,
    validation: Validation,
    ttl_secs: i64,
}

impl TokenIssuer {
    /// Build an issuer from configuration.
    #[must_use]
    pub fn new(config: &TokenConfig) -> Self {
        let active = &config.signing_key;
        let encoding_key = EncodingKey::from_secret(active.secret.expose_secret().as_bytes());

        let decoding_keys = config
            .previous_keys
            .iter()
            .chain(std::iter::once(active))
            .map(|key| {
                (
                    key.id.clone(),
                    DecodingKey::from_secret(key.secret.expose_secret().as_bytes()),
                )
            })
            .collect();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            key_id: active.id.clone(),
            encoding_key,
            decoding_keys,
            validation,
            ttl_secs: i64::try_from(config.ttl.as_secs()).unwrap_or(i64::MAX),
        }
    }

    /// Issue a token for an account, valid from now for the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenIssue` if signing fails.
    pub fn issue(&self, account: &Account) -> Result<String, AuthError> {
        self.issue_at(account, chrono::Utc::now().timestamp())
    }

    fn issue_at(&self, account: &Account, now: i64) -> Result<String, AuthError> {
        let claims = Claims {
            sub: account.id,
            email: account.email.to_string(),
            role: account.role,
            iat: now,
            exp: now.saturating_add(self.ttl_secs),
        };

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(self.key_id.clone());

        jsonwebtoken::encode(&header, &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenIssue(e.to_string()))
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is malformed, names an
    /// unknown key, has a bad signature, or has expired.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = jsonwebtoken::decode_header(token).map_err(|_| AuthError::InvalidToken)?;
        let key = header
            .kid
            .as_deref()
            .and_then(|kid| self.decoding_keys.get(kid))
            .ok_or(AuthError::InvalidToken)?;

        jsonwebtoken::decode::<Claims>(token, key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected bearer token");
                AuthError::InvalidToken
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use secrecy::SecretString;

    use storekeep_core::Email;

    use super::*;
    use crate::config::SigningKey;

    fn key(id: &str, secret: &str) -> SigningKey {
        SigningKey {
            id: id.to_string(),
            secret: SecretString::from(secret),
        }
    }

    fn issuer(active: SigningKey, previous: Vec<SigningKey>) -> TokenIssuer {
        TokenIssuer::new(&TokenConfig {
            signing_key: active,
            previous_keys: previous,
            ttl: Duration::from_secs(3600),
        })
    }

    fn account() -> Account {
        let now = Utc::now();
        Account {
            id: AccountId::generate(),
            name: "Ann".to_string(),
            email: Email::parse("ann@example.com").unwrap(),
            role: Role::Retailer,
            cart: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = issuer(key("k1", "first-signing-secret"), Vec::new());
        let account = account();

        let claims = tokens.verify(&tokens.issue(&account).unwrap()).unwrap();
        assert_eq!(claims.sub, account.id);
        assert_eq!(claims.email, "ann@example.com");
        assert_eq!(claims.role, Role::Retailer);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_garbage_rejected() {
        let tokens = issuer(key("k1", "first-signing-secret"), Vec::new());
        assert!(matches!(
            tokens.verify("invalid.token.here"),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(tokens.verify(""), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let a = issuer(key("k1", "secret-a-0123456789"), Vec::new());
        let b = issuer(key("k1", "secret-b-0123456789"), Vec::new());
        let token = a.issue(&account()).unwrap();
        assert!(matches!(b.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = issuer(key("k1", "first-signing-secret"), Vec::new());
        let token = tokens
            .issue_at(&account(), Utc::now().timestamp() - 7200)
            .unwrap();
        assert!(matches!(tokens.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_previous_key_still_verifies_after_rotation() {
        let old = issuer(key("k1", "first-signing-secret"), Vec::new());
        let token = old.issue(&account()).unwrap();

        let rotated = issuer(
            key("k2", "second-signing-secret"),
            vec![key("k1", "first-signing-secret")],
        );
        assert!(rotated.verify(&token).is_ok());

        let fresh = rotated.issue(&account()).unwrap();
        let header = jsonwebtoken::decode_header(&fresh).unwrap();
        assert_eq!(header.kid.as_deref(), Some("k2"));
    }

    #[test]
    fn test_retired_key_rejected() {
        let old = issuer(key("k1", "first-signing-secret"), Vec::new());
        let token = old.issue(&account()).unwrap();

        let rotated = issuer(key("k2", "second-signing-secret"), Vec::new());
        assert!(matches!(
            rotated.verify(&token),
            Err(AuthError::InvalidToken)
        ));
    }
}
