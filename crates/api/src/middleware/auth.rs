//! Authentication extractors and the role guard.
//!
//! Two schemes are accepted, each by its own extractor:
//!
//! - `Authorization: Bearer <token>` resolves to a live [`Account`]
//!   ([`Authenticated`], [`RequireRetailer`])
//! - `Authorization: Basic base64(user:pass)` resolves to an [`Operator`]
//!   ([`RequireOperator`])
//!
//! [`ProductWriter`] accepts either, for catalog writes. Account
//! administration takes [`RequireOperator`] alone. A rejected request never
//! reaches its handler.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use base64::{Engine, engine::general_purpose::STANDARD};

use storekeep_core::Role;

use crate::error::{AppError, set_sentry_user};
use crate::models::{Account, Operator, WriteScope};
use crate::services::AuthError;
use crate::state::AppState;

/// Extractor that requires a valid bearer token for a live account.
///
/// The resolved account is cached in request extensions, so stacking
/// extractors does not repeat the lookup.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(Authenticated(account): Authenticated) -> String {
///     format!("Hello, {}!", account.name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Authenticated(pub Account);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(account) = parts.extensions.get::<Account>() {
            return Ok(Self(account.clone()));
        }

        let token = bearer_token(&parts.headers)?;
        let account = state.auth().authenticate_bearer(token).await?;

        set_sentry_user(&account.id, Some(account.email.as_str()));
        parts.extensions.insert(account.clone());
        Ok(Self(account))
    }
}

/// Extractor that requires a bearer-authenticated retailer account.
///
/// Authentication runs first: a bad token is 401, a customer token is 403.
#[derive(Debug, Clone)]
pub struct RequireRetailer(pub Account);

impl FromRequestParts<AppState> for RequireRetailer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Authenticated(account) = Authenticated::from_request_parts(parts, state).await?;
        require_role(&account, Role::Retailer)?;
        Ok(Self(account))
    }
}

/// Extractor that requires HTTP Basic operator credentials.
#[derive(Debug, Clone)]
pub struct RequireOperator(pub Operator);

impl FromRequestParts<AppState> for RequireOperator {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let (username, password) = basic_credentials(&parts.headers)?;
        let operator = state
            .auth()
            .authenticate_operator(&username, &password)
            .await
            .inspect_err(|_| tracing::warn!(username = %username, "Rejected operator credentials"))?;
        Ok(Self(operator))
    }
}

/// Whoever is allowed to write to the catalog on this request.
#[derive(Debug, Clone)]
pub enum ProductWriter {
    /// Operator via HTTP Basic; may write any product.
    Operator(Operator),
    /// Retailer via bearer token; may write only its own products.
    Retailer(Account),
}

impl ProductWriter {
    /// Products this writer may modify.
    #[must_use]
    pub const fn scope(&self) -> WriteScope {
        match self {
            Self::Operator(_) => WriteScope::Any,
            Self::Retailer(account) => WriteScope::OwnedBy(account.id),
        }
    }
}

impl FromRequestParts<AppState> for ProductWriter {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let is_basic = matches!(
            authorization(&parts.headers)?,
            Some((scheme, _)) if scheme.eq_ignore_ascii_case("basic")
        );

        if is_basic {
            let RequireOperator(operator) =
                RequireOperator::from_request_parts(parts, state).await?;
            Ok(Self::Operator(operator))
        } else {
            let RequireRetailer(account) =
                RequireRetailer::from_request_parts(parts, state).await?;
            Ok(Self::Retailer(account))
        }
    }
}

/// Role guard: pass only if the account has `role`.
///
/// # Errors
///
/// Returns `AuthError::Forbidden` on a role mismatch.
pub fn require_role(account: &Account, role: Role) -> Result<(), AuthError> {
    if account.role == role {
        Ok(())
    } else {
        Err(AuthError::Forbidden(role))
    }
}

/// Split the `Authorization` header into scheme and credentials.
///
/// `Ok(None)` if the header is absent.
fn authorization(headers: &HeaderMap) -> Result<Option<(&str, &str)>, AuthError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AuthError::InvalidCredentials)?;
    Ok(Some(
        value
            .trim()
            .split_once(' ')
            .map_or((value.trim(), ""), |(scheme, rest)| (scheme, rest.trim())),
    ))
}

/// Extract a bearer token. Only the `Bearer <token>` form is accepted.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    match authorization(headers).map_err(|_| AuthError::InvalidToken)? {
        None => Err(AuthError::MissingCredentials),
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() => {
            Ok(token)
        }
        Some(_) => Err(AuthError::InvalidToken),
    }
}

/// Extract and decode HTTP Basic credentials.
fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), AuthError> {
    let (scheme, encoded) = authorization(headers)?.ok_or(AuthError::MissingCredentials)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(AuthError::InvalidCredentials);
    }

    let decoded = STANDARD
        .decode(encoded)
        .map_err(|_| AuthError::InvalidCredentials)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::InvalidCredentials)?;
    let (username, password) = decoded
        .split_once(':')
        .ok_or(AuthError::InvalidCredentials)?;

    Ok((username.to_owned(), password.to_owned()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;
    use chrono::Utc;

    use storekeep_core::{AccountId, Email};

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn account(role: Role) -> Account {
        let now = Utc::now();
        Account {
            id: AccountId::generate(),
            name: "Test".to_string(),
            email: Email::parse("t@x.io").unwrap(),
            role,
            cart: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")).unwrap(), "abc.def");
        assert_eq!(bearer_token(&headers("bearer  abc")).unwrap(), "abc");
        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            bearer_token(&headers("abc.def.ghi")),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            bearer_token(&headers("Bearer")),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            bearer_token(&headers("Basic dTpw")),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_basic_credentials_parsing() {
        let encoded = STANDARD.encode("ops:pa:ss");
        let (user, pass) = basic_credentials(&headers(&format!("Basic {encoded}"))).unwrap();
        assert_eq!(user, "ops");
        assert_eq!(pass, "pa:ss");

        assert!(matches!(
            basic_credentials(&HeaderMap::new()),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            basic_credentials(&headers("Basic !!!not-base64")),
            Err(AuthError::InvalidCredentials)
        ));
        let no_colon = STANDARD.encode("opsonly");
        assert!(matches!(
            basic_credentials(&headers(&format!("Basic {no_colon}"))),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            basic_credentials(&headers("Bearer token")),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_require_role() {
        assert!(require_role(&account(Role::Retailer), Role::Retailer).is_ok());
        assert!(matches!(
            require_role(&account(Role::Customer), Role::Retailer),
            Err(AuthError::Forbidden(Role::Retailer))
        ));
    }

    #[test]
    fn test_writer_scope() {
        let retailer = account(Role::Retailer);
        let id = retailer.id;
        assert_eq!(
            ProductWriter::Retailer(retailer).scope(),
            WriteScope::OwnedBy(id)
        );
    }
}
