//! Authentication error types.

use thiserror::Error;

use storekeep_core::Role;

use crate::db::RepositoryError;

/// Errors that can occur during authentication and authorization.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] storekeep_core::EmailError),

    /// A required field is missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// An account with this email already exists.
    #[error("account already exists")]
    AccountAlreadyExists,

    /// Wrong password, unknown login, or wrong kind of account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No credentials were presented.
    #[error("missing credentials")]
    MissingCredentials,

    /// Token is malformed, badly signed, signed with an unknown key, or expired.
    #[error("invalid token")]
    InvalidToken,

    /// The token is valid but its account no longer exists.
    #[error("account no longer exists")]
    AccountNotFound,

    /// An operator named an account that does not exist.
    #[error("account not found")]
    UnknownAccount,

    /// The retailer account has no store profile.
    #[error("store profile not found")]
    ProfileNotFound,

    /// Authenticated, but the account lacks the required role.
    #[error("requires {0} role")]
    Forbidden(Role),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Token could not be signed.
    #[error("token signing error: {0}")]
    TokenIssue(String),
}
