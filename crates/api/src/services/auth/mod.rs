//! Authentication service.
//!
//! Provides account registration, password login, bearer-token
//! authentication, and operator (HTTP Basic) credential checks.

mod error;
mod password;
mod token;

pub use error::AuthError;
pub use password::PasswordHasher;
pub use token::{Claims, TokenIssuer};

use tracing::instrument;

use storekeep_core::{AccountId, Email, Role};

use crate::db::{AccountRepository, OperatorRepository, RepositoryError, Repositories};
use crate::models::{Account, AccountChanges, NewAccount, Operator, RetailerProfile};

/// Input for registering a customer or retailer account.
#[derive(Clone, Copy)]
pub struct Registration<'r> {
    pub name: &'r str,
    pub email: &'r str,
    pub password: &'r str,
    pub role: Role,
}

/// Operator edit of an account. `None` leaves the field unchanged.
#[derive(Clone, Copy, Default)]
pub struct AccountUpdate<'r> {
    pub name: Option<&'r str>,
    pub email: Option<&'r str>,
    pub password: Option<&'r str>,
}

/// Authentication service.
///
/// Borrows the repositories and crypto handles from application state; create
/// one per request with [`crate::state::AppState::auth`].
pub struct AuthService<'a> {
    accounts: &'a dyn AccountRepository,
    operators: &'a dyn OperatorRepository,
    hasher: &'a PasswordHasher,
    tokens: &'a TokenIssuer,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub fn new(repos: &'a Repositories, hasher: &'a PasswordHasher, tokens: &'a TokenIssuer) -> Self {
        Self {
            accounts: repos.accounts.as_ref(),
            operators: repos.operators.as_ref(),
            hasher,
            tokens,
        }
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if the name or password is empty.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::AccountAlreadyExists` if the email is already registered.
    #[instrument(skip_all, fields(role = %registration.role))]
    pub async fn register(&self, registration: Registration<'_>) -> Result<Account, AuthError> {
        let new = self.prepare(&registration).await?;
        let account = self.accounts.create(new).await.map_err(map_duplicate)?;

        tracing::info!(account_id = %account.id, "Account registered");
        Ok(account)
    }

    /// Register a retailer account together with its store profile.
    ///
    /// # Errors
    ///
    /// Same as [`Self::register`], plus `AuthError::Validation` if the store
    /// name is empty.
    #[instrument(skip_all)]
    pub async fn register_retailer(
        &self,
        name: &str,
        email: &str,
        password: &str,
        store_name: &str,
    ) -> Result<(Account, RetailerProfile), AuthError> {
        let store_name = required(store_name, "storeName")?;
        let new = self
            .prepare(&Registration {
                name,
                email,
                password,
                role: Role::Retailer,
            })
            .await?;

        let (account, profile) = self
            .accounts
            .create_retailer(new, store_name)
            .await
            .map_err(map_duplicate)?;

        tracing::info!(account_id = %account.id, "Retailer registered");
        Ok((account, profile))
    }

    /// Login with email and password; returns the account and a fresh token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is unknown or the
    /// password is wrong.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<(Account, String), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (account, password_hash) = self
            .accounts
            .get_with_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.hasher.verify(password, &password_hash).await? {
            tracing::debug!(account_id = %account.id, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(&account)?;
        Ok((account, token))
    }

    /// Login that only succeeds for retailer accounts.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for wrong credentials and for
    /// non-retailer accounts alike.
    pub async fn login_retailer(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(Account, String), AuthError> {
        let (account, token) = self.login(email, password).await?;
        if account.role != Role::Retailer {
            return Err(AuthError::InvalidCredentials);
        }
        Ok((account, token))
    }

    /// Replace an account's password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if the new password is empty and
    /// `AuthError::AccountNotFound` if the account vanished.
    #[instrument(skip_all, fields(account_id = %account.id))]
    pub async fn change_password(&self, account: &Account, password: &str) -> Result<(), AuthError> {
        let password = required(password, "password")?;
        let password_hash = self.hasher.hash(password).await?;

        self.accounts
            .update_password_hash(account.id, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::AccountNotFound,
                other => AuthError::Repository(other),
            })?;

        tracing::info!("Password changed");
        Ok(())
    }

    /// Delete an account. Its products stay in the catalog without an owner.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository(RepositoryError::NotFound)` if the
    /// account is already gone.
    #[instrument(skip_all, fields(account_id = %account.id))]
    pub async fn delete_account(&self, account: &Account) -> Result<(), AuthError> {
        self.accounts.delete(account.id).await?;
        tracing::info!("Account deleted");
        Ok(())
    }

    /// The store profile of a retailer account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ProfileNotFound` if the account has no profile.
    pub async fn retailer_profile(&self, account: &Account) -> Result<RetailerProfile, AuthError> {
        self.accounts
            .get_retailer_profile(account.id)
            .await?
            .ok_or(AuthError::ProfileNotFound)
    }

    // =========================================================================
    // Account Administration
    // =========================================================================

    /// Update any account's name, email, or password. A new password is
    /// re-hashed; the role and cart are untouched.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownAccount` if `id` names no account,
    /// `AuthError::Validation` if no field is given or a given field is blank,
    /// and `AuthError::AccountAlreadyExists` if the new email is taken.
    #[instrument(skip(self, update))]
    pub async fn update_account(
        &self,
        id: &str,
        update: AccountUpdate<'_>,
    ) -> Result<Account, AuthError> {
        let id = parse_account_id(id)?;

        let mut changes = AccountChanges {
            name: update
                .name
                .map(|name| required(name, "name").map(str::to_owned))
                .transpose()?,
            email: update.email.map(Email::parse).transpose()?,
            password_hash: None,
        };
        if let Some(password) = update.password {
            let password = required(password, "password")?;
            changes.password_hash = Some(self.hasher.hash(password).await?);
        }
        if changes.is_empty() {
            return Err(AuthError::Validation("no changes given".to_owned()));
        }

        let account = self
            .accounts
            .update(id, &changes)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UnknownAccount,
                other => map_duplicate(other),
            })?;

        tracing::info!(account_id = %account.id, "Account updated by operator");
        Ok(account)
    }

    /// Delete any account by id.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownAccount` if `id` names no account.
    #[instrument(skip(self))]
    pub async fn remove_account(&self, id: &str) -> Result<(), AuthError> {
        let id = parse_account_id(id)?;
        self.accounts.delete(id).await.map_err(|e| match e {
            RepositoryError::NotFound => AuthError::UnknownAccount,
            other => AuthError::Repository(other),
        })?;

        tracing::info!(account_id = %id, "Account deleted by operator");
        Ok(())
    }

    // =========================================================================
    // Request Authentication
    // =========================================================================

    /// Resolve a bearer token to its live account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token does not verify and
    /// `AuthError::AccountNotFound` if it verifies but the account is gone.
    pub async fn authenticate_bearer(&self, token: &str) -> Result<Account, AuthError> {
        let claims = self.tokens.verify(token)?;

        self.accounts
            .get_by_id(claims.sub)
            .await?
            .ok_or(AuthError::AccountNotFound)
    }

    /// Check operator credentials.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown username or a
    /// wrong password.
    pub async fn authenticate_operator(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Operator, AuthError> {
        let (operator, password_hash) = self
            .operators
            .get_with_password_hash(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.hasher.verify(password, &password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(operator)
    }

    // =========================================================================
    // Operator Management
    // =========================================================================

    /// Create an operator or reset its password.
    ///
    /// # Errors
    ///
    /// See [`store_operator`].
    pub async fn ensure_operator(&self, username: &str, password: &str) -> Result<Operator, AuthError> {
        store_operator(self.operators, self.hasher, username, password).await
    }

    /// Remove an operator. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the store fails.
    pub async fn remove_operator(&self, username: &str) -> Result<bool, AuthError> {
        delete_operator(self.operators, username).await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn prepare(&self, registration: &Registration<'_>) -> Result<NewAccount, AuthError> {
        let name = required(registration.name, "name")?;
        let email = Email::parse(registration.email)?;
        let password = required(registration.password, "password")?;

        Ok(NewAccount {
            name: name.to_owned(),
            email,
            role: registration.role,
            password_hash: self.hasher.hash(password).await?,
        })
    }
}

/// Hash `password` and store it for `username`, creating the operator if
/// needed. Used by the startup bootstrap and by `sk-cli`.
///
/// # Errors
///
/// Returns `AuthError::Validation` if the username or password is empty, or
/// the username contains `:` (it could not be sent via HTTP Basic).
#[instrument(skip(operators, hasher, password))]
pub async fn store_operator(
    operators: &dyn OperatorRepository,
    hasher: &PasswordHasher,
    username: &str,
    password: &str,
) -> Result<Operator, AuthError> {
    let username = required(username, "username")?;
    if username.contains(':') {
        return Err(AuthError::Validation(
            "username cannot contain ':'".to_owned(),
        ));
    }
    let password = required(password, "password")?;

    let password_hash = hasher.hash(password).await?;
    let operator = operators.upsert(username, &password_hash).await?;

    tracing::info!(operator_id = %operator.id, "Operator credentials stored");
    Ok(operator)
}

/// Remove the operator named `username`. Returns `false` if there was none.
///
/// # Errors
///
/// Returns `AuthError::Repository` if the store fails.
#[instrument(skip(operators))]
pub async fn delete_operator(
    operators: &dyn OperatorRepository,
    username: &str,
) -> Result<bool, AuthError> {
    let removed = operators.delete(username).await?;
    if removed {
        tracing::info!("Operator removed");
    }
    Ok(removed)
}

/// Malformed ids name no account.
fn parse_account_id(id: &str) -> Result<AccountId, AuthError> {
    id.parse().map_err(|_| AuthError::UnknownAccount)
}

/// Reject empty or whitespace-only values.
fn required<'v>(value: &'v str, field: &str) -> Result<&'v str, AuthError> {
    if value.trim().is_empty() {
        return Err(AuthError::Validation(format!("{field} is required")));
    }
    Ok(value)
}

fn map_duplicate(e: RepositoryError) -> AuthError {
    match e {
        RepositoryError::Conflict(_) => AuthError::AccountAlreadyExists,
        other => AuthError::Repository(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;
    use crate::config::{PasswordHashConfig, SigningKey, TokenConfig};

    struct Fixture {
        repos: Repositories,
        hasher: PasswordHasher,
        tokens: TokenIssuer,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                repos: Repositories::in_memory(),
                hasher: PasswordHasher::new(&PasswordHashConfig {
                    memory_kib: 1024,
                    iterations: 1,
                    parallelism: 1,
                })
                .unwrap(),
                tokens: TokenIssuer::new(&TokenConfig {
                    signing_key: SigningKey {
                        id: "test".to_string(),
                        secret: SecretString::from("unit-test-signing-key"),
                    },
                    previous_keys: Vec::new(),
                    ttl: Duration::from_secs(60),
                }),
            }
        }

        fn auth(&self) -> AuthService<'_> {
            AuthService::new(&self.repos, &self.hasher, &self.tokens)
        }
    }

    fn customer<'r>(email: &'r str, password: &'r str) -> Registration<'r> {
        Registration {
            name: "Ann",
            email,
            password,
            role: Role::Customer,
        }
    }

    #[tokio::test]
    async fn test_register_login_authenticate() {
        let fx = Fixture::new();
        let auth = fx.auth();

        let account = auth.register(customer("ann@x.io", "p1")).await.unwrap();
        let (logged_in, token) = auth.login("ANN@x.io", "p1").await.unwrap();
        assert_eq!(logged_in.id, account.id);

        let resolved = auth.authenticate_bearer(&token).await.unwrap();
        assert_eq!(resolved.id, account.id);
    }

    #[tokio::test]
    async fn test_register_validation() {
        let fx = Fixture::new();
        let auth = fx.auth();

        assert!(matches!(
            auth.register(customer("ann@x.io", "")).await,
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            auth.register(customer("nope", "p1")).await,
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            auth.register(Registration {
                name: "  ",
                ..customer("ann@x.io", "p1")
            })
            .await,
            Err(AuthError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let fx = Fixture::new();
        let auth = fx.auth();

        auth.register(customer("ann@x.io", "p1")).await.unwrap();
        assert!(matches!(
            auth.register(customer("ann@x.io", "p2")).await,
            Err(AuthError::AccountAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email() {
        let fx = Fixture::new();
        let auth = fx.auth();
        auth.register(customer("ann@x.io", "p1")).await.unwrap();

        assert!(matches!(
            auth.login("ann@x.io", "p2").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("bob@x.io", "p1").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_retailer_login_rejects_customers() {
        let fx = Fixture::new();
        let auth = fx.auth();
        auth.register(customer("ann@x.io", "p1")).await.unwrap();
        let (retailer, profile) = auth
            .register_retailer("Rita", "rita@x.io", "p1", "Rita's")
            .await
            .unwrap();
        assert_eq!(retailer.role, Role::Retailer);
        assert_eq!(profile.store_name, "Rita's");

        assert!(matches!(
            auth.login_retailer("ann@x.io", "p1").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(auth.login_retailer("rita@x.io", "p1").await.is_ok());
    }

    #[tokio::test]
    async fn test_token_for_deleted_account() {
        let fx = Fixture::new();
        let auth = fx.auth();
        auth.register(customer("ann@x.io", "p1")).await.unwrap();
        let (account, token) = auth.login("ann@x.io", "p1").await.unwrap();

        auth.delete_account(&account).await.unwrap();

        assert!(matches!(
            auth.authenticate_bearer(&token).await,
            Err(AuthError::AccountNotFound)
        ));
    }

    #[tokio::test]
    async fn test_change_password() {
        let fx = Fixture::new();
        let auth = fx.auth();
        let account = auth.register(customer("ann@x.io", "p1")).await.unwrap();

        auth.change_password(&account, "p2").await.unwrap();

        assert!(auth.login("ann@x.io", "p1").await.is_err());
        assert!(auth.login("ann@x.io", "p2").await.is_ok());
    }

    #[tokio::test]
    async fn test_operator_credentials() {
        let fx = Fixture::new();
        let auth = fx.auth();

        auth.ensure_operator("ops", "first").await.unwrap();
        assert!(auth.authenticate_operator("ops", "first").await.is_ok());

        auth.ensure_operator("ops", "second").await.unwrap();
        assert!(matches!(
            auth.authenticate_operator("ops", "first").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.authenticate_operator("ghost", "second").await,
            Err(AuthError::InvalidCredentials)
        ));

        assert!(auth.remove_operator("ops").await.unwrap());
        assert!(!auth.remove_operator("ops").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_operator_revokes_basic_login() {
        let fx = Fixture::new();
        let auth = fx.auth();
        auth.ensure_operator("ops", "pw").await.unwrap();

        let operators = fx.repos.operators.as_ref();
        assert!(delete_operator(operators, "ops").await.unwrap());
        assert!(!delete_operator(operators, "ops").await.unwrap());
        assert!(matches!(
            auth.authenticate_operator("ops", "pw").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_operator_username_rules() {
        let fx = Fixture::new();
        let auth = fx.auth();
        assert!(matches!(
            auth.ensure_operator("a:b", "pw").await,
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            auth.ensure_operator("ops", "").await,
            Err(AuthError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_account_rehashes_and_renames() {
        let fx = Fixture::new();
        let auth = fx.auth();
        let account = auth.register(customer("ann@x.io", "p1")).await.unwrap();

        let updated = auth
            .update_account(
                &account.id.to_string(),
                AccountUpdate {
                    name: Some("Annie"),
                    email: Some("annie@x.io"),
                    password: Some("p2"),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.id, account.id);
        assert_eq!(updated.name, "Annie");
        assert_eq!(updated.email.as_str(), "annie@x.io");
        assert_eq!(updated.role, Role::Customer);

        assert!(auth.login("ann@x.io", "p1").await.is_err());
        assert!(auth.login("annie@x.io", "p1").await.is_err());
        assert!(auth.login("annie@x.io", "p2").await.is_ok());
    }

    #[tokio::test]
    async fn test_update_account_errors() {
        let fx = Fixture::new();
        let auth = fx.auth();
        let ann = auth.register(customer("ann@x.io", "p1")).await.unwrap();
        auth.register(customer("bob@x.io", "p1")).await.unwrap();
        let id = ann.id.to_string();

        assert!(matches!(
            auth.update_account(&id, AccountUpdate::default()).await,
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            auth.update_account(
                &id,
                AccountUpdate {
                    name: Some(" "),
                    ..Default::default()
                }
            )
            .await,
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            auth.update_account(
                &id,
                AccountUpdate {
                    email: Some("BOB@x.io"),
                    ..Default::default()
                }
            )
            .await,
            Err(AuthError::AccountAlreadyExists)
        ));
        assert!(matches!(
            auth.update_account(
                &AccountId::generate().to_string(),
                AccountUpdate {
                    name: Some("Ghost"),
                    ..Default::default()
                }
            )
            .await,
            Err(AuthError::UnknownAccount)
        ));
        assert!(matches!(
            auth.update_account(
                "not-an-id",
                AccountUpdate {
                    name: Some("Ghost"),
                    ..Default::default()
                }
            )
            .await,
            Err(AuthError::UnknownAccount)
        ));
    }

    #[tokio::test]
    async fn test_remove_account() {
        let fx = Fixture::new();
        let auth = fx.auth();
        let account = auth.register(customer("ann@x.io", "p1")).await.unwrap();
        let id = account.id.to_string();

        auth.remove_account(&id).await.unwrap();
        assert!(matches!(
            auth.remove_account(&id).await,
            Err(AuthError::UnknownAccount)
        ));
        assert!(matches!(
            auth.login("ann@x.io", "p1").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_retailer_profile() {
        let fx = Fixture::new();
        let auth = fx.auth();
        let (retailer, _) = auth
            .register_retailer("Rita", "rita@x.io", "r1", "Rita's Lamps")
            .await
            .unwrap();
        let profile = auth.retailer_profile(&retailer).await.unwrap();
        assert_eq!(profile.account_id, retailer.id);
        assert_eq!(profile.store_name, "Rita's Lamps");

        let ann = auth.register(customer("ann@x.io", "p1")).await.unwrap();
        assert!(matches!(
            auth.retailer_profile(&ann).await,
            Err(AuthError::ProfileNotFound)
        ));
    }
}
