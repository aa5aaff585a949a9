//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::db::Repositories;
use crate::services::{AuthService, CartService, CatalogService, PasswordHasher, TokenIssuer};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid password hashing parameters: {0}")]
    PasswordHashing(String),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the repositories, the password hasher, and the token issuer.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    repos: Repositories,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the password hashing parameters are invalid.
    pub fn new(config: ApiConfig, repos: Repositories) -> Result<Self, StateError> {
        let hasher = PasswordHasher::new(&config.password_hashing)
            .map_err(StateError::PasswordHashing)?;
        let tokens = TokenIssuer::new(&config.tokens);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                repos,
                hasher,
                tokens,
            }),
        })
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the repositories.
    #[must_use]
    pub fn repos(&self) -> &Repositories {
        &self.inner.repos
    }

    /// Get a reference to the bearer token issuer.
    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.inner.tokens
    }

    /// Authentication service borrowing this state.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(&self.inner.repos, &self.inner.hasher, &self.inner.tokens)
    }

    /// Cart service borrowing this state.
    #[must_use]
    pub fn carts(&self) -> CartService<'_> {
        CartService::new(&self.inner.repos)
    }

    /// Catalog service borrowing this state.
    #[must_use]
    pub fn catalog(&self) -> CatalogService<'_> {
        CatalogService::new(&self.inner.repos)
    }
}
