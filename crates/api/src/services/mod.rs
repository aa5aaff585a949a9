//! Business services.
//!
//! Services borrow repositories from [`crate::state::AppState`] and are cheap
//! to construct per request.

pub mod auth;
pub mod cart;
pub mod catalog;

pub use auth::{
    AccountUpdate, AuthError, AuthService, PasswordHasher, Registration, TokenIssuer,
    delete_operator, store_operator,
};
pub use cart::{CartError, CartService, CartView, reconcile};
pub use catalog::{CatalogError, CatalogService, ProductDraft};
