//! Domain models for the API.
//!
//! These types represent validated domain objects separate from database row
//! types. Password hashes never appear here; they are only returned by the
//! dedicated credential lookups in [`crate::db`].

pub mod account;
pub mod operator;
pub mod product;

pub use account::{Account, AccountChanges, NewAccount, RetailerProfile};
pub use operator::Operator;
pub use product::{NewProduct, Product, ProductChanges, WriteScope};
