//! Storekeep Core - Shared domain types.
//!
//! This crate provides the types used across all Storekeep components:
//! - `api` - HTTP API server (accounts, catalog, carts)
//! - `cli` - Command-line tools for migrations and operator management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
