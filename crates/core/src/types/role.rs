//! Account roles.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role of a registered account. Fixed at registration.
///
/// Stored as the `shop.account_role` enum; queries cast it to text and parse
/// it back through [`FromStr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Shops and keeps a cart.
    #[default]
    Customer,
    /// Owns a store profile and manages its own products.
    Retailer,
}

impl Role {
    /// Returns the wire/database name of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Retailer => "retailer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0} (expected customer or retailer)")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "retailer" => Ok(Self::Retailer),
            other => Err(ParseRoleError(other.to_owned())),
        }
    }
}
