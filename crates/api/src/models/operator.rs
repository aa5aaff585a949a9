//! Operator principal.
//!
//! Operators are back-office credentials for HTTP Basic auth. They are not
//! accounts: they have no cart, no role, and never receive bearer tokens.

use chrono::{DateTime, Utc};

use storekeep_core::OperatorId;

/// A back-office operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub id: OperatorId,
    pub username: String,
    pub created_at: DateTime<Utc>,
}
