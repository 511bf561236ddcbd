//! Customer roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::currency::CurrencyTier;

/// Role of a customer.
///
/// Maps to the `customer_role` PostgreSQL enum. `Admin` is assigned outside
/// of this service and never reached by registration or VIP transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "customer_role")]
pub enum Role {
    Unknown,
    Regular,
    #[serde(rename = "VIP")]
    #[sqlx(rename = "VIP")]
    Vip,
    Admin,
}

impl Role {
    /// Currency tiers a customer with this role may hold accounts in.
    pub fn currency_tiers(self) -> &'static [CurrencyTier] {
        match self {
            Role::Regular => &[CurrencyTier::Regular],
            Role::Vip => &[CurrencyTier::Regular, CurrencyTier::Vip],
            Role::Admin | Role::Unknown => &[],
        }
    }

    /// Whether this role may own accounts at all.
    pub fn can_hold_accounts(self) -> bool {
        !self.currency_tiers().is_empty()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Unknown => "Unknown",
            Role::Regular => "Regular",
            Role::Vip => "VIP",
            Role::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct ParseRoleError(String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Unknown" => Ok(Role::Unknown),
            "Regular" => Ok(Role::Regular),
            "VIP" => Ok(Role::Vip),
            "Admin" => Ok(Role::Admin),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_display() {
        for role in [Role::Unknown, Role::Regular, Role::Vip, Role::Admin] {
            assert_eq!(role.to_string().parse::<Role>(), Ok(role));
        }
        assert!("vip".parse::<Role>().is_err());
    }

    #[test]
    fn test_only_customers_hold_accounts() {
        assert!(Role::Regular.can_hold_accounts());
        assert!(Role::Vip.can_hold_accounts());
        assert!(!Role::Admin.can_hold_accounts());
        assert!(!Role::Unknown.can_hold_accounts());
    }
}
