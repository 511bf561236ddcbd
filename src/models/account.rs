//! Account data models and API request/response types.
//!
//! This module defines:
//! - `Account`: Database entity representing an account
//! - `CreateAccountRequest`: Request body for creating accounts
//! - `AccountResponse` / `AccountFullInfo`: Response bodies returned to clients

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::currency::Currency;

/// Represents an account record from the database.
///
/// # Database Table
///
/// Maps to the `accounts` table. Each account:
/// - Belongs to one customer (via `customer_id`)
/// - Is unique per `(customer_id, currency)`
/// - Holds no balance; balances live in the external ledger
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,

    /// Foreign key to the owning customer
    pub customer_id: Uuid,

    pub currency: Currency,

    pub is_deactivated: bool,

    pub date_created: DateTime<Utc>,
}

impl Account {
    /// Build a new, active account for `customer_id`.
    pub fn new(customer_id: Uuid, currency: Currency) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            currency,
            is_deactivated: false,
            date_created: Utc::now(),
        }
    }
}

/// Request body for creating a new account.
///
/// # JSON Example
///
/// ```json
/// {
///   "currency": "EUR"
/// }
/// ```
///
/// The owner is always the authenticated caller.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub currency: Currency,
}

/// Response body for a freshly created resource.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

/// Short account view used in listings.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "customer_id": "660e8400-e29b-41d4-a716-446655440001",
///   "currency": "RUB",
///   "is_deactivated": false
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub currency: Currency,
    pub is_deactivated: bool,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            customer_id: account.customer_id,
            currency: account.currency,
            is_deactivated: account.is_deactivated,
        }
    }
}

/// Local account fields merged with the balance reported by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountFullInfo {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub currency: Currency,
    pub is_deactivated: bool,
    pub date_created: DateTime<Utc>,
    pub balance: Decimal,
}

impl AccountFullInfo {
    pub fn new(account: Account, balance: Decimal) -> Self {
        Self {
            id: account.id,
            customer_id: account.customer_id,
            currency: account.currency,
            is_deactivated: account.is_deactivated,
            date_created: account.date_created,
            balance,
        }
    }
}
