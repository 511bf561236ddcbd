//! State-change notifications published after successful writes.
//!
//! # Notification Flow
//!
//! 1. A service commits a change (customer, account or batch role update)
//! 2. It builds a `Notification` describing the new state
//! 3. The configured notifier wraps it in a `NotificationPayload` and delivers it
//! 4. Delivery failures are logged and never undo the committed change

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::account::Account;
use crate::models::currency::Currency;
use crate::models::customer::Customer;
use crate::models::role::Role;

/// Customer snapshot carried by notifications. Never includes the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerMessage {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub is_deactivated: bool,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub birth_date: NaiveDate,
    pub custom_vip_due_date: Option<DateTime<Utc>>,
}

impl From<&Customer> for CustomerMessage {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id,
            email: customer.email.clone(),
            role: customer.role,
            is_deactivated: customer.is_deactivated,
            first_name: customer.first_name.clone(),
            last_name: customer.last_name.clone(),
            phone: customer.phone.clone(),
            address: customer.address.clone(),
            birth_date: customer.birth_date,
            custom_vip_due_date: customer.custom_vip_due_date,
        }
    }
}

/// Account snapshot carried by notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountMessage {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub currency: Currency,
    pub is_deactivated: bool,
    pub date_created: DateTime<Utc>,
}

impl From<&Account> for AccountMessage {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            customer_id: account.customer_id,
            currency: account.currency,
            is_deactivated: account.is_deactivated,
            date_created: account.date_created,
        }
    }
}

/// A state change worth telling upstream systems about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Notification {
    CustomerRegistered {
        customer: CustomerMessage,
        account: AccountMessage,
    },
    CustomerChanged {
        customer: CustomerMessage,
    },
    AccountChanged {
        account: AccountMessage,
    },
    /// Customers whose role changed during a batch recomputation.
    RolesChanged {
        customer_ids: Vec<Uuid>,
    },
}

impl Notification {
    pub fn customer_registered(customer: &Customer, account: &Account) -> Self {
        Self::CustomerRegistered {
            customer: customer.into(),
            account: account.into(),
        }
    }

    pub fn customer_changed(customer: &Customer) -> Self {
        Self::CustomerChanged {
            customer: customer.into(),
        }
    }

    pub fn account_changed(account: &Account) -> Self {
        Self::AccountChanged {
            account: account.into(),
        }
    }

    pub fn roles_changed(customer_ids: Vec<Uuid>) -> Self {
        Self::RolesChanged { customer_ids }
    }

    /// Event type string, e.g. `customer.changed`.
    pub fn event_type(&self) -> &'static str {
        match self {
            Notification::CustomerRegistered { .. } => "customer.registered",
            Notification::CustomerChanged { .. } => "customer.changed",
            Notification::AccountChanged { .. } => "account.changed",
            Notification::RolesChanged { .. } => "roles.changed",
        }
    }
}

/// Envelope sent to the notification endpoint.
///
/// # Example
///
/// ```json
/// {
///   "event_type": "account.changed",
///   "event_id": "550e8400-e29b-41d4-a716-446655440000",
///   "created_at": "2025-02-10T12:00:00Z",
///   "notification": {
///     "kind": "account_changed",
///     "data": { "account": { "id": "...", "currency": "JPY", "is_deactivated": true } }
///   }
/// }
/// ```
///
/// # Signature Verification
///
/// Deliveries carry an `X-Signature` header with format `sha256=<hex_encoded_hmac>`,
/// computed as HMAC-SHA256(secret, json_body).
#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub event_type: String,
    pub event_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub notification: Notification,
}

impl NotificationPayload {
    pub fn new(event_id: Uuid, notification: Notification) -> Self {
        Self {
            event_type: notification.event_type().to_string(),
            event_id,
            created_at: Utc::now(),
            notification,
        }
    }
}
