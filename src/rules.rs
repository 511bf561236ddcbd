//! Business rules shared by the consistency services.
//!
//! Every function here is pure: it looks at already loaded entities and
//! answers yes or no. Services turn a "no" into a typed error.

use crate::models::{
    account::Account,
    currency::{Currency, CurrencyTier},
    customer::Customer,
    role::Role,
};

/// Whether `customer` may hold an account in `currency`.
///
/// Deactivated customers may not open accounts. Otherwise the customer's
/// role decides which currency tiers are available.
pub fn can_own_account(customer: &Customer, currency: Currency) -> bool {
    if customer.is_deactivated {
        return false;
    }
    customer.role.currency_tiers().contains(&currency.tier())
}

/// Admin and Unknown roles are assigned outside this service and never
/// become VIP, manually or by batch.
pub fn can_grant_vip(customer: &Customer) -> bool {
    matches!(customer.role, Role::Regular | Role::Vip)
}

/// Whether deposits and withdrawals are allowed for `currency`, whatever the role.
pub fn is_simple_transactable(currency: Currency) -> bool {
    Currency::SIMPLE_TRANSACTABLE.contains(&currency)
}

/// The RUB account is the customer's permanent anchor and stays active.
pub fn can_deactivate_account(account: &Account) -> bool {
    account.currency != Currency::Rub
}

/// Whether money may leave `from` towards `to`.
///
/// Active sources are unrestricted here. A deactivated source is only
/// allowed to drain into a RUB account, and only when it holds a VIP-tier
/// currency (those are deactivated by role changes, not by admins).
/// Deactivated destinations are rejected separately by the caller.
pub fn can_transfer_from(from: &Account, to: &Account) -> bool {
    if !from.is_deactivated {
        return true;
    }
    to.currency == Currency::Rub && from.currency.tier() == CurrencyTier::Vip
}
