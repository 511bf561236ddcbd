//! Query filters and pagination.
//!
//! A filter is a conjunction: every field that is set must hold. Unset
//! fields do not restrict the result.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    account::Account,
    currency::{Currency, CurrencyTier},
    customer::Customer,
    role::Role,
};

/// Filter over customers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerFilter {
    pub ids: Option<Vec<Uuid>>,
    pub exclude_ids: Option<Vec<Uuid>>,
    pub email: Option<String>,
    pub role: Option<Role>,
    /// Manual VIP grant is missing or expired before this instant.
    pub vip_expired_at: Option<DateTime<Utc>>,
}

impl CustomerFilter {
    pub fn by_id(id: Uuid) -> Self {
        Self {
            ids: Some(vec![id]),
            ..Self::default()
        }
    }

    pub fn by_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    pub fn with_ids(mut self, ids: Vec<Uuid>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn excluding_ids(mut self, ids: Vec<Uuid>) -> Self {
        self.exclude_ids = Some(ids);
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_vip_expired_at(mut self, now: DateTime<Utc>) -> Self {
        self.vip_expired_at = Some(now);
        self
    }

    pub fn matches(&self, customer: &Customer) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.contains(&customer.id) {
                return false;
            }
        }
        if let Some(ids) = &self.exclude_ids {
            if ids.contains(&customer.id) {
                return false;
            }
        }
        if let Some(email) = &self.email {
            if &customer.email != email {
                return false;
            }
        }
        if let Some(role) = self.role {
            if customer.role != role {
                return false;
            }
        }
        if let Some(now) = self.vip_expired_at {
            if customer.has_active_manual_vip(now) {
                return false;
            }
        }
        true
    }
}

/// Filter over accounts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountFilter {
    pub ids: Option<Vec<Uuid>>,
    pub customer_ids: Option<Vec<Uuid>>,
    pub currency: Option<Currency>,
    pub tier: Option<CurrencyTier>,
}

impl AccountFilter {
    pub fn by_id(id: Uuid) -> Self {
        Self {
            ids: Some(vec![id]),
            ..Self::default()
        }
    }

    pub fn by_customer(customer_id: Uuid) -> Self {
        Self {
            customer_ids: Some(vec![customer_id]),
            ..Self::default()
        }
    }

    pub fn by_customers(customer_ids: Vec<Uuid>) -> Self {
        Self {
            customer_ids: Some(customer_ids),
            ..Self::default()
        }
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    pub fn with_tier(mut self, tier: CurrencyTier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn matches(&self, account: &Account) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.contains(&account.id) {
                return false;
            }
        }
        if let Some(customer_ids) = &self.customer_ids {
            if !customer_ids.contains(&account.customer_id) {
                return false;
            }
        }
        if let Some(currency) = self.currency {
            if account.currency != currency {
                return false;
            }
        }
        if let Some(tier) = self.tier {
            if account.currency.tier() != tier {
                return false;
            }
        }
        true
    }
}

/// One page of a listing. Page numbers start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub const DEFAULT_SIZE: u32 = 10;
    pub const MAX_SIZE: u32 = 100;

    /// Normalize user input: missing or zero values fall back to defaults,
    /// oversized pages are capped.
    pub fn new(number: Option<u32>, size: Option<u32>) -> Self {
        let number = number.filter(|n| *n > 0).unwrap_or(1);
        let size = size
            .filter(|s| *s > 0)
            .unwrap_or(Self::DEFAULT_SIZE)
            .min(Self::MAX_SIZE);
        Self { number, size }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.size)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn vip(due: Option<DateTime<Utc>>) -> Customer {
        Customer {
            id: Uuid::new_v4(),
            role: Role::Vip,
            is_deactivated: false,
            email: "vip@example.com".to_string(),
            password_hash: String::new(),
            first_name: "V".to_string(),
            last_name: "P".to_string(),
            phone: "79990001122".to_string(),
            address: "Main street 7".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1985, 5, 5).unwrap(),
            custom_vip_due_date: due,
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(CustomerFilter::default().matches(&vip(None)));
        assert!(AccountFilter::default().matches(&Account::new(Uuid::new_v4(), Currency::Rub)));
    }

    #[test]
    fn test_vip_expiry_filter() {
        let now = Utc::now();
        let filter = CustomerFilter::default()
            .with_role(Role::Vip)
            .with_vip_expired_at(now);

        assert!(filter.matches(&vip(None)));
        assert!(filter.matches(&vip(Some(now - Duration::days(1)))));
        assert!(!filter.matches(&vip(Some(now + Duration::days(1)))));
    }

    #[test]
    fn test_exclusion_wins() {
        let customer = vip(None);
        let filter = CustomerFilter::default()
            .with_ids(vec![customer.id])
            .excluding_ids(vec![customer.id]);
        assert!(!filter.matches(&customer));
    }

    #[test]
    fn test_account_tier_filter() {
        let owner = Uuid::new_v4();
        let filter = AccountFilter::by_customer(owner).with_tier(CurrencyTier::Vip);

        assert!(filter.matches(&Account::new(owner, Currency::Jpy)));
        assert!(!filter.matches(&Account::new(owner, Currency::Eur)));
        assert!(!filter.matches(&Account::new(Uuid::new_v4(), Currency::Jpy)));
    }

    #[test]
    fn test_page_normalization() {
        assert_eq!(Page::new(None, None), Page { number: 1, size: 10 });
        assert_eq!(Page::new(Some(0), Some(0)), Page { number: 1, size: 10 });
        assert_eq!(Page::new(Some(3), Some(500)).size, Page::MAX_SIZE);
        assert_eq!(Page::new(Some(3), Some(20)).offset(), 40);
    }
}
