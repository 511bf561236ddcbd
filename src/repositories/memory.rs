//! In-process store implementing both repositories and the unit of work.
//!
//! Mirrors the PostgreSQL schema constraints (unique email, unique
//! `(customer_id, currency)`, account owner must exist) so that services
//! behave the same against either backend.
//!
//! A `MemoryWorkScope` stages its writes against a private copy of the state
//! and replays them onto the shared state at commit, under one lock. Either
//! every staged write lands or none does.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    models::{
        account::Account,
        customer::{Customer, CustomerProfile},
        role::Role,
    },
    repositories::{
        AccountFilter, AccountRepository, CustomerFilter, CustomerRepository, Page,
        RepositoryError, RepositoryResult, StoreProbe,
    },
    unit_of_work::{RoleChange, UnitOfWork, WorkScope},
};

/// Category of write, used to inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteKind {
    CreateCustomer,
    CreateAccount,
    UpdateCustomer,
    UpdateRoles,
    UpdateAccounts,
    Delete,
    Commit,
}

#[derive(Debug, Clone)]
enum Write {
    CreateCustomer(Customer),
    CreateAccount(Account),
    UpdateProfile { id: Uuid, profile: CustomerProfile },
    UpdatePassword { id: Uuid, password_hash: String },
    SetCustomersDeactivated { ids: Vec<Uuid>, is_deactivated: bool },
    SetManualVip { id: Uuid, due_date: DateTime<Utc> },
    UpdateRoles(Vec<RoleChange>),
    SetAccountsDeactivated { ids: Vec<Uuid>, is_deactivated: bool },
    DeleteAccountsOf(Uuid),
    DeleteCustomer(Uuid),
}

impl Write {
    fn kind(&self) -> WriteKind {
        match self {
            Write::CreateCustomer(_) => WriteKind::CreateCustomer,
            Write::CreateAccount(_) => WriteKind::CreateAccount,
            Write::UpdateProfile { .. }
            | Write::UpdatePassword { .. }
            | Write::SetCustomersDeactivated { .. }
            | Write::SetManualVip { .. } => WriteKind::UpdateCustomer,
            Write::UpdateRoles(_) => WriteKind::UpdateRoles,
            Write::SetAccountsDeactivated { .. } => WriteKind::UpdateAccounts,
            Write::DeleteAccountsOf(_) | Write::DeleteCustomer(_) => WriteKind::Delete,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    customers: HashMap<Uuid, Customer>,
    accounts: HashMap<Uuid, Account>,
}

impl MemoryState {
    /// Apply one write. Validation happens before any mutation, so a failed
    /// write leaves the state untouched.
    fn apply(&mut self, write: &Write) -> RepositoryResult<()> {
        match write {
            Write::CreateCustomer(customer) => {
                if self.customers.contains_key(&customer.id) {
                    return Err(RepositoryError::UniqueViolation(format!(
                        "customer id {}",
                        customer.id
                    )));
                }
                if self.customers.values().any(|c| c.email == customer.email) {
                    return Err(RepositoryError::UniqueViolation(format!(
                        "customer email {}",
                        customer.email
                    )));
                }
                self.customers.insert(customer.id, customer.clone());
            }
            Write::CreateAccount(account) => {
                if !self.customers.contains_key(&account.customer_id) {
                    return Err(RepositoryError::RowNotFound(format!(
                        "customer {}",
                        account.customer_id
                    )));
                }
                if self.accounts.contains_key(&account.id) {
                    return Err(RepositoryError::UniqueViolation(format!(
                        "account id {}",
                        account.id
                    )));
                }
                if self
                    .accounts
                    .values()
                    .any(|a| a.customer_id == account.customer_id && a.currency == account.currency)
                {
                    return Err(RepositoryError::UniqueViolation(format!(
                        "account ({}, {})",
                        account.customer_id, account.currency
                    )));
                }
                self.accounts.insert(account.id, account.clone());
            }
            Write::UpdateProfile { id, profile } => {
                let customer = self.customer_mut(*id)?;
                customer.first_name = profile.first_name.clone();
                customer.last_name = profile.last_name.clone();
                customer.phone = profile.phone.clone();
                customer.address = profile.address.clone();
            }
            Write::UpdatePassword { id, password_hash } => {
                self.customer_mut(*id)?.password_hash = password_hash.clone();
            }
            Write::SetCustomersDeactivated { ids, is_deactivated } => {
                for id in ids {
                    if let Some(customer) = self.customers.get_mut(id) {
                        customer.is_deactivated = *is_deactivated;
                    }
                }
            }
            Write::SetManualVip { id, due_date } => {
                let customer = self.customer_mut(*id)?;
                customer.role = Role::Vip;
                customer.custom_vip_due_date = Some(*due_date);
            }
            Write::UpdateRoles(changes) => {
                for change in changes {
                    if let Some(customer) = self.customers.get_mut(&change.customer_id) {
                        customer.role = change.role;
                    }
                }
            }
            Write::SetAccountsDeactivated { ids, is_deactivated } => {
                for id in ids {
                    if let Some(account) = self.accounts.get_mut(id) {
                        account.is_deactivated = *is_deactivated;
                    }
                }
            }
            Write::DeleteAccountsOf(customer_id) => {
                self.accounts.retain(|_, a| a.customer_id != *customer_id);
            }
            Write::DeleteCustomer(id) => {
                if self.accounts.values().any(|a| a.customer_id == *id) {
                    return Err(RepositoryError::Storage(format!(
                        "customer {id} still owns accounts"
                    )));
                }
                if self.customers.remove(id).is_none() {
                    return Err(RepositoryError::RowNotFound(format!("customer {id}")));
                }
            }
        }
        Ok(())
    }

    fn customer_mut(&mut self, id: Uuid) -> RepositoryResult<&mut Customer> {
        self.customers
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::RowNotFound(format!("customer {id}")))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> RepositoryResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Storage("memory store lock poisoned".to_string()))
}

#[derive(Debug, Default)]
struct Failures {
    kinds: Mutex<HashSet<WriteKind>>,
}

impl Failures {
    fn check(&self, kind: WriteKind) -> RepositoryResult<()> {
        if lock(&self.kinds)?.contains(&kind) {
            return Err(RepositoryError::Storage(format!(
                "injected failure on {kind:?}"
            )));
        }
        Ok(())
    }
}

/// Shared in-memory store. Cloning shares the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    failures: Arc<Failures>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write of `kind` fail until cleared.
    pub fn fail_on(&self, kind: WriteKind) {
        if let Ok(mut kinds) = self.failures.kinds.lock() {
            kinds.insert(kind);
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut kinds) = self.failures.kinds.lock() {
            kinds.clear();
        }
    }

    fn write(&self, write: Write) -> RepositoryResult<()> {
        self.failures.check(write.kind())?;
        lock(&self.state)?.apply(&write)
    }
}

#[async_trait]
impl CustomerRepository for MemoryStore {
    async fn create(&self, customer: &Customer) -> RepositoryResult<()> {
        self.write(Write::CreateCustomer(customer.clone()))
    }

    async fn get_by_condition(&self, filter: &CustomerFilter) -> RepositoryResult<Option<Customer>> {
        let state = lock(&self.state)?;
        Ok(state.customers.values().find(|c| filter.matches(c)).cloned())
    }

    async fn get_all_by_condition(&self, filter: &CustomerFilter) -> RepositoryResult<Vec<Customer>> {
        let state = lock(&self.state)?;
        let mut customers: Vec<Customer> = state
            .customers
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        sort_customers(&mut customers);
        Ok(customers)
    }

    async fn get_all(&self, page: Page) -> RepositoryResult<Vec<Customer>> {
        let state = lock(&self.state)?;
        let mut customers: Vec<Customer> = state.customers.values().cloned().collect();
        sort_customers(&mut customers);
        Ok(paginate(customers, page))
    }

    async fn update_profile(&self, id: Uuid, profile: &CustomerProfile) -> RepositoryResult<()> {
        self.write(Write::UpdateProfile {
            id,
            profile: profile.clone(),
        })
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> RepositoryResult<()> {
        self.write(Write::UpdatePassword {
            id,
            password_hash: password_hash.to_string(),
        })
    }

    async fn activate(&self, ids: &[Uuid]) -> RepositoryResult<()> {
        self.write(Write::SetCustomersDeactivated {
            ids: ids.to_vec(),
            is_deactivated: false,
        })
    }

    async fn deactivate(&self, ids: &[Uuid]) -> RepositoryResult<()> {
        self.write(Write::SetCustomersDeactivated {
            ids: ids.to_vec(),
            is_deactivated: true,
        })
    }
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn create(&self, account: &Account) -> RepositoryResult<()> {
        self.write(Write::CreateAccount(account.clone()))
    }

    async fn get_by_condition(&self, filter: &AccountFilter) -> RepositoryResult<Option<Account>> {
        let state = lock(&self.state)?;
        Ok(state.accounts.values().find(|a| filter.matches(a)).cloned())
    }

    async fn get_all_by_condition(&self, filter: &AccountFilter) -> RepositoryResult<Vec<Account>> {
        let state = lock(&self.state)?;
        let mut accounts: Vec<Account> = state
            .accounts
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        sort_accounts(&mut accounts);
        Ok(accounts)
    }

    async fn get_all(&self, page: Page) -> RepositoryResult<Vec<Account>> {
        let state = lock(&self.state)?;
        let mut accounts: Vec<Account> = state.accounts.values().cloned().collect();
        sort_accounts(&mut accounts);
        Ok(paginate(accounts, page))
    }

    async fn activate(&self, ids: &[Uuid]) -> RepositoryResult<()> {
        self.write(Write::SetAccountsDeactivated {
            ids: ids.to_vec(),
            is_deactivated: false,
        })
    }

    async fn deactivate(&self, ids: &[Uuid]) -> RepositoryResult<()> {
        self.write(Write::SetAccountsDeactivated {
            ids: ids.to_vec(),
            is_deactivated: true,
        })
    }
}

#[async_trait]
impl StoreProbe for MemoryStore {
    async fn ping(&self) -> RepositoryResult<()> {
        lock(&self.state).map(|_| ())
    }
}

#[async_trait]
impl UnitOfWork for MemoryStore {
    async fn begin(&self) -> RepositoryResult<Box<dyn WorkScope>> {
        let working = lock(&self.state)?.clone();
        Ok(Box::new(MemoryWorkScope {
            state: Arc::clone(&self.state),
            failures: Arc::clone(&self.failures),
            working,
            staged: Vec::new(),
        }))
    }
}

/// Open transaction on a `MemoryStore`.
pub struct MemoryWorkScope {
    state: Arc<Mutex<MemoryState>>,
    failures: Arc<Failures>,
    working: MemoryState,
    staged: Vec<Write>,
}

impl MemoryWorkScope {
    fn stage(&mut self, write: Write) -> RepositoryResult<()> {
        self.failures.check(write.kind())?;
        self.working.apply(&write)?;
        self.staged.push(write);
        Ok(())
    }
}

#[async_trait]
impl WorkScope for MemoryWorkScope {
    async fn create_customer(&mut self, customer: &Customer) -> RepositoryResult<()> {
        self.stage(Write::CreateCustomer(customer.clone()))
    }

    async fn create_account(&mut self, account: &Account) -> RepositoryResult<()> {
        self.stage(Write::CreateAccount(account.clone()))
    }

    async fn set_manual_vip(
        &mut self,
        customer_id: Uuid,
        due_date: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        self.stage(Write::SetManualVip {
            id: customer_id,
            due_date,
        })
    }

    async fn update_roles(&mut self, changes: &[RoleChange]) -> RepositoryResult<()> {
        self.stage(Write::UpdateRoles(changes.to_vec()))
    }

    async fn set_accounts_deactivated(
        &mut self,
        account_ids: &[Uuid],
        is_deactivated: bool,
    ) -> RepositoryResult<()> {
        self.stage(Write::SetAccountsDeactivated {
            ids: account_ids.to_vec(),
            is_deactivated,
        })
    }

    async fn delete_accounts_of(&mut self, customer_id: Uuid) -> RepositoryResult<()> {
        self.stage(Write::DeleteAccountsOf(customer_id))
    }

    async fn delete_customer(&mut self, customer_id: Uuid) -> RepositoryResult<()> {
        self.stage(Write::DeleteCustomer(customer_id))
    }

    async fn commit(self: Box<Self>) -> RepositoryResult<()> {
        self.failures.check(WriteKind::Commit)?;
        let mut shared = lock(&self.state)?;
        let mut next = shared.clone();
        for write in &self.staged {
            next.apply(write)?;
        }
        *shared = next;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> RepositoryResult<()> {
        Ok(())
    }
}

fn sort_customers(customers: &mut [Customer]) {
    customers.sort_by(|a, b| {
        (&a.last_name, &a.first_name, a.id).cmp(&(&b.last_name, &b.first_name, b.id))
    });
}

fn sort_accounts(accounts: &mut [Account]) {
    accounts.sort_by(|a, b| (a.date_created, a.id).cmp(&(b.date_created, b.id)));
}

fn paginate<T>(items: Vec<T>, page: Page) -> Vec<T> {
    items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::currency::Currency;
    use chrono::NaiveDate;

    fn customer(email: &str) -> Customer {
        Customer {
            id: Uuid::new_v4(),
            role: Role::Regular,
            is_deactivated: false,
            email: email.to_string(),
            password_hash: String::new(),
            first_name: "First".to_string(),
            last_name: "Last".to_string(),
            phone: "79990001122".to_string(),
            address: "Some street 10".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1991, 2, 3).unwrap(),
            custom_vip_due_date: None,
        }
    }

    #[tokio::test]
    async fn test_unique_email_enforced() {
        let store = MemoryStore::new();
        CustomerRepository::create(&store, &customer("a@b.com")).await.unwrap();

        let err = CustomerRepository::create(&store, &customer("a@b.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn test_account_requires_existing_owner() {
        let store = MemoryStore::new();
        let err = AccountRepository::create(&store, &Account::new(Uuid::new_v4(), Currency::Rub))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::RowNotFound(_)));
    }

    #[tokio::test]
    async fn test_scope_writes_invisible_until_commit() {
        let store = MemoryStore::new();
        let new_customer = customer("scope@b.com");

        let mut scope = store.begin().await.unwrap();
        scope.create_customer(&new_customer).await.unwrap();

        let filter = CustomerFilter::by_id(new_customer.id);
        assert!(CustomerRepository::get_by_condition(&store, &filter).await.unwrap().is_none());

        scope.commit().await.unwrap();
        assert!(CustomerRepository::get_by_condition(&store, &filter).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rolled_back_scope_leaves_no_trace() {
        let store = MemoryStore::new();
        let new_customer = customer("gone@b.com");

        let mut scope = store.begin().await.unwrap();
        scope.create_customer(&new_customer).await.unwrap();
        scope.rollback().await.unwrap();

        let found = CustomerRepository::get_by_condition(&store, &CustomerFilter::by_email("gone@b.com"))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_injected_failure_only_hits_its_kind() {
        let store = MemoryStore::new();
        store.fail_on(WriteKind::CreateAccount);

        let owner = customer("owner@b.com");
        CustomerRepository::create(&store, &owner).await.unwrap();
        assert!(AccountRepository::create(&store, &Account::new(owner.id, Currency::Rub)).await.is_err());

        store.clear_failures();
        assert!(AccountRepository::create(&store, &Account::new(owner.id, Currency::Rub)).await.is_ok());
    }

    #[tokio::test]
    async fn test_get_all_paginates_in_stable_order() {
        let store = MemoryStore::new();
        for i in 0..5 {
            let mut c = customer(&format!("c{i}@b.com"));
            c.last_name = format!("Last{i}");
            CustomerRepository::create(&store, &c).await.unwrap();
        }

        let second = CustomerRepository::get_all(&store, Page::new(Some(2), Some(2))).await.unwrap();
        let names: Vec<&str> = second.iter().map(|c| c.last_name.as_str()).collect();
        assert_eq!(names, vec!["Last2", "Last3"]);
    }
}
