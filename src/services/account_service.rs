//! Account lifecycle rules.
//!
//! Accounts carry no balance locally. Reads that need one merge the local
//! record with what the ledger reports.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        account::{Account, AccountFullInfo},
        caller::CallerIdentity,
        currency::Currency,
        notification::Notification,
        transaction::TransactionRecord,
    },
    repositories::{AccountFilter, AccountRepository, CustomerRepository, RepositoryError},
    rules,
    services::{
        ensure_customer_active, ledger_client::Ledger, load_account, load_customer,
        notification_service::{Notifier, notify},
    },
};

#[derive(Clone)]
pub struct AccountService {
    customers: Arc<dyn CustomerRepository>,
    accounts: Arc<dyn AccountRepository>,
    ledger: Arc<dyn Ledger>,
    notifier: Arc<dyn Notifier>,
}

impl AccountService {
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        accounts: Arc<dyn AccountRepository>,
        ledger: Arc<dyn Ledger>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            customers,
            accounts,
            ledger,
            notifier,
        }
    }

    /// Open an account in `currency` for `customer_id`.
    ///
    /// # Errors
    ///
    /// - `EntityNotFound`: customer does not exist
    /// - `EntityConflict`: role cannot hold accounts, customer deactivated,
    ///   currency already held, or currency outside the role's tiers
    pub async fn create_account(
        &self,
        customer_id: Uuid,
        currency: Currency,
    ) -> Result<Uuid, AppError> {
        let customer = load_customer(self.customers.as_ref(), customer_id).await?;

        if !customer.role.can_hold_accounts() {
            return Err(AppError::conflict(format!(
                "Role of customer with id {customer_id} is not correct."
            )));
        }
        ensure_customer_active(&customer)?;

        let duplicate = || {
            AppError::conflict(format!(
                "Customer with id {customer_id} already has an account with currency {currency}."
            ))
        };

        let existing = self
            .accounts
            .get_by_condition(&AccountFilter::by_customer(customer_id).with_currency(currency))
            .await?;
        if existing.is_some() {
            return Err(duplicate());
        }

        if !rules::can_own_account(&customer, currency) {
            return Err(AppError::conflict(format!(
                "Customer with role {} cannot have an account with this currency.",
                customer.role
            )));
        }

        let account = Account::new(customer_id, currency);
        match self.accounts.create(&account).await {
            Ok(()) => {}
            // Lost a race against a concurrent request for the same currency.
            Err(RepositoryError::UniqueViolation(_)) => return Err(duplicate()),
            Err(err) => return Err(err.into()),
        }

        tracing::info!(
            account_id = %account.id,
            %customer_id,
            currency = %currency,
            "Account created"
        );
        notify(self.notifier.as_ref(), Notification::account_changed(&account)).await;

        Ok(account.id)
    }

    /// Deactivate an account. RUB accounts are permanent.
    pub async fn deactivate(&self, account_id: Uuid) -> Result<(), AppError> {
        let mut account = load_account(self.accounts.as_ref(), account_id).await?;

        if !rules::can_deactivate_account(&account) {
            return Err(AppError::conflict(format!(
                "Account with currency {} cannot be deactivated.",
                Currency::Rub
            )));
        }

        self.accounts.deactivate(&[account_id]).await?;
        account.is_deactivated = true;

        tracing::info!(%account_id, "Account deactivated");
        notify(self.notifier.as_ref(), Notification::account_changed(&account)).await;
        Ok(())
    }

    pub async fn activate(&self, account_id: Uuid) -> Result<(), AppError> {
        let mut account = load_account(self.accounts.as_ref(), account_id).await?;

        self.accounts.activate(&[account_id]).await?;
        account.is_deactivated = false;

        tracing::info!(%account_id, "Account activated");
        notify(self.notifier.as_ref(), Notification::account_changed(&account)).await;
        Ok(())
    }

    /// Local account fields plus the ledger balance.
    pub async fn get_full_info(
        &self,
        account_id: Uuid,
        caller: &CallerIdentity,
    ) -> Result<AccountFullInfo, AppError> {
        let account = self.load_readable(account_id, caller).await?;
        let balance = self.ledger.get_balance(account_id).await?;
        Ok(AccountFullInfo::new(account, balance))
    }

    /// Transaction history as reported by the ledger.
    pub async fn get_transactions(
        &self,
        account_id: Uuid,
        caller: &CallerIdentity,
    ) -> Result<Vec<TransactionRecord>, AppError> {
        self.load_readable(account_id, caller).await?;
        self.ledger.get_transactions(account_id).await
    }

    pub async fn get_accounts_by_customer(
        &self,
        customer_id: Uuid,
        caller: &CallerIdentity,
    ) -> Result<Vec<Account>, AppError> {
        if !caller.may_read(customer_id) {
            return Err(AppError::AuthorizationFailed(format!(
                "Customer with id {} cannot read accounts of customer with id {customer_id}.",
                caller.customer_id
            )));
        }
        load_customer(self.customers.as_ref(), customer_id).await?;

        let accounts = self
            .accounts
            .get_all_by_condition(&AccountFilter::by_customer(customer_id))
            .await?;
        Ok(accounts)
    }

    async fn load_readable(
        &self,
        account_id: Uuid,
        caller: &CallerIdentity,
    ) -> Result<Account, AppError> {
        let account = load_account(self.accounts.as_ref(), account_id).await?;
        if !caller.may_read(account.customer_id) {
            return Err(AppError::AuthorizationFailed(format!(
                "Account with id {account_id} does not belong to customer with id {}.",
                caller.customer_id
            )));
        }
        Ok(account)
    }
}
