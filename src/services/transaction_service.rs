//! Transaction authorization.
//!
//! This service never moves money. It checks a deposit, withdrawal or
//! transfer request against local account and customer state and forwards
//! it to the ledger only when every rule holds.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        account::Account,
        caller::CallerIdentity,
        currency::Currency,
        transaction::{
            SimpleTransactionRequest, TransactionRecord, TransactionType,
            TransferTransactionRequest,
        },
    },
    repositories::{AccountRepository, CustomerRepository},
    rules,
    services::{ensure_customer_active, ledger_client::Ledger, load_account, load_customer},
};

#[derive(Clone)]
pub struct TransactionService {
    customers: Arc<dyn CustomerRepository>,
    accounts: Arc<dyn AccountRepository>,
    ledger: Arc<dyn Ledger>,
}

impl TransactionService {
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        accounts: Arc<dyn AccountRepository>,
        ledger: Arc<dyn Ledger>,
    ) -> Self {
        Self {
            customers,
            accounts,
            ledger,
        }
    }

    /// Validate and forward a deposit or withdrawal.
    ///
    /// # Errors
    ///
    /// - `EntityConflict`: type is not Deposit/Withdrawal, account deactivated,
    ///   currency not allowed for simple transactions, owner deactivated
    /// - `EntityNotFound`: account does not exist
    /// - `AuthorizationFailed`: caller does not own the account
    /// - `BadGateway` / `ServiceUnavailable`: ledger failure
    pub async fn create_simple_transaction(
        &self,
        request: &SimpleTransactionRequest,
        caller_id: Uuid,
        transaction_type: TransactionType,
    ) -> Result<Uuid, AppError> {
        if !matches!(
            transaction_type,
            TransactionType::Deposit | TransactionType::Withdrawal
        ) {
            return Err(AppError::conflict("TransactionType is not correct."));
        }

        let account = load_account(self.accounts.as_ref(), request.account_id).await?;
        ensure_account_active(&account)?;

        if !rules::is_simple_transactable(account.currency) {
            let allowed: Vec<&str> = Currency::SIMPLE_TRANSACTABLE
                .iter()
                .map(|c| c.code())
                .collect();
            return Err(AppError::conflict(format!(
                "Deposit and withdraw transactions are only allowed for accounts with currencies {}.",
                allowed.join(", ")
            )));
        }

        ensure_owner(&account, caller_id)?;
        let customer = load_customer(self.customers.as_ref(), account.customer_id).await?;
        ensure_customer_active(&customer)?;

        let id = match transaction_type {
            TransactionType::Deposit => self.ledger.create_deposit(request).await?,
            _ => self.ledger.create_withdraw(request).await?,
        };

        tracing::info!(
            transaction_id = %id,
            account_id = %account.id,
            ?transaction_type,
            "Simple transaction forwarded"
        );
        Ok(id)
    }

    /// Validate and forward a transfer between two accounts of one customer.
    pub async fn create_transfer_transaction(
        &self,
        request: TransferTransactionRequest,
        caller_id: Uuid,
    ) -> Result<Vec<Uuid>, AppError> {
        let from = load_account(self.accounts.as_ref(), request.from_account_id).await?;
        let to = load_account(self.accounts.as_ref(), request.to_account_id).await?;

        ensure_account_active(&to)?;

        if from.customer_id != to.customer_id {
            return Err(AppError::conflict(
                "Accounts must belong to the same customer.",
            ));
        }

        if !rules::can_transfer_from(&from, &to) {
            if to.currency != Currency::Rub {
                return Err(AppError::conflict(format!(
                    "Transfer from deactivated accounts is allowed only to the account with currency {}.",
                    Currency::Rub
                )));
            }
            return Err(AppError::conflict(format!(
                "Account with id {} is deactivated.",
                from.id
            )));
        }

        ensure_owner(&from, caller_id)?;
        let customer = load_customer(self.customers.as_ref(), from.customer_id).await?;
        ensure_customer_active(&customer)?;

        let ledger_request = request.with_currencies(from.currency, to.currency);
        let ids = self.ledger.create_transfer(&ledger_request).await?;

        tracing::info!(
            from_account_id = %from.id,
            to_account_id = %to.id,
            transaction_ids = ?ids,
            "Transfer forwarded"
        );
        Ok(ids)
    }

    /// Fetch one ledger record, visible to the account owner and admins.
    pub async fn get_transaction(
        &self,
        id: Uuid,
        caller: &CallerIdentity,
    ) -> Result<TransactionRecord, AppError> {
        let record = self.ledger.get_transaction(id).await?;
        if caller.is_admin() {
            return Ok(record);
        }

        let account = load_account(self.accounts.as_ref(), record.account_id).await?;
        if !caller.may_read(account.customer_id) {
            return Err(AppError::AuthorizationFailed(format!(
                "Transaction with id {id} does not belong to customer with id {}.",
                caller.customer_id
            )));
        }
        Ok(record)
    }
}

fn ensure_account_active(account: &Account) -> Result<(), AppError> {
    if account.is_deactivated {
        return Err(AppError::conflict(format!(
            "Account with id {} is deactivated.",
            account.id
        )));
    }
    Ok(())
}

fn ensure_owner(account: &Account, caller_id: Uuid) -> Result<(), AppError> {
    if account.customer_id != caller_id {
        return Err(AppError::AuthorizationFailed(format!(
            "Account with id {} does not belong to customer with id {caller_id}.",
            account.id
        )));
    }
    Ok(())
}
