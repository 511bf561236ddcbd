//! Unit of work for multi-entity writes.
//!
//! `UnitOfWork::begin` hands out a `WorkScope`: an explicit handle on one
//! storage transaction. Writes issued through the scope become visible only
//! after `commit`. A scope that is dropped without commit is rolled back by
//! the backend, so every exit path releases the transaction.
//!
//! `CustomerUnitOfWork` sequences the composite operations on top of a scope
//! and translates any failure into `AppError::TransactionFailed` after rolling
//! back. The underlying storage error is logged, never returned.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{account::Account, customer::Customer, role::Role},
    repositories::{RepositoryError, RepositoryResult},
};

/// New role for one customer in a batch update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleChange {
    pub customer_id: Uuid,
    pub role: Role,
}

impl RoleChange {
    pub fn new(customer_id: Uuid, role: Role) -> Self {
        Self { customer_id, role }
    }
}

/// Opens storage transactions.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin(&self) -> RepositoryResult<Box<dyn WorkScope>>;
}

/// One open storage transaction.
#[async_trait]
pub trait WorkScope: Send {
    async fn create_customer(&mut self, customer: &Customer) -> RepositoryResult<()>;

    async fn create_account(&mut self, account: &Account) -> RepositoryResult<()>;

    /// Set role VIP and the manual due date.
    async fn set_manual_vip(
        &mut self,
        customer_id: Uuid,
        due_date: DateTime<Utc>,
    ) -> RepositoryResult<()>;

    async fn update_roles(&mut self, changes: &[RoleChange]) -> RepositoryResult<()>;

    async fn set_accounts_deactivated(
        &mut self,
        account_ids: &[Uuid],
        is_deactivated: bool,
    ) -> RepositoryResult<()>;

    /// Remove every account of the customer, RUB included.
    async fn delete_accounts_of(&mut self, customer_id: Uuid) -> RepositoryResult<()>;

    async fn delete_customer(&mut self, customer_id: Uuid) -> RepositoryResult<()>;

    async fn commit(self: Box<Self>) -> RepositoryResult<()>;

    async fn rollback(self: Box<Self>) -> RepositoryResult<()>;
}

/// Composite atomic operations used by the customer service.
#[derive(Clone)]
pub struct CustomerUnitOfWork {
    inner: Arc<dyn UnitOfWork>,
}

impl CustomerUnitOfWork {
    pub fn new(inner: Arc<dyn UnitOfWork>) -> Self {
        Self { inner }
    }

    /// Insert the customer and its first account together.
    pub async fn create_customer_with_account(
        &self,
        customer: &Customer,
        account: &Account,
    ) -> Result<(), AppError> {
        let mut scope = self.begin("create_customer_with_account").await?;
        let result = async {
            scope.create_customer(customer).await?;
            scope.create_account(account).await
        }
        .await;
        Self::finish(scope, result, "create_customer_with_account").await
    }

    /// Grant VIP until `due_date` and reactivate the given accounts.
    pub async fn set_manual_vip(
        &self,
        customer_id: Uuid,
        due_date: DateTime<Utc>,
        accounts_to_activate: &[Uuid],
    ) -> Result<(), AppError> {
        let mut scope = self.begin("set_manual_vip").await?;
        let result = async {
            scope.set_manual_vip(customer_id, due_date).await?;
            scope
                .set_accounts_deactivated(accounts_to_activate, false)
                .await
        }
        .await;
        Self::finish(scope, result, "set_manual_vip").await
    }

    /// Apply role changes and account flag changes as one write.
    pub async fn batch_update_roles(
        &self,
        changes: &[RoleChange],
        accounts_to_activate: &[Uuid],
        accounts_to_deactivate: &[Uuid],
    ) -> Result<(), AppError> {
        let mut scope = self.begin("batch_update_roles").await?;
        let result = async {
            scope.update_roles(changes).await?;
            scope
                .set_accounts_deactivated(accounts_to_activate, false)
                .await?;
            scope
                .set_accounts_deactivated(accounts_to_deactivate, true)
                .await
        }
        .await;
        Self::finish(scope, result, "batch_update_roles").await
    }

    /// Delete a customer with all of its accounts.
    pub async fn delete_customer(&self, customer_id: Uuid) -> Result<(), AppError> {
        let mut scope = self.begin("delete_customer").await?;
        let result = async {
            scope.delete_accounts_of(customer_id).await?;
            scope.delete_customer(customer_id).await
        }
        .await;
        Self::finish(scope, result, "delete_customer").await
    }

    async fn begin(&self, operation: &str) -> Result<Box<dyn WorkScope>, AppError> {
        self.inner.begin().await.map_err(|err| {
            tracing::error!(operation, error = %err, "Failed to begin transaction");
            AppError::TransactionFailed
        })
    }

    /// Commit on success, roll back on failure. Either way the scope is consumed.
    async fn finish(
        scope: Box<dyn WorkScope>,
        result: Result<(), RepositoryError>,
        operation: &str,
    ) -> Result<(), AppError> {
        match result {
            Ok(()) => scope.commit().await.map_err(|err| {
                tracing::error!(operation, error = %err, "Failed to commit transaction");
                AppError::TransactionFailed
            }),
            Err(err) => {
                tracing::warn!(operation, error = %err, "Rolling back transaction");
                if let Err(rollback_err) = scope.rollback().await {
                    tracing::error!(operation, error = %rollback_err, "Rollback failed");
                }
                Err(AppError::TransactionFailed)
            }
        }
    }
}
