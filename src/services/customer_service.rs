//! Customer lifecycle rules: registration, profile and password changes,
//! manual VIP grants and batch VIP recomputation.
//!
//! # Atomicity Guarantees
//!
//! Registration, manual VIP grants, batch role recomputation and deletion
//! touch several rows and go through `CustomerUnitOfWork`. A failure there
//! rolls everything back and surfaces as `AppError::TransactionFailed`.
//! Single-row changes go straight to the repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        account::Account,
        currency::{Currency, CurrencyTier},
        customer::{Customer, CustomerProfile, CustomerRegistration, RoleBatchOutcome},
        notification::Notification,
        role::Role,
    },
    repositories::{AccountFilter, AccountRepository, CustomerFilter, CustomerRepository, Page},
    rules,
    services::{
        ensure_customer_active, load_customer, mask_email,
        notification_service::{Notifier, notify},
        password,
    },
    unit_of_work::{CustomerUnitOfWork, RoleChange},
};

#[derive(Clone)]
pub struct CustomerService {
    customers: Arc<dyn CustomerRepository>,
    accounts: Arc<dyn AccountRepository>,
    unit_of_work: CustomerUnitOfWork,
    notifier: Arc<dyn Notifier>,
}

impl CustomerService {
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        accounts: Arc<dyn AccountRepository>,
        unit_of_work: CustomerUnitOfWork,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            customers,
            accounts,
            unit_of_work,
            notifier,
        }
    }

    /// Register a customer together with its RUB account.
    ///
    /// # Process
    ///
    /// 1. Reject a duplicate email
    /// 2. Hash the password, build a Regular customer and its RUB account
    /// 3. Write both in one transaction
    /// 4. Publish `customer.registered`
    pub async fn register(&self, registration: CustomerRegistration) -> Result<Uuid, AppError> {
        let existing = self
            .customers
            .get_by_condition(&CustomerFilter::by_email(registration.email.as_str()))
            .await?;
        if existing.is_some() {
            return Err(AppError::conflict(format!(
                "Customer with email {} already exists.",
                registration.email
            )));
        }

        let customer = Customer {
            id: Uuid::new_v4(),
            role: Role::Regular,
            is_deactivated: false,
            password_hash: password::hash_password(&registration.password)?,
            email: registration.email,
            first_name: registration.first_name,
            last_name: registration.last_name,
            phone: registration.phone,
            address: registration.address,
            birth_date: registration.birth_date,
            custom_vip_due_date: None,
        };
        let account = Account::new(customer.id, Currency::Rub);

        self.unit_of_work
            .create_customer_with_account(&customer, &account)
            .await?;

        tracing::info!(
            customer_id = %customer.id,
            email = %mask_email(&customer.email),
            "Customer registered"
        );
        notify(
            self.notifier.as_ref(),
            Notification::customer_registered(&customer, &account),
        )
        .await;

        Ok(customer.id)
    }

    /// Check credentials and return the customer they belong to.
    ///
    /// Unknown emails and wrong passwords are indistinguishable to the caller.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Customer, AppError> {
        let customer = self
            .customers
            .get_by_condition(&CustomerFilter::by_email(email))
            .await?
            .ok_or(AppError::WrongCredentials)?;

        if !password::verify_password(password, &customer.password_hash) {
            tracing::warn!(email = %mask_email(email), "Failed login attempt");
            return Err(AppError::WrongCredentials);
        }
        ensure_customer_active(&customer)?;

        Ok(customer)
    }

    pub async fn get_full_info(&self, customer_id: Uuid) -> Result<Customer, AppError> {
        load_customer(self.customers.as_ref(), customer_id).await
    }

    pub async fn get_all(&self, page: Page) -> Result<Vec<Customer>, AppError> {
        Ok(self.customers.get_all(page).await?)
    }

    pub async fn update_profile(
        &self,
        customer_id: Uuid,
        profile: CustomerProfile,
    ) -> Result<Customer, AppError> {
        let mut customer = load_customer(self.customers.as_ref(), customer_id).await?;
        ensure_customer_active(&customer)?;

        self.customers.update_profile(customer_id, &profile).await?;
        customer.first_name = profile.first_name;
        customer.last_name = profile.last_name;
        customer.phone = profile.phone;
        customer.address = profile.address;

        tracing::info!(%customer_id, "Customer profile updated");
        notify(self.notifier.as_ref(), Notification::customer_changed(&customer)).await;

        Ok(customer)
    }

    pub async fn update_password(
        &self,
        customer_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let mut customer = load_customer(self.customers.as_ref(), customer_id).await?;
        ensure_customer_active(&customer)?;

        if !password::verify_password(current_password, &customer.password_hash) {
            return Err(AppError::WrongCredentials);
        }

        let password_hash = password::hash_password(new_password)?;
        self.customers
            .update_password(customer_id, &password_hash)
            .await?;
        customer.password_hash = password_hash;

        tracing::info!(%customer_id, "Customer password updated");
        notify(self.notifier.as_ref(), Notification::customer_changed(&customer)).await;

        Ok(())
    }

    /// Grant VIP until `expiration` and reactivate the customer's VIP-tier
    /// accounts, atomically.
    pub async fn set_manual_vip(
        &self,
        customer_id: Uuid,
        expiration: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut customer = load_customer(self.customers.as_ref(), customer_id).await?;
        ensure_customer_active(&customer)?;
        if !rules::can_grant_vip(&customer) {
            return Err(AppError::conflict(format!(
                "Role of customer with id {customer_id} is not correct."
            )));
        }

        let vip_accounts = self
            .accounts
            .get_all_by_condition(
                &AccountFilter::by_customer(customer_id).with_tier(CurrencyTier::Vip),
            )
            .await?;
        let account_ids: Vec<Uuid> = vip_accounts.iter().map(|a| a.id).collect();

        self.unit_of_work
            .set_manual_vip(customer_id, expiration, &account_ids)
            .await?;
        customer.role = Role::Vip;
        customer.custom_vip_due_date = Some(expiration);

        tracing::info!(
            %customer_id,
            %expiration,
            activated_accounts = account_ids.len(),
            "Manual VIP granted"
        );
        notify(self.notifier.as_ref(), Notification::customer_changed(&customer)).await;

        Ok(())
    }

    /// Reconcile VIP roles against the externally computed eligible set.
    ///
    /// # Process
    ///
    /// 1. Promote eligible Regular customers
    /// 2. Demote VIP customers that are not eligible and hold no live manual grant
    /// 3. Activate the VIP-tier accounts of promoted customers
    /// 4. Deactivate the VIP-tier accounts of demoted customers
    /// 5. Write roles and account flags in one transaction
    /// 6. Publish `roles.changed` with every affected customer id
    ///
    /// Nothing is written and nothing is published when no role changes.
    pub async fn batch_recompute_vip_roles(
        &self,
        eligible_ids: &[Uuid],
    ) -> Result<RoleBatchOutcome, AppError> {
        let now = Utc::now();

        let promoted = if eligible_ids.is_empty() {
            Vec::new()
        } else {
            self.customers
                .get_all_by_condition(
                    &CustomerFilter::default()
                        .with_ids(eligible_ids.to_vec())
                        .with_role(Role::Regular),
                )
                .await?
        };
        let demoted = self
            .customers
            .get_all_by_condition(
                &CustomerFilter::default()
                    .with_role(Role::Vip)
                    .excluding_ids(eligible_ids.to_vec())
                    .with_vip_expired_at(now),
            )
            .await?;

        let outcome = RoleBatchOutcome {
            promoted: promoted.iter().map(|c| c.id).collect(),
            demoted: demoted.iter().map(|c| c.id).collect(),
        };
        if outcome.is_empty() {
            tracing::info!("VIP recomputation changed no roles");
            return Ok(outcome);
        }

        let to_activate = self.vip_account_ids(&outcome.promoted).await?;
        let to_deactivate = self.vip_account_ids(&outcome.demoted).await?;

        let changes: Vec<RoleChange> = outcome
            .promoted
            .iter()
            .map(|id| RoleChange::new(*id, Role::Vip))
            .chain(
                outcome
                    .demoted
                    .iter()
                    .map(|id| RoleChange::new(*id, Role::Regular)),
            )
            .collect();

        self.unit_of_work
            .batch_update_roles(&changes, &to_activate, &to_deactivate)
            .await?;

        tracing::info!(
            promoted = outcome.promoted.len(),
            demoted = outcome.demoted.len(),
            activated_accounts = to_activate.len(),
            deactivated_accounts = to_deactivate.len(),
            "VIP roles recomputed"
        );
        notify(
            self.notifier.as_ref(),
            Notification::roles_changed(outcome.affected_ids()),
        )
        .await;

        Ok(outcome)
    }

    pub async fn activate(&self, customer_id: Uuid) -> Result<(), AppError> {
        let mut customer = load_customer(self.customers.as_ref(), customer_id).await?;

        self.customers.activate(&[customer_id]).await?;
        customer.is_deactivated = false;

        tracing::info!(%customer_id, "Customer activated");
        notify(self.notifier.as_ref(), Notification::customer_changed(&customer)).await;
        Ok(())
    }

    pub async fn deactivate(&self, customer_id: Uuid) -> Result<(), AppError> {
        let mut customer = load_customer(self.customers.as_ref(), customer_id).await?;

        self.customers.deactivate(&[customer_id]).await?;
        customer.is_deactivated = true;

        tracing::info!(%customer_id, "Customer deactivated");
        notify(self.notifier.as_ref(), Notification::customer_changed(&customer)).await;
        Ok(())
    }

    /// Remove a customer and every account it owns, RUB included.
    pub async fn delete_customer(&self, customer_id: Uuid) -> Result<(), AppError> {
        load_customer(self.customers.as_ref(), customer_id).await?;

        self.unit_of_work.delete_customer(customer_id).await?;

        tracing::info!(%customer_id, "Customer deleted");
        Ok(())
    }

    async fn vip_account_ids(&self, customer_ids: &[Uuid]) -> Result<Vec<Uuid>, AppError> {
        if customer_ids.is_empty() {
            return Ok(Vec::new());
        }
        let accounts = self
            .accounts
            .get_all_by_condition(
                &AccountFilter::by_customers(customer_ids.to_vec()).with_tier(CurrencyTier::Vip),
            )
            .await?;
        Ok(accounts.into_iter().map(|a| a.id).collect())
    }
}
