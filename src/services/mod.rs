//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They load state through the repositories, apply the rules in
//! `crate::rules`, write through a repository or the unit of work, and
//! publish a notification once the write has committed.

pub mod account_service;
pub mod customer_service;
pub mod ledger_client;
pub mod notification_service;
pub mod password;
pub mod signing;
pub mod transaction_service;

use uuid::Uuid;

use crate::{
    error::AppError,
    models::{account::Account, customer::Customer},
    repositories::{AccountFilter, AccountRepository, CustomerFilter, CustomerRepository},
};

pub(crate) async fn load_customer(
    customers: &dyn CustomerRepository,
    id: Uuid,
) -> Result<Customer, AppError> {
    customers
        .get_by_condition(&CustomerFilter::by_id(id))
        .await?
        .ok_or_else(|| AppError::not_found(format!("Customer with id {id} was not found.")))
}

pub(crate) async fn load_account(
    accounts: &dyn AccountRepository,
    id: Uuid,
) -> Result<Account, AppError> {
    accounts
        .get_by_condition(&AccountFilter::by_id(id))
        .await?
        .ok_or_else(|| AppError::not_found(format!("Account with id {id} was not found.")))
}

pub(crate) fn ensure_customer_active(customer: &Customer) -> Result<(), AppError> {
    if customer.is_deactivated {
        return Err(AppError::conflict(format!(
            "Customer with id {} is deactivated.",
            customer.id
        )));
    }
    Ok(())
}

/// Email with everything but the first character of the local part hidden,
/// for log output.
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first: String = local.chars().take(1).collect();
            format!("{first}****@{domain}")
        }
        None => "****".to_string(),
    }
}
