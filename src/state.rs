//! Shared application state handed to every handler.

use std::sync::Arc;

use crate::{
    middleware::auth::TokenIssuer,
    repositories::{AccountRepository, CustomerRepository, StoreProbe},
    services::{
        account_service::AccountService, customer_service::CustomerService,
        ledger_client::Ledger, notification_service::Notifier,
        transaction_service::TransactionService,
    },
    unit_of_work::{CustomerUnitOfWork, UnitOfWork},
};

#[derive(Clone)]
pub struct AppState {
    pub customers: CustomerService,
    pub accounts: AccountService,
    pub transactions: TransactionService,
    pub tokens: TokenIssuer,
    pub probe: Arc<dyn StoreProbe>,
}

impl AppState {
    /// Wire the services on top of one store that provides both
    /// repositories and the unit of work.
    pub fn new<S>(
        store: S,
        ledger: Arc<dyn Ledger>,
        notifier: Arc<dyn Notifier>,
        tokens: TokenIssuer,
    ) -> Self
    where
        S: CustomerRepository + AccountRepository + UnitOfWork + StoreProbe + 'static,
    {
        let store = Arc::new(store);
        let customer_repo: Arc<dyn CustomerRepository> = store.clone();
        let account_repo: Arc<dyn AccountRepository> = store.clone();
        let unit_of_work: Arc<dyn UnitOfWork> = store.clone();
        let probe: Arc<dyn StoreProbe> = store;

        Self {
            customers: CustomerService::new(
                customer_repo.clone(),
                account_repo.clone(),
                CustomerUnitOfWork::new(unit_of_work),
                notifier.clone(),
            ),
            accounts: AccountService::new(
                customer_repo.clone(),
                account_repo.clone(),
                ledger.clone(),
                notifier,
            ),
            transactions: TransactionService::new(customer_repo, account_repo, ledger),
            tokens,
            probe,
        }
    }
}
