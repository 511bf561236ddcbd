#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use customers_service::{
    error::AppError,
    middleware::auth::TokenIssuer,
    models::{
        account::Account,
        caller::CallerIdentity,
        currency::Currency,
        customer::{Customer, CustomerRegistration},
        notification::Notification,
        role::Role,
        transaction::{
            LedgerTransferRequest, SimpleTransactionRequest, TransactionRecord, TransactionType,
        },
    },
    repositories::{
        AccountFilter, AccountRepository, CustomerFilter, CustomerRepository, memory::MemoryStore,
    },
    services::{
        account_service::AccountService, customer_service::CustomerService,
        ledger_client::Ledger, notification_service::Notifier, password,
        transaction_service::TransactionService,
    },
    state::AppState,
    unit_of_work::{UnitOfWork, WorkScope},
};
use rust_decimal::Decimal;
use uuid::Uuid;

pub const PASSWORD: &str = "s3cretpass";
pub const TOKEN_SECRET: &str = "test-token-secret";

/// In-process ledger that records what it was asked to do.
#[derive(Default)]
pub struct FakeLedger {
    pub balance: Mutex<Decimal>,
    pub deposits: Mutex<Vec<SimpleTransactionRequest>>,
    pub withdrawals: Mutex<Vec<SimpleTransactionRequest>>,
    pub transfers: Mutex<Vec<LedgerTransferRequest>>,
    pub records: Mutex<HashMap<Uuid, TransactionRecord>>,
    pub unavailable: Mutex<bool>,
}

impl FakeLedger {
    pub fn set_balance(&self, balance: Decimal) {
        *self.balance.lock().unwrap() = balance;
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    pub fn add_record(&self, account_id: Uuid, amount: Decimal) -> TransactionRecord {
        let record = TransactionRecord {
            id: Uuid::new_v4(),
            account_id,
            amount,
            date: Utc::now(),
            transaction_type: TransactionType::Deposit,
            related_transaction: None,
        };
        self.records.lock().unwrap().insert(record.id, record.clone());
        record
    }

    fn check(&self) -> Result<(), AppError> {
        if *self.unavailable.lock().unwrap() {
            return Err(AppError::ServiceUnavailable);
        }
        Ok(())
    }

    pub fn forwarded_count(&self) -> usize {
        self.deposits.lock().unwrap().len()
            + self.withdrawals.lock().unwrap().len()
            + self.transfers.lock().unwrap().len()
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn get_balance(&self, _account_id: Uuid) -> Result<Decimal, AppError> {
        self.check()?;
        Ok(*self.balance.lock().unwrap())
    }

    async fn get_transactions(&self, account_id: Uuid) -> Result<Vec<TransactionRecord>, AppError> {
        self.check()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn get_transaction(&self, id: Uuid) -> Result<TransactionRecord, AppError> {
        self.check()?;
        self.records
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(AppError::ServiceUnavailable)
    }

    async fn create_deposit(&self, request: &SimpleTransactionRequest) -> Result<Uuid, AppError> {
        self.check()?;
        self.deposits.lock().unwrap().push(request.clone());
        Ok(Uuid::new_v4())
    }

    async fn create_withdraw(&self, request: &SimpleTransactionRequest) -> Result<Uuid, AppError> {
        self.check()?;
        self.withdrawals.lock().unwrap().push(request.clone());
        Ok(Uuid::new_v4())
    }

    async fn create_transfer(&self, request: &LedgerTransferRequest) -> Result<Vec<Uuid>, AppError> {
        self.check()?;
        self.transfers.lock().unwrap().push(request.clone());
        Ok(vec![Uuid::new_v4(), Uuid::new_v4()])
    }
}

/// Notifier that keeps everything it was asked to publish.
#[derive(Default)]
pub struct RecordingNotifier {
    pub published: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn published(&self) -> Vec<Notification> {
        self.published.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.published.lock().unwrap().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn publish(&self, notification: Notification) -> Result<(), AppError> {
        self.published.lock().unwrap().push(notification);
        Ok(())
    }
}

/// Services wired over one `MemoryStore`, plus seeding and lookup helpers.
pub struct TestContext {
    pub store: MemoryStore,
    pub ledger: Arc<FakeLedger>,
    pub notifier: Arc<RecordingNotifier>,
    pub state: AppState,
}

impl TestContext {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let ledger = Arc::new(FakeLedger::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::new(
            store.clone(),
            ledger.clone(),
            notifier.clone(),
            TokenIssuer::new(TOKEN_SECRET, Duration::minutes(60)),
        );

        Self {
            store,
            ledger,
            notifier,
            state,
        }
    }

    pub fn customers(&self) -> &CustomerService {
        &self.state.customers
    }

    pub fn accounts(&self) -> &AccountService {
        &self.state.accounts
    }

    pub fn transactions(&self) -> &TransactionService {
        &self.state.transactions
    }

    pub async fn seed_customer(&self, role: Role) -> Customer {
        let id = Uuid::new_v4();
        let customer = Customer {
            id,
            role,
            is_deactivated: false,
            email: format!("{id}@example.com"),
            password_hash: password::hash_password(PASSWORD).unwrap(),
            first_name: "Ivan".to_string(),
            last_name: "Petrov".to_string(),
            phone: "79990001122".to_string(),
            address: "Tverskaya street 1".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1988, 8, 8).unwrap(),
            custom_vip_due_date: None,
        };
        CustomerRepository::create(&self.store, &customer).await.unwrap();
        customer
    }

    pub async fn seed_vip(&self, due: Option<chrono::DateTime<Utc>>) -> Customer {
        let mut customer = self.seed_customer(Role::Vip).await;
        if let Some(due) = due {
            let mut scope = self.store.begin().await.unwrap();
            scope.set_manual_vip(customer.id, due).await.unwrap();
            scope.commit().await.unwrap();
            customer.custom_vip_due_date = Some(due);
        }
        customer
    }

    pub async fn seed_account(
        &self,
        customer_id: Uuid,
        currency: Currency,
        is_deactivated: bool,
    ) -> Account {
        let mut account = Account::new(customer_id, currency);
        account.is_deactivated = is_deactivated;
        AccountRepository::create(&self.store, &account).await.unwrap();
        account
    }

    pub async fn deactivate_customer(&self, customer_id: Uuid) {
        CustomerRepository::deactivate(&self.store, &[customer_id])
            .await
            .unwrap();
    }

    pub async fn customer(&self, id: Uuid) -> Option<Customer> {
        CustomerRepository::get_by_condition(&self.store, &CustomerFilter::by_id(id))
            .await
            .unwrap()
    }

    pub async fn customer_by_email(&self, email: &str) -> Option<Customer> {
        CustomerRepository::get_by_condition(&self.store, &CustomerFilter::by_email(email))
            .await
            .unwrap()
    }

    pub async fn account(&self, id: Uuid) -> Option<Account> {
        AccountRepository::get_by_condition(&self.store, &AccountFilter::by_id(id))
            .await
            .unwrap()
    }

    pub async fn accounts_of(&self, customer_id: Uuid) -> Vec<Account> {
        AccountRepository::get_all_by_condition(&self.store, &AccountFilter::by_customer(customer_id))
            .await
            .unwrap()
    }
}

pub fn registration(email: &str) -> CustomerRegistration {
    CustomerRegistration {
        email: email.to_string(),
        password: PASSWORD.to_string(),
        first_name: "Anna".to_string(),
        last_name: "Petrova".to_string(),
        phone: "79990001122".to_string(),
        address: "Nevsky prospect 1".to_string(),
        birth_date: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
    }
}

pub fn caller(customer: &Customer) -> CallerIdentity {
    CallerIdentity::new(customer.id, customer.role)
}
