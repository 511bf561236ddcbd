//! Repository abstraction over customers and accounts.
//!
//! Services talk to storage only through the traits below. Queries are
//! parameterized by a filter value (`CustomerFilter`, `AccountFilter`) that
//! the PostgreSQL backend turns into a `WHERE` clause and the in-memory
//! backend evaluates with `matches`.
//!
//! Two backends exist:
//! - `postgres::PgStore` for production
//! - `memory::MemoryStore` for tests and local experiments

pub mod filter;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    account::Account,
    customer::{Customer, CustomerProfile},
};

pub use filter::{AccountFilter, CustomerFilter, Page};

/// Storage failure.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Any sqlx::Error from the PostgreSQL backend.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A unique constraint would be violated.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A write referenced a row that does not exist.
    #[error("Row not found: {0}")]
    RowNotFound(String),

    /// Backend-specific failure without a sqlx error behind it.
    #[error("Storage failure: {0}")]
    Storage(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Customer persistence.
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn create(&self, customer: &Customer) -> RepositoryResult<()>;

    /// First customer matching `filter`, if any.
    async fn get_by_condition(&self, filter: &CustomerFilter) -> RepositoryResult<Option<Customer>>;

    async fn get_all_by_condition(&self, filter: &CustomerFilter) -> RepositoryResult<Vec<Customer>>;

    async fn get_all(&self, page: Page) -> RepositoryResult<Vec<Customer>>;

    async fn update_profile(&self, id: Uuid, profile: &CustomerProfile) -> RepositoryResult<()>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> RepositoryResult<()>;

    async fn activate(&self, ids: &[Uuid]) -> RepositoryResult<()>;

    async fn deactivate(&self, ids: &[Uuid]) -> RepositoryResult<()>;
}

/// Account persistence.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn create(&self, account: &Account) -> RepositoryResult<()>;

    /// First account matching `filter`, if any.
    async fn get_by_condition(&self, filter: &AccountFilter) -> RepositoryResult<Option<Account>>;

    async fn get_all_by_condition(&self, filter: &AccountFilter) -> RepositoryResult<Vec<Account>>;

    async fn get_all(&self, page: Page) -> RepositoryResult<Vec<Account>>;

    async fn activate(&self, ids: &[Uuid]) -> RepositoryResult<()>;

    async fn deactivate(&self, ids: &[Uuid]) -> RepositoryResult<()>;
}

/// Liveness check used by `GET /health`.
#[async_trait]
pub trait StoreProbe: Send + Sync {
    async fn ping(&self) -> RepositoryResult<()>;
}
