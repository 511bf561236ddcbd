//! PostgreSQL repositories and unit of work.
//!
//! Filters are turned into `WHERE` clauses with `sqlx::QueryBuilder`, so every
//! value is bound rather than interpolated. Write statements are written once
//! against `PgExecutor` and shared by the pool-backed repositories and the
//! transaction-backed `PgWorkScope`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::{
    db::DbPool,
    models::{
        account::Account,
        currency::Currency,
        customer::{Customer, CustomerProfile},
        role::Role,
    },
    repositories::{
        AccountFilter, AccountRepository, CustomerFilter, CustomerRepository, Page,
        RepositoryError, RepositoryResult, StoreProbe,
    },
    unit_of_work::{RoleChange, UnitOfWork, WorkScope},
};

const CUSTOMER_COLUMNS: &str = "SELECT id, role, is_deactivated, email, password_hash, \
     first_name, last_name, phone, address, birth_date, custom_vip_due_date FROM customers";

const ACCOUNT_COLUMNS: &str =
    "SELECT id, customer_id, currency, is_deactivated, date_created FROM accounts";

/// Repositories and unit of work backed by one connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn customer_query<'a>(filter: &'a CustomerFilter) -> QueryBuilder<'a, Postgres> {
    let mut query = QueryBuilder::new(CUSTOMER_COLUMNS);
    query.push(" WHERE TRUE");

    if let Some(ids) = &filter.ids {
        query.push(" AND id = ANY(").push_bind(ids).push(")");
    }
    if let Some(ids) = &filter.exclude_ids {
        query.push(" AND NOT (id = ANY(").push_bind(ids).push("))");
    }
    if let Some(email) = &filter.email {
        query.push(" AND email = ").push_bind(email);
    }
    if let Some(role) = filter.role {
        query.push(" AND role = ").push_bind(role);
    }
    if let Some(now) = filter.vip_expired_at {
        query
            .push(" AND (custom_vip_due_date IS NULL OR custom_vip_due_date < ")
            .push_bind(now)
            .push(")");
    }

    query
}

fn account_query<'a>(filter: &'a AccountFilter) -> QueryBuilder<'a, Postgres> {
    let mut query = QueryBuilder::new(ACCOUNT_COLUMNS);
    query.push(" WHERE TRUE");

    if let Some(ids) = &filter.ids {
        query.push(" AND id = ANY(").push_bind(ids).push(")");
    }
    if let Some(customer_ids) = &filter.customer_ids {
        query
            .push(" AND customer_id = ANY(")
            .push_bind(customer_ids)
            .push(")");
    }
    if let Some(currency) = filter.currency {
        query.push(" AND currency = ").push_bind(currency);
    }
    if let Some(tier) = filter.tier {
        // Custom enums have no array encoding; compare through text.
        let codes: Vec<String> = Currency::in_tier(tier)
            .into_iter()
            .map(|c| c.code().to_string())
            .collect();
        query
            .push(" AND currency::text = ANY(")
            .push_bind(codes)
            .push(")");
    }

    query
}

/// Translate constraint violations into backend-neutral errors.
fn map_write_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return RepositoryError::UniqueViolation(db.message().to_string());
        }
        if db.is_foreign_key_violation() {
            return RepositoryError::RowNotFound(db.message().to_string());
        }
    }
    RepositoryError::Database(err)
}

fn expect_rows(rows_affected: u64, what: impl FnOnce() -> String) -> RepositoryResult<()> {
    if rows_affected == 0 {
        return Err(RepositoryError::RowNotFound(what()));
    }
    Ok(())
}

async fn insert_customer<'e, E: PgExecutor<'e>>(
    executor: E,
    customer: &Customer,
) -> RepositoryResult<()> {
    sqlx::query(
        r#"
        INSERT INTO customers (
            id, role, is_deactivated, email, password_hash,
            first_name, last_name, phone, address, birth_date, custom_vip_due_date
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(customer.id)
    .bind(customer.role)
    .bind(customer.is_deactivated)
    .bind(&customer.email)
    .bind(&customer.password_hash)
    .bind(&customer.first_name)
    .bind(&customer.last_name)
    .bind(&customer.phone)
    .bind(&customer.address)
    .bind(customer.birth_date)
    .bind(customer.custom_vip_due_date)
    .execute(executor)
    .await
    .map_err(map_write_error)?;

    Ok(())
}

async fn insert_account<'e, E: PgExecutor<'e>>(
    executor: E,
    account: &Account,
) -> RepositoryResult<()> {
    sqlx::query(
        r#"
        INSERT INTO accounts (id, customer_id, currency, is_deactivated, date_created)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(account.id)
    .bind(account.customer_id)
    .bind(account.currency)
    .bind(account.is_deactivated)
    .bind(account.date_created)
    .execute(executor)
    .await
    .map_err(map_write_error)?;

    Ok(())
}

async fn set_customers_deactivated<'e, E: PgExecutor<'e>>(
    executor: E,
    ids: &[Uuid],
    is_deactivated: bool,
) -> RepositoryResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    sqlx::query("UPDATE customers SET is_deactivated = $1 WHERE id = ANY($2)")
        .bind(is_deactivated)
        .bind(ids)
        .execute(executor)
        .await?;
    Ok(())
}

async fn set_accounts_deactivated<'e, E: PgExecutor<'e>>(
    executor: E,
    ids: &[Uuid],
    is_deactivated: bool,
) -> RepositoryResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    sqlx::query("UPDATE accounts SET is_deactivated = $1 WHERE id = ANY($2)")
        .bind(is_deactivated)
        .bind(ids)
        .execute(executor)
        .await?;
    Ok(())
}

#[async_trait]
impl CustomerRepository for PgStore {
    async fn create(&self, customer: &Customer) -> RepositoryResult<()> {
        insert_customer(&self.pool, customer).await
    }

    async fn get_by_condition(&self, filter: &CustomerFilter) -> RepositoryResult<Option<Customer>> {
        let mut query = customer_query(filter);
        query.push(" LIMIT 1");
        let customer = query
            .build_query_as::<Customer>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(customer)
    }

    async fn get_all_by_condition(&self, filter: &CustomerFilter) -> RepositoryResult<Vec<Customer>> {
        let mut query = customer_query(filter);
        query.push(" ORDER BY last_name, first_name, id");
        let customers = query
            .build_query_as::<Customer>()
            .fetch_all(&self.pool)
            .await?;
        Ok(customers)
    }

    async fn get_all(&self, page: Page) -> RepositoryResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "{CUSTOMER_COLUMNS} ORDER BY last_name, first_name, id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(customers)
    }

    async fn update_profile(&self, id: Uuid, profile: &CustomerProfile) -> RepositoryResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE customers
            SET first_name = $1, last_name = $2, phone = $3, address = $4
            WHERE id = $5
            "#,
        )
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.phone)
        .bind(&profile.address)
        .bind(id)
        .execute(&self.pool)
        .await?;

        expect_rows(result.rows_affected(), || format!("customer {id}"))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> RepositoryResult<()> {
        let result = sqlx::query("UPDATE customers SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_rows(result.rows_affected(), || format!("customer {id}"))
    }

    async fn activate(&self, ids: &[Uuid]) -> RepositoryResult<()> {
        set_customers_deactivated(&self.pool, ids, false).await
    }

    async fn deactivate(&self, ids: &[Uuid]) -> RepositoryResult<()> {
        set_customers_deactivated(&self.pool, ids, true).await
    }
}

#[async_trait]
impl AccountRepository for PgStore {
    async fn create(&self, account: &Account) -> RepositoryResult<()> {
        insert_account(&self.pool, account).await
    }

    async fn get_by_condition(&self, filter: &AccountFilter) -> RepositoryResult<Option<Account>> {
        let mut query = account_query(filter);
        query.push(" LIMIT 1");
        let account = query
            .build_query_as::<Account>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn get_all_by_condition(&self, filter: &AccountFilter) -> RepositoryResult<Vec<Account>> {
        let mut query = account_query(filter);
        query.push(" ORDER BY date_created, id");
        let accounts = query
            .build_query_as::<Account>()
            .fetch_all(&self.pool)
            .await?;
        Ok(accounts)
    }

    async fn get_all(&self, page: Page) -> RepositoryResult<Vec<Account>> {
        let accounts = sqlx::query_as::<_, Account>(&format!(
            "{ACCOUNT_COLUMNS} ORDER BY date_created, id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(accounts)
    }

    async fn activate(&self, ids: &[Uuid]) -> RepositoryResult<()> {
        set_accounts_deactivated(&self.pool, ids, false).await
    }

    async fn deactivate(&self, ids: &[Uuid]) -> RepositoryResult<()> {
        set_accounts_deactivated(&self.pool, ids, true).await
    }
}

#[async_trait]
impl StoreProbe for PgStore {
    async fn ping(&self) -> RepositoryResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for PgStore {
    async fn begin(&self) -> RepositoryResult<Box<dyn WorkScope>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgWorkScope { tx }))
    }
}

/// One open database transaction. Dropping it without commit rolls back.
pub struct PgWorkScope {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl WorkScope for PgWorkScope {
    async fn create_customer(&mut self, customer: &Customer) -> RepositoryResult<()> {
        insert_customer(&mut *self.tx, customer).await
    }

    async fn create_account(&mut self, account: &Account) -> RepositoryResult<()> {
        insert_account(&mut *self.tx, account).await
    }

    async fn set_manual_vip(
        &mut self,
        customer_id: Uuid,
        due_date: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE customers SET role = $1, custom_vip_due_date = $2 WHERE id = $3",
        )
        .bind(Role::Vip)
        .bind(due_date)
        .bind(customer_id)
        .execute(&mut *self.tx)
        .await?;

        expect_rows(result.rows_affected(), || format!("customer {customer_id}"))
    }

    async fn update_roles(&mut self, changes: &[RoleChange]) -> RepositoryResult<()> {
        for change in changes {
            sqlx::query("UPDATE customers SET role = $1 WHERE id = $2")
                .bind(change.role)
                .bind(change.customer_id)
                .execute(&mut *self.tx)
                .await?;
        }
        Ok(())
    }

    async fn set_accounts_deactivated(
        &mut self,
        account_ids: &[Uuid],
        is_deactivated: bool,
    ) -> RepositoryResult<()> {
        set_accounts_deactivated(&mut *self.tx, account_ids, is_deactivated).await
    }

    async fn delete_accounts_of(&mut self, customer_id: Uuid) -> RepositoryResult<()> {
        sqlx::query("DELETE FROM accounts WHERE customer_id = $1")
            .bind(customer_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_customer(&mut self, customer_id: Uuid) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(customer_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;

        expect_rows(result.rows_affected(), || format!("customer {customer_id}"))
    }

    async fn commit(self: Box<Self>) -> RepositoryResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> RepositoryResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
