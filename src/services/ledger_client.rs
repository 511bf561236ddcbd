//! Client for the external ledger that owns balances and transactions.
//!
//! # Endpoints
//!
//! - `GET  {base}/api/v1/accounts/{id}/balance` → `{"balance": ...}`
//! - `GET  {base}/api/v1/accounts/{id}/transactions` → `[TransactionRecord]`
//! - `GET  {base}/api/v1/transactions/{id}` → `TransactionRecord`
//! - `POST {base}/api/v1/transactions/deposit` → `"<uuid>"`
//! - `POST {base}/api/v1/transactions/withdraw` → `"<uuid>"`
//! - `POST {base}/api/v1/transactions/transfer` → `["<uuid>", "<uuid>"]`
//!
//! # Error Mapping
//!
//! - upstream 5xx or an unreadable body → `AppError::BadGateway`
//! - anything else (connect error, timeout, 4xx) → `AppError::ServiceUnavailable`
//!
//! No retries are performed.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Serialize, de::DeserializeOwned};
use url::Url;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::transaction::{
        BalanceResponse, LedgerTransferRequest, SimpleTransactionRequest, TransactionRecord,
    },
};

/// Operations the services need from the ledger.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn get_balance(&self, account_id: Uuid) -> Result<Decimal, AppError>;

    async fn get_transactions(&self, account_id: Uuid) -> Result<Vec<TransactionRecord>, AppError>;

    async fn get_transaction(&self, id: Uuid) -> Result<TransactionRecord, AppError>;

    async fn create_deposit(&self, request: &SimpleTransactionRequest) -> Result<Uuid, AppError>;

    async fn create_withdraw(&self, request: &SimpleTransactionRequest) -> Result<Uuid, AppError>;

    /// A transfer yields the ids of its debit and credit sides.
    async fn create_transfer(&self, request: &LedgerTransferRequest) -> Result<Vec<Uuid>, AppError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerClientError {
    #[error("Invalid ledger base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// `Ledger` over HTTP with a fixed request timeout.
#[derive(Debug, Clone)]
pub struct HttpLedgerClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpLedgerClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LedgerClientError> {
        let mut base_url = Url::parse(base_url)?;
        // `Url::join` replaces the last segment unless the path ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.base_url.join(path).map_err(|err| {
            tracing::error!(path, error = %err, "Failed to build ledger URL");
            AppError::ServiceUnavailable
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        let url = self.endpoint(path)?;
        let response = self.client.get(url).send().await;
        Self::read_json(path, response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, AppError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let response = self.client.post(url).json(body).send().await;
        Self::read_json(path, response).await
    }

    async fn read_json<T: DeserializeOwned>(
        path: &str,
        response: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<T, AppError> {
        let response = response.map_err(|err| {
            tracing::warn!(path, error = %err, "Ledger request failed");
            AppError::ServiceUnavailable
        })?;

        let status = response.status();
        if status.is_server_error() {
            tracing::warn!(path, status = status.as_u16(), "Ledger returned server error");
            return Err(AppError::BadGateway);
        }
        if !status.is_success() {
            tracing::warn!(path, status = status.as_u16(), "Ledger rejected request");
            return Err(AppError::ServiceUnavailable);
        }

        response.json::<T>().await.map_err(|err| {
            tracing::warn!(path, error = %err, "Ledger response could not be decoded");
            AppError::BadGateway
        })
    }
}

#[async_trait]
impl Ledger for HttpLedgerClient {
    async fn get_balance(&self, account_id: Uuid) -> Result<Decimal, AppError> {
        let response: BalanceResponse = self
            .get_json(&format!("api/v1/accounts/{account_id}/balance"))
            .await?;
        Ok(response.balance)
    }

    async fn get_transactions(&self, account_id: Uuid) -> Result<Vec<TransactionRecord>, AppError> {
        self.get_json(&format!("api/v1/accounts/{account_id}/transactions"))
            .await
    }

    async fn get_transaction(&self, id: Uuid) -> Result<TransactionRecord, AppError> {
        self.get_json(&format!("api/v1/transactions/{id}")).await
    }

    async fn create_deposit(&self, request: &SimpleTransactionRequest) -> Result<Uuid, AppError> {
        self.post_json("api/v1/transactions/deposit", request).await
    }

    async fn create_withdraw(&self, request: &SimpleTransactionRequest) -> Result<Uuid, AppError> {
        self.post_json("api/v1/transactions/withdraw", request).await
    }

    async fn create_transfer(&self, request: &LedgerTransferRequest) -> Result<Vec<Uuid>, AppError> {
        self.post_json("api/v1/transactions/transfer", request).await
    }
}
