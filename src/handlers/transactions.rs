//! Transaction HTTP handlers.
//!
//! This module implements transaction-related API endpoints:
//! - POST /api/transactions/deposit - Add money to an account
//! - POST /api/transactions/withdraw - Remove money from an account
//! - POST /api/transactions/transfer - Move money between own accounts
//! - GET /api/transactions/{id} - Get transaction details
//!
//! Requests are validated locally and executed by the ledger.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        account::CreatedResponse,
        caller::CallerIdentity,
        transaction::{
            SimpleTransactionRequest, TransactionRecord, TransactionType,
            TransferCreatedResponse, TransferTransactionRequest,
        },
    },
    state::AppState,
};

/// Deposit into an account.
///
/// # Request Body
///
/// ```json
/// {
///   "account_id": "550e8400-...",
///   "amount": "1500.00"
/// }
/// ```
///
/// # Response (201)
///
/// ```json
/// { "id": "770e8400-..." }
/// ```
pub async fn create_deposit(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(request): Json<SimpleTransactionRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    create_simple(state, caller, request, TransactionType::Deposit).await
}

/// Withdraw from an account. Same body and response as deposit.
pub async fn create_withdraw(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(request): Json<SimpleTransactionRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    create_simple(state, caller, request, TransactionType::Withdrawal).await
}

async fn create_simple(
    state: AppState,
    caller: CallerIdentity,
    request: SimpleTransactionRequest,
    transaction_type: TransactionType,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    request.validate()?;
    let id = state
        .transactions
        .create_simple_transaction(&request, caller.customer_id, transaction_type)
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// Transfer between two accounts of the caller.
///
/// # Request Body
///
/// ```json
/// {
///   "from_account_id": "550e8400-...",
///   "to_account_id": "660e8400-...",
///   "amount": "250.00"
/// }
/// ```
///
/// # Response (201)
///
/// ```json
/// { "ids": ["770e8400-...", "880e8400-..."] }
/// ```
pub async fn create_transfer(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(request): Json<TransferTransactionRequest>,
) -> Result<(StatusCode, Json<TransferCreatedResponse>), AppError> {
    request.validate()?;
    let ids = state
        .transactions
        .create_transfer_transaction(request, caller.customer_id)
        .await?;
    Ok((StatusCode::CREATED, Json(TransferCreatedResponse { ids })))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<TransactionRecord>, AppError> {
    let record = state
        .transactions
        .get_transaction(transaction_id, &caller)
        .await?;
    Ok(Json(record))
}
