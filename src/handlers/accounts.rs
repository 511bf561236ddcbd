//! Account HTTP handlers.
//!
//! This module implements the account-related API endpoints:
//! - POST /api/accounts - Open an account for the caller
//! - GET /api/accounts/{id} - Account with ledger balance (owner or admin)
//! - GET /api/accounts/{id}/transactions - Ledger history (owner or admin)
//! - PATCH /api/accounts/{id}/activate|deactivate - Toggle (admin)

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::{require_account_holder, require_admin},
    models::{
        account::{AccountFullInfo, CreateAccountRequest, CreatedResponse},
        caller::CallerIdentity,
        transaction::TransactionRecord,
    },
    state::AppState,
};

/// Open a new account for the authenticated customer.
///
/// # Request Body
///
/// ```json
/// { "currency": "EUR" }
/// ```
///
/// # Response (201)
///
/// ```json
/// { "id": "550e8400-..." }
/// ```
pub async fn create_account(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    require_account_holder(&caller)?;
    let id = state
        .accounts
        .create_account(caller.customer_id, request.currency)
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// Get an account merged with its ledger balance.
///
/// # Response (200)
///
/// ```json
/// {
///   "id": "550e8400-...",
///   "customer_id": "660e8400-...",
///   "currency": "RUB",
///   "is_deactivated": false,
///   "date_created": "2025-02-10T12:00:00Z",
///   "balance": "1500.00"
/// }
/// ```
pub async fn get_account(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<AccountFullInfo>, AppError> {
    let info = state.accounts.get_full_info(account_id, &caller).await?;
    Ok(Json(info))
}

pub async fn get_account_transactions(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<Vec<TransactionRecord>>, AppError> {
    let records = state.accounts.get_transactions(account_id, &caller).await?;
    Ok(Json(records))
}

pub async fn activate_account(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(account_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_admin(&caller)?;
    state.accounts.activate(account_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn deactivate_account(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(account_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_admin(&caller)?;
    state.accounts.deactivate(account_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
