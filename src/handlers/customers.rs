//! Customer HTTP handlers.
//!
//! This module implements the customer-related API endpoints:
//! - POST /api/customers - Register (public)
//! - POST /api/customers/login - Obtain an access token (public)
//! - GET /api/customers - List customers (admin)
//! - GET /api/customers/{id} - Full customer info (admin or self)
//! - GET /api/customers/{id}/accounts - Customer accounts (admin or self)
//! - PUT /api/customers/{id} - Update profile (self)
//! - PATCH /api/customers/{id}/password - Change password (self)
//! - PATCH /api/customers/{id}/vip - Grant VIP until a date (admin)
//! - PATCH /api/customers/{id}/activate|deactivate (admin)
//! - DELETE /api/customers/{id} (admin)
//! - POST /api/customers/vip/batch - Recompute VIP roles (admin)

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::{require_admin, require_self},
    models::{
        account::{AccountResponse, CreatedResponse},
        caller::CallerIdentity,
        customer::{
            BatchVipRequest, CustomerFullResponse, CustomerResponse, LoginRequest, LoginResponse,
            PageQuery, PasswordUpdateRequest, RegisterCustomerRequest, RoleBatchOutcome,
            SetVipRequest, UpdateCustomerRequest,
        },
    },
    repositories::Page,
    state::AppState,
};

/// Register a customer. A RUB account is opened with it.
///
/// # Request Body
///
/// ```json
/// {
///   "email": "anna@example.com",
///   "password": "s3cretpass",
///   "first_name": "Anna",
///   "last_name": "Petrova",
///   "phone": "79990001122",
///   "address": "Nevsky prospect 1",
///   "birth_date": "1990-04-12"
/// }
/// ```
///
/// # Response (201)
///
/// ```json
/// { "id": "550e8400-..." }
/// ```
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterCustomerRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    request.validate()?;
    let id = state.customers.register(request.into()).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// Exchange credentials for a bearer token.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    request.validate()?;
    let customer = state
        .customers
        .authenticate(&request.email, &request.password)
        .await?;

    let issued = state
        .tokens
        .issue(&CallerIdentity::new(customer.id, customer.role))?;

    Ok(Json(LoginResponse {
        access_token: issued.token,
        token_type: "Bearer".to_string(),
        expires_at: issued.expires_at,
    }))
}

/// List customers, `?page_number=1&page_size=10`.
pub async fn list_customers(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<CustomerResponse>>, AppError> {
    require_admin(&caller)?;
    let customers = state
        .customers
        .get_all(Page::new(query.page_number, query.page_size))
        .await?;
    Ok(Json(customers.into_iter().map(Into::into).collect()))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<CustomerFullResponse>, AppError> {
    if !caller.may_read(customer_id) {
        return Err(AppError::AuthorizationFailed(format!(
            "Customer with id {} cannot read customer with id {customer_id}.",
            caller.customer_id
        )));
    }
    let customer = state.customers.get_full_info(customer_id).await?;
    Ok(Json(customer.into()))
}

pub async fn get_customer_accounts(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<Vec<AccountResponse>>, AppError> {
    let accounts = state
        .accounts
        .get_accounts_by_customer(customer_id, &caller)
        .await?;
    Ok(Json(accounts.into_iter().map(Into::into).collect()))
}

pub async fn update_customer(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(customer_id): Path<Uuid>,
    Json(request): Json<UpdateCustomerRequest>,
) -> Result<Json<CustomerFullResponse>, AppError> {
    require_self(&caller, customer_id)?;
    request.validate()?;
    let customer = state
        .customers
        .update_profile(customer_id, request.into())
        .await?;
    Ok(Json(customer.into()))
}

pub async fn update_password(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(customer_id): Path<Uuid>,
    Json(request): Json<PasswordUpdateRequest>,
) -> Result<StatusCode, AppError> {
    require_self(&caller, customer_id)?;
    request.validate()?;
    state
        .customers
        .update_password(customer_id, &request.current_password, &request.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Grant VIP until `vip_expiration_date`.
///
/// # Request Body
///
/// ```json
/// { "vip_expiration_date": "2026-01-01T00:00:00Z" }
/// ```
pub async fn set_manual_vip(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(customer_id): Path<Uuid>,
    Json(request): Json<SetVipRequest>,
) -> Result<StatusCode, AppError> {
    require_admin(&caller)?;
    request.validate(Utc::now())?;
    state
        .customers
        .set_manual_vip(customer_id, request.vip_expiration_date)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn activate_customer(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(customer_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_admin(&caller)?;
    state.customers.activate(customer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn deactivate_customer(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(customer_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_admin(&caller)?;
    state.customers.deactivate(customer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_customer(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(customer_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_admin(&caller)?;
    state.customers.delete_customer(customer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Recompute VIP roles from the set of currently eligible customers.
///
/// # Request Body
///
/// ```json
/// { "customer_ids": ["550e8400-...", "660e8400-..."] }
/// ```
///
/// # Response (200)
///
/// ```json
/// { "promoted": ["550e8400-..."], "demoted": [] }
/// ```
pub async fn batch_recompute_vip(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(request): Json<BatchVipRequest>,
) -> Result<Json<RoleBatchOutcome>, AppError> {
    require_admin(&caller)?;
    let outcome = state
        .customers
        .batch_recompute_vip_roles(&request.customer_ids)
        .await?;
    Ok(Json(outcome))
}
