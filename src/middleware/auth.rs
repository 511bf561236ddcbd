//! Bearer token authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the token from the Authorization header
//! 2. Verify its signature and expiry
//! 3. Inject the resolved `CallerIdentity` into the request
//! 4. Reject unauthenticated requests with HTTP 401
//!
//! # Token Format
//!
//! `<customer_id>.<role>.<expires unix seconds>.<hex hmac-sha256>`
//!
//! Tokens are stateless: the role is fixed at login and stays in effect
//! until the token expires.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{caller::CallerIdentity, role::Role},
    services::signing,
    state::AppState,
};

/// A freshly issued access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies signed access tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    pub fn issue(&self, caller: &CallerIdentity) -> Result<IssuedToken, AppError> {
        self.issue_at(caller, Utc::now())
    }

    pub fn verify(&self, token: &str) -> Result<CallerIdentity, AppError> {
        self.verify_at(token, Utc::now())
    }

    fn issue_at(&self, caller: &CallerIdentity, now: DateTime<Utc>) -> Result<IssuedToken, AppError> {
        let expires_at = now + self.ttl;
        let claims = format!(
            "{}.{}.{}",
            caller.customer_id,
            caller.role,
            expires_at.timestamp()
        );
        let signature = signing::sign(self.secret.as_bytes(), claims.as_bytes())?;

        Ok(IssuedToken {
            token: format!("{claims}.{signature}"),
            expires_at,
        })
    }

    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<CallerIdentity, AppError> {
        let (claims, signature) = token.rsplit_once('.').ok_or(AppError::InvalidToken)?;
        if !signing::verify(self.secret.as_bytes(), claims.as_bytes(), signature) {
            return Err(AppError::InvalidToken);
        }

        let mut parts = claims.split('.');
        let (Some(id), Some(role), Some(expires), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AppError::InvalidToken);
        };

        let customer_id = Uuid::parse_str(id).map_err(|_| AppError::InvalidToken)?;
        let role: Role = role.parse().map_err(|_| AppError::InvalidToken)?;
        let expires: i64 = expires.parse().map_err(|_| AppError::InvalidToken)?;

        if expires < now.timestamp() {
            return Err(AppError::InvalidToken);
        }

        Ok(CallerIdentity::new(customer_id, role))
    }
}

/// Authentication middleware function.
///
/// Expected header format:
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// On success the handler can extract `Extension<CallerIdentity>`.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AppError::InvalidToken)?;

    let caller = state.tokens.verify(token)?;

    request.extensions_mut().insert(caller);

    Ok(next.run(request).await)
}

pub fn require_admin(caller: &CallerIdentity) -> Result<(), AppError> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// Only the customer itself may act on `customer_id`.
pub fn require_self(caller: &CallerIdentity, customer_id: Uuid) -> Result<(), AppError> {
    if caller.customer_id == customer_id {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// Roles that hold accounts (Regular, VIP).
pub fn require_account_holder(caller: &CallerIdentity) -> Result<(), AppError> {
    if caller.role.can_hold_accounts() {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}
