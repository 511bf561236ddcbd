//! Customer data models and API request/response types.
//!
//! This module defines:
//! - `Customer`: Database entity representing a customer
//! - `CustomerRegistration` / `CustomerProfile`: service inputs
//! - Request bodies with their boundary validation
//! - Response bodies returned to clients

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::role::Role;

/// Represents a customer record from the database.
///
/// # Database Table
///
/// Maps to the `customers` table. Each customer:
/// - Has a unique email
/// - Owns zero or more accounts (the RUB account from registration on)
/// - Carries a role that decides which currencies it may hold
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Customer {
    pub id: Uuid,

    pub role: Role,

    pub is_deactivated: bool,

    pub email: String,

    /// Opaque hash produced by `services::password::hash_password`
    pub password_hash: String,

    pub first_name: String,

    pub last_name: String,

    pub phone: String,

    pub address: String,

    pub birth_date: NaiveDate,

    /// Expiry of a manually granted VIP status.
    ///
    /// Only meaningful while `role` is VIP. NULL means VIP by batch membership.
    pub custom_vip_due_date: Option<DateTime<Utc>>,
}

impl Customer {
    /// Whether a manual VIP grant still protects this customer at `now`.
    pub fn has_active_manual_vip(&self, now: DateTime<Utc>) -> bool {
        self.custom_vip_due_date.is_some_and(|due| due >= now)
    }
}

/// Data required to register a new customer.
#[derive(Debug, Clone)]
pub struct CustomerRegistration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub birth_date: NaiveDate,
}

/// Editable profile fields.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CustomerProfile {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
}

/// Request body for registering a customer.
///
/// # JSON Example
///
/// ```json
/// {
///   "email": "anna@example.com",
///   "password": "s3cretpass",
///   "first_name": "Anna",
///   "last_name": "Petrova",
///   "phone": "79990001122",
///   "address": "Nevsky prospect 1, St Petersburg",
///   "birth_date": "1990-04-12"
/// }
/// ```
///
/// # Validation
///
/// - `email`: must look like an email address
/// - `password`: 8 to 15 characters
/// - `phone`: exactly 11 characters
/// - `address`: 10 to 100 characters
/// - `first_name` / `last_name`: 1 to 20 characters
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterCustomerRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub birth_date: NaiveDate,
}

impl RegisterCustomerRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_email(&self.email)?;
        validate_password("password", &self.password)?;
        validate_length("phone", &self.phone, 11, 11)?;
        validate_length("address", &self.address, 10, 100)?;
        validate_length("first_name", &self.first_name, 1, 20)?;
        validate_length("last_name", &self.last_name, 1, 20)?;
        Ok(())
    }
}

impl From<RegisterCustomerRequest> for CustomerRegistration {
    fn from(request: RegisterCustomerRequest) -> Self {
        Self {
            email: request.email,
            password: request.password,
            first_name: request.first_name,
            last_name: request.last_name,
            phone: request.phone,
            address: request.address,
            birth_date: request.birth_date,
        }
    }
}

/// Request body for `POST /api/customers/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_email(&self.email)?;
        validate_password("password", &self.password)
    }
}

/// Response body for a successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

/// Request body for `PUT /api/customers/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateCustomerRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
}

impl UpdateCustomerRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_length("phone", &self.phone, 11, 11)?;
        validate_length("address", &self.address, 10, 100)?;
        validate_length("first_name", &self.first_name, 1, 20)?;
        validate_length("last_name", &self.last_name, 1, 20)?;
        Ok(())
    }
}

impl From<UpdateCustomerRequest> for CustomerProfile {
    fn from(request: UpdateCustomerRequest) -> Self {
        Self {
            first_name: request.first_name,
            last_name: request.last_name,
            phone: request.phone,
            address: request.address,
        }
    }
}

/// Request body for `PATCH /api/customers/{id}/password`.
#[derive(Debug, Deserialize)]
pub struct PasswordUpdateRequest {
    pub current_password: String,
    pub new_password: String,
}

impl PasswordUpdateRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_password("current_password", &self.current_password)?;
        validate_password("new_password", &self.new_password)
    }
}

/// Request body for `PATCH /api/customers/{id}/vip`.
///
/// The expiration must lie in the future.
#[derive(Debug, Deserialize)]
pub struct SetVipRequest {
    pub vip_expiration_date: DateTime<Utc>,
}

impl SetVipRequest {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.vip_expiration_date <= now {
            return Err(AppError::InvalidRequest(
                "vip_expiration_date must be in the future".to_string(),
            ));
        }
        Ok(())
    }
}

/// Request body for `POST /api/customers/vip/batch`.
///
/// Carries the ids of every customer currently eligible for VIP.
#[derive(Debug, Deserialize)]
pub struct BatchVipRequest {
    pub customer_ids: Vec<Uuid>,
}

/// Pagination query for `GET /api/customers`.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page_number: Option<u32>,
    pub page_size: Option<u32>,
}

/// Short customer view used in listings.
#[derive(Debug, Serialize, Deserialize)]
pub struct CustomerResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub birth_date: NaiveDate,
}

impl From<Customer> for CustomerResponse {
    fn from(customer: Customer) -> Self {
        Self {
            id: customer.id,
            first_name: customer.first_name,
            last_name: customer.last_name,
            phone: customer.phone,
            address: customer.address,
            birth_date: customer.birth_date,
        }
    }
}

/// Full customer view. Never includes the password hash.
#[derive(Debug, Serialize, Deserialize)]
pub struct CustomerFullResponse {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub is_deactivated: bool,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub birth_date: NaiveDate,
    pub custom_vip_due_date: Option<DateTime<Utc>>,
}

impl From<Customer> for CustomerFullResponse {
    fn from(customer: Customer) -> Self {
        Self {
            id: customer.id,
            email: customer.email,
            role: customer.role,
            is_deactivated: customer.is_deactivated,
            first_name: customer.first_name,
            last_name: customer.last_name,
            phone: customer.phone,
            address: customer.address,
            birth_date: customer.birth_date,
            custom_vip_due_date: customer.custom_vip_due_date,
        }
    }
}

/// Result of a batch VIP recomputation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleBatchOutcome {
    pub promoted: Vec<Uuid>,
    pub demoted: Vec<Uuid>,
}

impl RoleBatchOutcome {
    pub fn affected_ids(&self) -> Vec<Uuid> {
        self.promoted
            .iter()
            .chain(self.demoted.iter())
            .copied()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.promoted.is_empty() && self.demoted.is_empty()
    }
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidRequest(format!(
            "email '{email}' is not a valid email address"
        )))
    }
}

fn validate_password(field: &str, password: &str) -> Result<(), AppError> {
    validate_length(field, password, 8, 15)
}

fn validate_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), AppError> {
    let length = value.chars().count();
    if length < min || length > max {
        let expected = if min == max {
            format!("exactly {min}")
        } else {
            format!("between {min} and {max}")
        };
        return Err(AppError::InvalidRequest(format!(
            "{field} must be {expected} characters long"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn registration() -> RegisterCustomerRequest {
        RegisterCustomerRequest {
            email: "anna@example.com".to_string(),
            password: "s3cretpass".to_string(),
            first_name: "Anna".to_string(),
            last_name: "Petrova".to_string(),
            phone: "79990001122".to_string(),
            address: "Nevsky prospect 1".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
        }
    }

    #[test]
    fn test_valid_registration_passes() {
        assert!(registration().validate().is_ok());
    }

    #[rstest]
    #[case::no_at("anna.example.com")]
    #[case::no_local("@example.com")]
    #[case::no_dot("anna@example")]
    #[case::two_ats("a@b@example.com")]
    fn test_invalid_email_rejected(#[case] email: &str) {
        let mut request = registration();
        request.email = email.to_string();
        assert!(matches!(request.validate(), Err(AppError::InvalidRequest(_))));
    }

    #[rstest]
    #[case::short_password("short")]
    #[case::long_password("this-password-is-way-too-long")]
    fn test_password_length_enforced(#[case] password: &str) {
        let mut request = registration();
        request.password = password.to_string();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_phone_must_have_eleven_characters() {
        let mut request = registration();
        request.phone = "12345".to_string();
        let err = request.validate().unwrap_err();
        assert_eq!(err.to_string(), "phone must be exactly 11 characters long");
    }

    #[test]
    fn test_vip_expiration_must_be_in_future() {
        let now = Utc::now();
        let past = SetVipRequest {
            vip_expiration_date: now - chrono::Duration::days(1),
        };
        let future = SetVipRequest {
            vip_expiration_date: now + chrono::Duration::days(1),
        };
        assert!(past.validate(now).is_err());
        assert!(future.validate(now).is_ok());
    }

    #[test]
    fn test_manual_vip_protection() {
        let now = Utc::now();
        let mut customer = Customer {
            id: Uuid::new_v4(),
            role: Role::Vip,
            is_deactivated: false,
            email: "a@b.com".to_string(),
            password_hash: String::new(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            phone: "79990001122".to_string(),
            address: "Somewhere 12".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            custom_vip_due_date: None,
        };
        assert!(!customer.has_active_manual_vip(now));

        customer.custom_vip_due_date = Some(now - chrono::Duration::hours(1));
        assert!(!customer.has_active_manual_vip(now));

        customer.custom_vip_due_date = Some(now + chrono::Duration::hours(1));
        assert!(customer.has_active_manual_vip(now));
    }
}
