//! Identity of the caller, resolved by the authentication middleware.

use uuid::Uuid;

use crate::models::role::Role;

/// The `(customer_id, role)` pair every authenticated request carries.
///
/// Inserted into request extensions by `middleware::auth::auth_middleware`
/// and handed to the services as-is; the services never see tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerIdentity {
    pub customer_id: Uuid,
    pub role: Role,
}

impl CallerIdentity {
    pub fn new(customer_id: Uuid, role: Role) -> Self {
        Self { customer_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins may read every customer's resources, everybody else only their own.
    pub fn may_read(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.customer_id == owner_id
    }
}
