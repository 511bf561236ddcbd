//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, caller identity)
//! 2. Validates the request and checks the caller's role
//! 3. Delegates to a service and returns the JSON response

/// Account management endpoints
pub mod accounts;

/// Customer management endpoints
pub mod customers;

/// Service health endpoint
pub mod health;

/// Transaction endpoints
pub mod transactions;
