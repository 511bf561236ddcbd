//! Request middleware.
//!
//! Only authentication lives here: the bearer token is turned into a
//! `CallerIdentity` before any protected handler runs.

pub mod auth;
