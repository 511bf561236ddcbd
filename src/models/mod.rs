//! Data models representing database entities, API bodies and ledger records.

/// Customer account model
pub mod account;
/// Authenticated caller identity
pub mod caller;
/// Currencies and currency tiers
pub mod currency;
/// Customer model
pub mod customer;
/// State-change notifications
pub mod notification;
/// Customer roles
pub mod role;
/// Ledger transaction requests and records
pub mod transaction;
