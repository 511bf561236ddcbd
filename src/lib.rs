//! Customers Service
//!
//! REST API managing customers and their currency accounts for a banking
//! platform. Balances and money movement belong to an external ledger; this
//! service owns the consistency rules around customers, roles and accounts.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx, behind repository traits
//! - **Atomic Writes**: unit of work over one database transaction
//! - **Ledger**: reqwest HTTP client
//! - **Authentication**: HMAC-signed bearer tokens
//! - **Format**: JSON requests/responses

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod rules;
pub mod services;
pub mod state;
pub mod unit_of_work;
