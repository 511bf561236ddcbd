//! HTTP router.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;

use crate::{handlers, middleware, state::AppState};

/// Build the application router.
///
/// Registration, login and health are public. Every other route requires a
/// bearer token; per-route role checks happen in the handlers.
pub fn router(state: AppState) -> Router {
    let authenticated_routes = Router::new()
        // Customer routes
        .route("/api/customers", get(handlers::customers::list_customers))
        .route(
            "/api/customers/vip/batch",
            post(handlers::customers::batch_recompute_vip),
        )
        .route(
            "/api/customers/{id}",
            get(handlers::customers::get_customer)
                .put(handlers::customers::update_customer)
                .delete(handlers::customers::delete_customer),
        )
        .route(
            "/api/customers/{id}/accounts",
            get(handlers::customers::get_customer_accounts),
        )
        .route(
            "/api/customers/{id}/password",
            patch(handlers::customers::update_password),
        )
        .route(
            "/api/customers/{id}/vip",
            patch(handlers::customers::set_manual_vip),
        )
        .route(
            "/api/customers/{id}/activate",
            patch(handlers::customers::activate_customer),
        )
        .route(
            "/api/customers/{id}/deactivate",
            patch(handlers::customers::deactivate_customer),
        )
        // Account routes
        .route("/api/accounts", post(handlers::accounts::create_account))
        .route("/api/accounts/{id}", get(handlers::accounts::get_account))
        .route(
            "/api/accounts/{id}/transactions",
            get(handlers::accounts::get_account_transactions),
        )
        .route(
            "/api/accounts/{id}/activate",
            patch(handlers::accounts::activate_account),
        )
        .route(
            "/api/accounts/{id}/deactivate",
            patch(handlers::accounts::deactivate_account),
        )
        // Transaction routes
        .route(
            "/api/transactions/deposit",
            post(handlers::transactions::create_deposit),
        )
        .route(
            "/api/transactions/withdraw",
            post(handlers::transactions::create_withdraw),
        )
        .route(
            "/api/transactions/transfer",
            post(handlers::transactions::create_transfer),
        )
        .route(
            "/api/transactions/{id}",
            get(handlers::transactions::get_transaction),
        )
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        .route("/api/customers", post(handlers::customers::register))
        .route("/api/customers/login", post(handlers::customers::login))
        .merge(authenticated_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
