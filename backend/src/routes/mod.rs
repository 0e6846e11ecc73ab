//! Route definitions for the Warehouse Inventory Platform

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Auth routes (public + protected /me)
        .nest("/auth", auth_routes(state.clone()))
        // Protected routes - user and role administration
        .nest("/users", user_routes(state.clone()))
        .nest("/roles", role_routes(state.clone()))
        // Protected routes - product catalog and batches
        .nest("/products", product_routes(state.clone()))
        // Protected routes - warehouses and locations
        .nest("/warehouses", warehouse_routes(state.clone()))
        // Protected routes - movement requests and the stock ledger
        .nest("/movements", movement_routes(state))
}

/// Authentication routes
fn auth_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .route(
            "/me",
            get(handlers::me).route_layer(middleware::from_fn_with_state(state, auth_middleware)),
        )
}

/// User administration routes (protected)
fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_users))
        .route("/:user_id", get(handlers::get_user).put(handlers::update_user))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Role listing routes (protected)
fn role_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_roles))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Product catalog routes (protected)
fn product_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::deactivate_product),
        )
        .route(
            "/:product_id/batches",
            get(handlers::list_batches).post(handlers::create_batch),
        )
        .route("/:product_id/ledger", get(handlers::get_product_ledger))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Warehouse and location routes (protected)
fn warehouse_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_warehouses).post(handlers::create_warehouse))
        .route(
            "/:warehouse_id",
            get(handlers::get_warehouse).put(handlers::update_warehouse),
        )
        .route("/:warehouse_id/stock", get(handlers::get_warehouse_stock))
        .route(
            "/:warehouse_id/locations",
            get(handlers::list_locations).post(handlers::create_location),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Movement request and ledger routes (protected)
fn movement_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/requests",
            get(handlers::list_my_requests).post(handlers::create_movement_request),
        )
        .route("/requests/pending", get(handlers::list_pending_requests))
        .route(
            "/requests/:request_id",
            get(handlers::get_movement_request).put(handlers::update_movement_request),
        )
        .route("/requests/:request_id/submit", post(handlers::submit_movement_request))
        .route("/requests/:request_id/approve", post(handlers::approve_movement_request))
        .route("/requests/:request_id/reject", post(handlers::reject_movement_request))
        .route("/requests/:request_id/apply", post(handlers::apply_movement_request))
        .route("/requests/:request_id/cancel", post(handlers::cancel_movement_request))
        .route("/stock", get(handlers::get_stock))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
