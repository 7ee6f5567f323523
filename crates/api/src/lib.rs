//! HTTP API server for the bookstore platform.
//!
//! Thin typed adapter over the domain services: routes, DTOs, identity
//! extraction from gateway headers, error→status mapping, structured
//! logging (tracing), and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use document_store::{BookStore, CartStore, OrderStore, ReviewStore};
use domain::{CartService, CatalogService, CheckoutService, ReviewService};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// The full store capability the API needs from a backend.
pub trait Store: BookStore + CartStore + OrderStore + ReviewStore + Clone + 'static {}

impl<T: BookStore + CartStore + OrderStore + ReviewStore + Clone + 'static> Store for T {}

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub catalog: CatalogService<S>,
    pub carts: CartService<S>,
    pub checkout: CheckoutService<S>,
    pub reviews: ReviewService<S>,
}

/// Creates the application state from a store backend.
pub fn create_state<S: Store>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState {
        catalog: CatalogService::new(store.clone()),
        carts: CartService::new(store.clone()),
        checkout: CheckoutService::new(store.clone()),
        reviews: ReviewService::new(store),
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        // Catalog
        .route("/books", get(routes::books::list::<S>))
        .route("/books", post(routes::books::create::<S>))
        .route("/books/{id}", get(routes::books::get::<S>))
        .route("/books/{id}", put(routes::books::update::<S>))
        .route("/books/{id}", delete(routes::books::delete::<S>))
        // Reviews
        .route("/books/{id}/reviews", get(routes::reviews::list_for_book::<S>))
        .route("/books/{id}/reviews", post(routes::reviews::create::<S>))
        .route("/reviews/{id}", get(routes::reviews::get::<S>))
        .route("/reviews/{id}", put(routes::reviews::update::<S>))
        .route("/reviews/{id}", delete(routes::reviews::delete::<S>))
        // Cart
        .route("/cart", get(routes::cart::get::<S>))
        .route("/cart", delete(routes::cart::clear::<S>))
        .route("/cart/items", post(routes::cart::add_item::<S>))
        .route("/cart/items/{id}", put(routes::cart::update_item::<S>))
        .route("/cart/items/{id}", delete(routes::cart::remove_item::<S>))
        // Orders
        .route("/orders", post(routes::orders::place::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/pay", put(routes::orders::pay::<S>))
        .route("/orders/{id}/status", put(routes::orders::update_status::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
