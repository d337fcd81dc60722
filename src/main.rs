//! Marketplace Backend
//!
//! Multi-vendor storefront and dashboard REST backend with SQLite persistence and
//! Tantivy product search.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod pricing;
mod search;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Config, LogFormat};
use db::Repository;
use models::ProductFilter;
use search::SearchIndex;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub search: Arc<SearchIndex>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    init_tracing(&config);

    tracing::info!("Starting Marketplace Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (MARKET_API_PSK). Authentication is disabled!");
    }

    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let search = Arc::new(SearchIndex::open(&config.index_path)?);

    // The index is derived data; rebuild it from the catalog on every start.
    let products = repo.list_products(&ProductFilter::default()).await?;
    search.rebuild(&products).await?;

    let state = AppState {
        repo,
        search,
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let psk = state.config.api_psk.clone();

    let api_routes = Router::new()
        .route("/revision", get(api::get_revision))
        // Users, carts and wishlists
        .route("/users", get(api::list_users).post(api::create_user))
        .route(
            "/users/{id}",
            get(api::get_user)
                .put(api::update_user)
                .delete(api::delete_user),
        )
        .route("/users/{id}/cart", get(api::get_cart).delete(api::clear_cart))
        .route("/users/{id}/cart/count", get(api::cart_count))
        .route("/users/{id}/cart/items", post(api::add_cart_item))
        .route(
            "/users/{id}/cart/items/{product_id}",
            put(api::set_cart_quantity).delete(api::remove_cart_item),
        )
        .route(
            "/users/{id}/wishlist",
            get(api::list_wishlist).post(api::add_wishlist_item),
        )
        .route("/users/{id}/wishlist/count", get(api::wishlist_count))
        .route(
            "/users/{id}/wishlist/{product_id}",
            delete(api::remove_wishlist_item),
        )
        // Catalog
        .route("/products", get(api::list_products).post(api::create_product))
        .route("/products/search", get(api::search_products))
        .route(
            "/products/{id}",
            get(api::get_product)
                .put(api::update_product)
                .delete(api::delete_product),
        )
        .route("/coupons", get(api::list_coupons).post(api::create_coupon))
        .route("/coupons/validate", post(api::validate_coupon))
        .route(
            "/coupons/{id}",
            get(api::get_coupon)
                .put(api::update_coupon)
                .delete(api::delete_coupon),
        )
        .route("/deals", get(api::list_deals).post(api::create_deal))
        .route(
            "/deals/{id}",
            get(api::get_deal)
                .put(api::update_deal)
                .delete(api::delete_deal),
        )
        .route(
            "/shipping-methods",
            get(api::list_shipping_methods).post(api::create_shipping_method),
        )
        .route(
            "/shipping-methods/{id}",
            get(api::get_shipping_method)
                .put(api::update_shipping_method)
                .delete(api::delete_shipping_method),
        )
        .route("/settings", get(api::get_settings).put(api::update_settings))
        // Orders
        .route("/checkout", post(api::checkout))
        .route("/orders", get(api::list_orders))
        .route(
            "/orders/{id}",
            get(api::get_order).delete(api::delete_order),
        )
        .route("/orders/{id}/status", put(api::update_order_status))
        .route("/orders/{id}/cancel", post(api::cancel_order))
        // Dashboards and payouts
        .route("/dashboard/stats", get(api::admin_stats))
        .route("/vendors/{id}/products", get(api::vendor_products))
        .route("/vendors/{id}/orders", get(api::vendor_orders))
        .route("/vendors/{id}/summary", get(api::vendor_summary))
        .route(
            "/vendors/{id}/payouts",
            get(api::vendor_payouts).post(api::create_payout),
        )
        .route("/payouts", get(api::list_payouts))
        .route("/payouts/{id}", get(api::get_payout).put(api::update_payout))
        // Chat
        .route("/chats", get(api::list_chats).post(api::create_chat))
        .route("/chats/unread", get(api::unread_count))
        .route("/chats/{id}", get(api::get_chat))
        .route("/chats/{id}/messages", post(api::post_message))
        .route("/chats/{id}/read", post(api::mark_read))
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
