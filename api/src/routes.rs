//! Router assembly

use std::sync::Arc;

use anyhow::Context;
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::GovernorLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{self, cookies::CSRF_HEADER};
use crate::config::Config;
use crate::handlers;
use crate::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    let csrf_header = HeaderName::from_static(CSRF_HEADER);

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-requested-with"),
            csrf_header.clone(),
        ])
        .expose_headers([csrf_header])
}

/// Build the full application router
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let admin_routes = Router::new()
        .route(
            "/users/",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/users/:id/",
            get(handlers::get_user)
                .put(handlers::update_user)
                .patch(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/dashboard/stats/", get(handlers::stats))
        .route("/dashboard/orders/recent/", get(handlers::recent_orders))
        .route("/dashboard/revenue/", get(handlers::revenue))
        .route("/tokens/assign/", post(handlers::assign))
        .route("/tokens/summary/", get(handlers::summary))
        .route("/tokens/refresh/", post(handlers::refresh))
        .route(
            "/shift-allocations/",
            get(handlers::list_allocations).post(handlers::create_allocation),
        )
        .route(
            "/shift-allocations/:id/",
            get(handlers::get_allocation)
                .put(handlers::update_allocation)
                .delete(handlers::delete_allocation),
        )
        .route(
            "/token-distributions/",
            get(handlers::list_distributions).post(handlers::create_distribution),
        )
        .route(
            "/token-distributions/:id/",
            get(handlers::get_distribution)
                .put(handlers::update_distribution)
                .delete(handlers::delete_distribution),
        )
        .route_layer(middleware::from_fn(auth::require_admin));

    let staff_routes = Router::new()
        .route(
            "/menu/",
            get(handlers::list_menu).post(handlers::create_menu_item),
        )
        .route(
            "/menu/:id/",
            get(handlers::get_menu_item)
                .put(handlers::update_menu_item)
                .patch(handlers::update_menu_item)
                .delete(handlers::delete_menu_item),
        )
        .route("/orders/", get(handlers::list_orders))
        .route(
            "/orders/:id/",
            get(handlers::get_order).delete(handlers::delete_order),
        )
        .route(
            "/orders/:id/update_status/",
            patch(handlers::update_order_status),
        )
        .route_layer(middleware::from_fn(auth::require_staff_or_admin));

    let employee_routes = Router::new()
        .route("/menu/", get(handlers::available_menu))
        .route("/order/", post(handlers::place_order))
        .route("/orders/", get(handlers::my_orders))
        .route_layer(middleware::from_fn(auth::require_employee));

    let guest_routes = Router::new()
        .route("/menu/", get(handlers::available_menu))
        .route("/order/", post(handlers::place_order))
        .route("/orders/", get(handlers::my_orders))
        .route_layer(middleware::from_fn(auth::require_guest));

    // Everything that needs a session
    let session_routes = Router::new()
        .route("/logout/", post(handlers::logout))
        .route("/profile/", get(handlers::profile))
        .route("/update_password/", post(handlers::update_password))
        .nest("/admin", admin_routes)
        .nest("/staff", staff_routes)
        .nest("/employee", employee_routes)
        .nest("/guest", guest_routes)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::session_middleware,
        ));

    let mut login_routes = Router::new().route("/login/", post(handlers::login));
    if state.config.login_rate_limit {
        // Burst of 5 attempts per peer IP, then one every 2 seconds
        let governor_config = Arc::new(
            GovernorConfigBuilder::default()
                .key_extractor(PeerIpKeyExtractor)
                .per_second(2)
                .burst_size(5)
                .finish()
                .context("Failed to build login rate limiter")?,
        );
        login_routes = login_routes.layer(GovernorLayer {
            config: governor_config,
        });
    }

    let api_routes = Router::new()
        .route("/csrf/", get(handlers::csrf))
        .merge(login_routes)
        .merge(session_routes);

    Ok(Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes)
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
