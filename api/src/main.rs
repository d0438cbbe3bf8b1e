//! Canteen API Server
//!
//! Token-based ordering backend for a workplace canteen: employees and guests
//! spend a monthly token allowance on menu items, staff run the order queue
//! and admins manage users, allocations and the dashboard.
//! Uses hexagonal (ports & adapters) architecture for clean separation of concerns.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sea_orm::Database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod adapters;
mod app;
mod auth;
mod cli;
mod config;
mod domain;
mod entity;
mod error;
mod handlers;
mod routes;

#[cfg(test)]
mod test_utils;


use adapters::{
    run_migrations, PostgresMenuRepository, PostgresOrderRepository, PostgresSessionRepository,
    PostgresTokenRepository, PostgresUserRepository, SystemClock,
};
use app::{
    AuthService, DashboardService, MenuService, OrderService, TokenPolicy, TokenService,
    UserService,
};
use cli::{Cli, Command};
use config::Config;
use domain::ports::{
    Clock, MenuRepository, OrderRepository, SessionRepository, TokenRepository, UserRepository,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService<dyn UserRepository, dyn SessionRepository>>,
    pub user_service: Arc<UserService<dyn UserRepository>>,
    pub menu_service: Arc<MenuService<dyn MenuRepository>>,
    pub order_service: Arc<OrderService<dyn MenuRepository, dyn OrderRepository>>,
    pub token_service: Arc<TokenService<dyn UserRepository, dyn TokenRepository>>,
    pub dashboard_service:
        Arc<DashboardService<dyn UserRepository, dyn MenuRepository, dyn OrderRepository>>,
    pub clock: Arc<dyn Clock>,
    pub config: Config,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        menu: Arc<dyn MenuRepository>,
        orders: Arc<dyn OrderRepository>,
        tokens: Arc<dyn TokenRepository>,
        clock: Arc<dyn Clock>,
        config: Config,
    ) -> Self {
        let policy = TokenPolicy {
            limits: config.token_limits,
            assign_window_days: config.token_assign_window_days,
            default_refresh: config.default_refresh_tokens,
        };

        Self {
            auth_service: Arc::new(AuthService::new(
                users.clone(),
                sessions,
                clock.clone(),
                config.session_ttl_secs,
            )),
            user_service: Arc::new(UserService::new(users.clone(), clock.clone())),
            menu_service: Arc::new(MenuService::new(menu.clone())),
            order_service: Arc::new(OrderService::new(
                menu.clone(),
                orders.clone(),
                clock.clone(),
            )),
            token_service: Arc::new(TokenService::new(
                users.clone(),
                tokens,
                clock.clone(),
                policy,
            )),
            dashboard_service: Arc::new(DashboardService::new(users, menu, orders, clock.clone())),
            clock,
            config,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,canteen_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let command = Cli::parse().command();

    // Load configuration
    let config = Config::from_env()?;

    // Connect to PostgreSQL
    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    if config.run_migrations {
        run_migrations(&db).await.context("Failed to run migrations")?;
        tracing::info!("Migrations applied");
    }

    // Create adapters
    let state = AppState::new(
        Arc::new(PostgresUserRepository::new(db.clone())),
        Arc::new(PostgresSessionRepository::new(db.clone())),
        Arc::new(PostgresMenuRepository::new(db.clone())),
        Arc::new(PostgresOrderRepository::new(db.clone())),
        Arc::new(PostgresTokenRepository::new(db.clone())),
        Arc::new(SystemClock),
        config,
    );

    match command {
        Command::Serve => serve(state).await,
        Command::ResetTokens { force } => {
            match state.token_service.monthly_reset(force).await? {
                Some(updated) => tracing::info!(updated, "Token balances reset"),
                None => tracing::info!("Not the first of the month; use --force to reset anyway"),
            }
            Ok(())
        }
        Command::CreateAdmin { username, password } => {
            let admin = state
                .auth_service
                .create_admin(&username, &password)
                .await?;
            tracing::info!(user_id = %admin.id, username = %admin.username, "Administrator created");
            Ok(())
        }
    }
}

async fn serve(state: AppState) -> anyhow::Result<()> {
    match state.auth_service.purge_expired_sessions().await {
        Ok(purged) => tracing::debug!(purged, "Purged expired sessions"),
        Err(e) => tracing::warn!(error = %e, "Failed to purge expired sessions"),
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let app = routes::build_router(state)?;

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    // Connect info feeds the per-IP login rate limiter
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
