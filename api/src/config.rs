use std::env;
use std::str::FromStr;

use anyhow::Context;

use crate::domain::entities::ShiftTokenLimits;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    /// Server-side session lifetime; also the cookie Max-Age when "remember me" is set
    pub session_ttl_secs: i64,
    pub cookie_secure: bool,
    pub csrf_enabled: bool,
    pub login_rate_limit: bool,
    pub run_migrations: bool,
    pub token_limits: ShiftTokenLimits,
    /// Bulk assign is only allowed on days 1..=N of the month
    pub token_assign_window_days: u32,
    pub default_refresh_tokens: i32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: parse_var("PORT", defaults.port)?,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or(defaults.cors_allowed_origins),
            session_ttl_secs: parse_var("SESSION_TTL_SECS", defaults.session_ttl_secs)?,
            cookie_secure: parse_var("COOKIE_SECURE", defaults.cookie_secure)?,
            csrf_enabled: parse_var("CSRF_ENABLED", defaults.csrf_enabled)?,
            login_rate_limit: parse_var("LOGIN_RATE_LIMIT", defaults.login_rate_limit)?,
            run_migrations: parse_var("RUN_MIGRATIONS", defaults.run_migrations)?,
            token_limits: ShiftTokenLimits {
                day: parse_var("TOKENS_DAY", defaults.token_limits.day)?,
                mid: parse_var("TOKENS_MID", defaults.token_limits.mid)?,
                night: parse_var("TOKENS_NIGHT", defaults.token_limits.night)?,
            },
            token_assign_window_days: parse_var(
                "TOKEN_ASSIGN_WINDOW_DAYS",
                defaults.token_assign_window_days,
            )?,
            default_refresh_tokens: parse_var(
                "DEFAULT_REFRESH_TOKENS",
                defaults.default_refresh_tokens,
            )?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            port: 8080,
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            session_ttl_secs: 1_209_600,
            cookie_secure: false,
            csrf_enabled: true,
            login_rate_limit: true,
            run_migrations: true,
            token_limits: ShiftTokenLimits::default(),
            token_assign_window_days: 3,
            default_refresh_tokens: 100,
        }
    }
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}
