//! Auth handlers
//!
//! CSRF bootstrap, login, logout, profile and password change.

use axum::{extract::State, http::HeaderMap, Extension, Json};
use serde::{Deserialize, Serialize};

use super::users::UserResponse;
use crate::app::generate_token;
use crate::auth::cookies::{
    csrf_cookie, expired_cookie, read_cookie, session_cookie, set_cookie_headers, CSRF_COOKIE,
    SESSION_COOKIE,
};
use crate::auth::SessionToken;
use crate::domain::entities::{Role, User, UserId};
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CsrfResponse {
    pub message: &'static str,
    pub csrftoken: String,
}

/// GET /api/csrf/
///
/// Issue (or re-issue) the `csrftoken` cookie.
pub async fn csrf(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(HeaderMap, Json<CsrfResponse>), AppError> {
    let token = read_cookie(&headers, CSRF_COOKIE).unwrap_or_else(generate_token);
    let cookies = set_cookie_headers(&[csrf_cookie(&token, state.config.cookie_secure)])?;

    Ok((
        cookies,
        Json(CsrfResponse {
            message: "CSRF cookie set",
            csrftoken: token,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Keep the cookie past the browser session
    #[serde(default)]
    pub remember_me: bool,
    /// Also return the session token in the body, for `Authorization: Bearer` clients
    #[serde(default)]
    pub include_token: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub is_staff: bool,
    pub is_superuser: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl From<&User> for LoginResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.full_name(),
            role: user.role,
            is_staff: matches!(user.role, Role::Admin | Role::Staff),
            is_superuser: user.role == Role::Admin,
            token: None,
        }
    }
}

/// POST /api/login/
///
/// Sets the `sessionid` cookie and rotates `csrftoken`. With `include_token`
/// the same session token is echoed as `token` for bearer clients.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<LoginResponse>), AppError> {
    if request.username.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::BadRequest(
            "Username and password are required".to_string(),
        ));
    }

    let (user, token) = state
        .auth_service
        .login(&request.username, &request.password)
        .await?;

    let secure = state.config.cookie_secure;
    let max_age = request
        .remember_me
        .then_some(state.config.session_ttl_secs);
    let cookies = set_cookie_headers(&[
        session_cookie(&token, secure, max_age),
        csrf_cookie(&generate_token(), secure),
    ])?;

    let mut response = LoginResponse::from(&user);
    if request.include_token {
        response.token = Some(token);
    }

    Ok((cookies, Json(response)))
}

/// POST /api/logout/
pub async fn logout(
    State(state): State<AppState>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> Result<(HeaderMap, Json<MessageResponse>), AppError> {
    state.auth_service.logout(&token).await?;

    let secure = state.config.cookie_secure;
    let cookies = set_cookie_headers(&[
        expired_cookie(SESSION_COOKIE, secure),
        expired_cookie(CSRF_COOKIE, secure),
    ])?;

    Ok((
        cookies,
        Json(MessageResponse {
            message: "Logout successful".to_string(),
        }),
    ))
}

/// GET /api/profile/
pub async fn profile(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Json<UserResponse> {
    Json(UserResponse::new(&user, state.clock.today()))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

/// POST /api/update_password/
///
/// Ends every session of the user and sets a fresh session cookie.
pub async fn update_password(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdatePasswordRequest>,
) -> Result<(HeaderMap, Json<MessageResponse>), AppError> {
    let (Some(old), Some(new)) = (
        request.old_password.filter(|p| !p.is_empty()),
        request.new_password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::BadRequest(
            "Both old_password and new_password are required".to_string(),
        ));
    };

    let token = state.auth_service.change_password(&user, &old, &new).await?;
    let cookies = set_cookie_headers(&[session_cookie(
        &token,
        state.config.cookie_secure,
        None,
    )])?;

    Ok((
        cookies,
        Json(MessageResponse {
            message: "Password updated successfully".to_string(),
        }),
    ))
}
