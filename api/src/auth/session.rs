//! Session authentication middleware

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::Response,
};

use super::cookies::{read_cookie, CSRF_COOKIE, CSRF_HEADER, SESSION_COOKIE};
use crate::domain::entities::{Role, User};
use crate::error::{AppError, DomainError};
use crate::AppState;

/// The raw token the current request was authenticated with
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

/// Extract the token from the Authorization header
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn is_safe_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

/// The header must echo the cookie exactly
fn verify_csrf(headers: &HeaderMap) -> Result<(), AppError> {
    let cookie = read_cookie(headers, CSRF_COOKIE);
    let header = headers
        .get(CSRF_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim);

    match (cookie.as_deref(), header) {
        (Some(cookie), Some(header)) if cookie == header => Ok(()),
        _ => Err(AppError::Domain(DomainError::Forbidden(
            "CSRF token missing or incorrect".to_string(),
        ))),
    }
}

/// Authentication middleware
///
/// Accepts `Authorization: Bearer <token>` or the `sessionid` cookie and
/// injects the `User` and its `SessionToken` into request extensions.
/// Cookie-authenticated unsafe requests must also pass the CSRF check.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (token, from_cookie) = match extract_bearer(request.headers()) {
        Some(token) => (token.to_string(), false),
        None => (
            read_cookie(request.headers(), SESSION_COOKIE).ok_or(AppError::Unauthorized)?,
            true,
        ),
    };

    let user = state
        .auth_service
        .authenticate(&token)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if from_cookie && state.config.csrf_enabled && !is_safe_method(request.method()) {
        if let Err(e) = verify_csrf(request.headers()) {
            tracing::debug!(user_id = %user.id, path = %request.uri().path(), "CSRF check failed");
            return Err(e);
        }
    }

    request.extensions_mut().insert(user);
    request.extensions_mut().insert(SessionToken(token));

    Ok(next.run(request).await)
}

async fn require_roles(roles: &[Role], request: Request, next: Next) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<User>()
        .ok_or(AppError::Unauthorized)?;

    if !roles.contains(&user.role) {
        tracing::debug!(
            user_id = %user.id,
            role = %user.role,
            path = %request.uri().path(),
            "Role not allowed"
        );
        return Err(AppError::Forbidden);
    }

    Ok(next.run(request).await)
}

pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    require_roles(&[Role::Admin], request, next).await
}

pub async fn require_staff_or_admin(request: Request, next: Next) -> Result<Response, AppError> {
    require_roles(&[Role::Staff, Role::Admin], request, next).await
}

pub async fn require_employee(request: Request, next: Next) -> Result<Response, AppError> {
    require_roles(&[Role::Employee], request, next).await
}

pub async fn require_guest(request: Request, next: Next) -> Result<Response, AppError> {
    require_roles(&[Role::Guest], request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn bearer_token_is_extracted() {
        let map = headers(&[("authorization", "Bearer abc123")]);
        assert_eq!(extract_bearer(&map), Some("abc123"));

        let map = headers(&[("authorization", "Basic abc123")]);
        assert_eq!(extract_bearer(&map), None);
    }

    #[test]
    fn safe_methods() {
        assert!(is_safe_method(&Method::GET));
        assert!(is_safe_method(&Method::OPTIONS));
        assert!(!is_safe_method(&Method::POST));
        assert!(!is_safe_method(&Method::PATCH));
        assert!(!is_safe_method(&Method::DELETE));
    }

    #[test]
    fn csrf_header_must_match_cookie() {
        let ok = headers(&[("cookie", "csrftoken=t1"), ("x-csrftoken", "t1")]);
        assert!(verify_csrf(&ok).is_ok());

        let mismatch = headers(&[("cookie", "csrftoken=t1"), ("x-csrftoken", "t2")]);
        assert!(verify_csrf(&mismatch).is_err());

        let missing_header = headers(&[("cookie", "csrftoken=t1")]);
        assert!(verify_csrf(&missing_header).is_err());

        let missing_cookie = headers(&[("x-csrftoken", "t1")]);
        assert!(verify_csrf(&missing_cookie).is_err());
    }
}
