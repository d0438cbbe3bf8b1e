//! Cookie helpers
//!
//! `sessionid` carries the raw session token and is HttpOnly. `csrftoken` is
//! readable by the frontend, which echoes it back in the `X-CSRFToken` header.

use axum::http::{header, HeaderMap, HeaderValue};
use cookie::{time::Duration, Cookie, SameSite};

use crate::error::AppError;

pub const SESSION_COOKIE: &str = "sessionid";
pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_HEADER: &str = "x-csrftoken";

/// One year
const CSRF_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 7 * 52;

/// Value of a request cookie; empty values count as absent
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Session cookie; without `max_age_secs` it ends with the browser session
pub fn session_cookie(token: &str, secure: bool, max_age_secs: Option<i64>) -> Cookie<'static> {
    let mut builder = Cookie::build((SESSION_COOKIE, token.to_string()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(secure);
    if let Some(secs) = max_age_secs {
        builder = builder.max_age(Duration::seconds(secs));
    }
    builder.build()
}

pub fn csrf_cookie(token: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((CSRF_COOKIE, token.to_string()))
        .http_only(false)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(secure)
        .max_age(Duration::seconds(CSRF_MAX_AGE_SECS))
        .build()
}

/// An already-expired cookie that makes the browser drop `name`
pub fn expired_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    Cookie::build((name, ""))
        .same_site(SameSite::Lax)
        .path("/")
        .secure(secure)
        .max_age(Duration::ZERO)
        .build()
}

/// Render cookies as `Set-Cookie` response headers
pub fn set_cookie_headers(cookies: &[Cookie<'_>]) -> Result<HeaderMap, AppError> {
    let mut headers = HeaderMap::new();
    for cookie in cookies {
        let value = HeaderValue::from_str(&cookie.to_string())
            .map_err(|e| AppError::Internal(format!("Invalid cookie header: {}", e)))?;
        headers.append(header::SET_COOKIE, value);
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_cookie(raw: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(raw).unwrap());
        headers
    }

    #[test]
    fn reads_named_cookie() {
        let headers = with_cookie("csrftoken=abc; sessionid=def123");

        assert_eq!(read_cookie(&headers, SESSION_COOKIE).as_deref(), Some("def123"));
        assert_eq!(read_cookie(&headers, CSRF_COOKIE).as_deref(), Some("abc"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn empty_cookie_is_absent() {
        let headers = with_cookie("sessionid=");
        assert_eq!(read_cookie(&headers, SESSION_COOKIE), None);
    }

    #[test]
    fn session_cookie_attributes() {
        let rendered = session_cookie("tok", true, None).to_string();

        assert!(rendered.starts_with("sessionid=tok"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Secure"));
        assert!(!rendered.contains("Max-Age"));
    }

    #[test]
    fn remembered_session_has_max_age() {
        let rendered = session_cookie("tok", false, Some(1_209_600)).to_string();

        assert!(rendered.contains("Max-Age=1209600"));
        assert!(!rendered.contains("Secure"));
    }

    #[test]
    fn csrf_cookie_is_script_readable() {
        let rendered = csrf_cookie("tok", false).to_string();

        assert!(rendered.starts_with("csrftoken=tok"));
        assert!(!rendered.contains("HttpOnly"));
    }

    #[test]
    fn expired_cookie_has_zero_max_age() {
        assert!(expired_cookie(SESSION_COOKIE, false)
            .to_string()
            .contains("Max-Age=0"));
    }

    #[test]
    fn renders_one_header_per_cookie() {
        let headers = set_cookie_headers(&[
            session_cookie("a", false, None),
            csrf_cookie("b", false),
        ])
        .unwrap();

        assert_eq!(headers.get_all(header::SET_COOKIE).iter().count(), 2);
    }
}
