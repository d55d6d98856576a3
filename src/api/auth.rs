use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;
use tracing::debug;

use super::AppState;

/// Token authentication middleware.
///
/// Accepts `Authorization: token <token>` (the notebook server's scheme) or
/// `Authorization: Bearer <token>` and compares it to the configured token.
/// Returns 401 on mismatch or missing header. Passes everything through when
/// no token is configured.
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.auth_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_token)
        .is_some_and(|token| token.as_bytes().ct_eq(expected.as_bytes()).into());

    if authorized {
        Ok(next.run(request).await)
    } else {
        debug!(path = %request.uri().path(), "Rejected unauthenticated request");
        Err(StatusCode::UNAUTHORIZED)
    }
}

/// The token part of an Authorization header value
fn extract_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") {
        Some(token.trim())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token("token abc"), Some("abc"));
        assert_eq!(extract_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_token("Basic abc"), None);
        assert_eq!(extract_token("abc"), None);
    }
}
