use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::{self, AuthError};
use crate::error::ApiError;
use crate::models::Identity;
use crate::state::AppState;

const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Verified request identity, inserted by the middlewares below. Handlers
/// extract it and pass the inner [`Identity`] explicitly into services.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub Identity);

/// Identity verification for protected routes: a request without a valid
/// credential never reaches the handler, so no resource lookup can leak
/// existence to unauthenticated callers.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers()).ok_or(AuthError::MissingToken)?;
    let identity = resolve_identity(&token, &state).await?;
    request.extensions_mut().insert(CurrentUser(identity));
    Ok(next.run(request).await)
}

/// Identity verification for optionally-authenticated routes. An absent
/// token passes through anonymously; a presented-but-invalid token is still
/// rejected rather than downgraded.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(token) = extract_token(request.headers()) {
        let identity = resolve_identity(&token, &state).await?;
        request.extensions_mut().insert(CurrentUser(identity));
    }
    Ok(next.run(request).await)
}

async fn resolve_identity(token: &str, state: &AppState) -> Result<Identity, ApiError> {
    let claims = auth::decode_access_token(token, &state.auth.jwt_secret)?;
    // A decodable token whose account no longer exists is an invalid
    // credential, not a missing resource.
    let identity = state
        .store
        .find_identity(claims.sub)
        .await?
        .ok_or(AuthError::InvalidToken)?;
    Ok(identity)
}

/// Raw credential extraction: the `access_token` cookie wins over an
/// `Authorization: Bearer` header.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = token_from_cookie(headers) {
        return Some(token);
    }
    token_from_bearer(headers)
}

fn token_from_cookie(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name == ACCESS_TOKEN_COOKIE && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

fn token_from_bearer(headers: &HeaderMap) -> Option<String> {
    let auth = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn bearer_header_is_extracted() {
        let h = headers(&[("authorization", "Bearer abc.def.ghi")]);
        assert_eq!(extract_token(&h).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn cookie_takes_precedence_over_header() {
        let h = headers(&[
            ("cookie", "theme=dark; access_token=cookie-token"),
            ("authorization", "Bearer header-token"),
        ]);
        assert_eq!(extract_token(&h).as_deref(), Some("cookie-token"));
    }

    #[test]
    fn missing_credential_yields_none() {
        assert_eq!(extract_token(&HeaderMap::new()), None);
        let h = headers(&[("authorization", "Bearer ")]);
        assert_eq!(extract_token(&h), None);
        let h = headers(&[("authorization", "Basic dXNlcg==")]);
        assert_eq!(extract_token(&h), None);
    }
}
