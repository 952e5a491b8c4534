use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::{error::AuthError, jwt::JwtKeys};
use crate::state::AppState;

/// Identity verified by [`require_auth`] for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub email: String,
}

/// Route layer for the protected group: verifies the bearer token and
/// stores the caller's [`AuthUser`] in the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            warn!("authorization header missing");
            AuthError::MissingHeader
        })?;

    let token = value.strip_prefix("Bearer ").ok_or_else(|| {
        warn!("authorization header without Bearer prefix");
        AuthError::MalformedAuthHeader
    })?;

    let keys = JwtKeys::from_ref(&state);
    let email = keys.verify(token).map_err(|e| {
        let reason = std::error::Error::source(&e)
            .map(ToString::to_string)
            .unwrap_or_else(|| e.to_string());
        warn!(%reason, "invalid token");
        AuthError::Unauthenticated
    })?;

    debug!(%email, "token verified");
    req.extensions_mut().insert(AuthUser { email });
    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt;
    use axum::{
        body::{to_bytes, Body},
        http::{Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn whoami(user: AuthUser) -> String {
        user.email
    }

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .route_layer(from_fn_with_state(state.clone(), require_auth))
            .with_state(state)
    }

    async fn call(state: AppState, auth: Option<&str>) -> (StatusCode, String) {
        let mut req = HttpRequest::builder().uri("/whoami");
        if let Some(value) = auth {
            req = req.header(header::AUTHORIZATION, value);
        }
        let res = app(state)
            .oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn valid_token_injects_identity() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state).sign("bob@example.com").unwrap();
        let (status, body) = call(state, Some(&format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "bob@example.com");
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let (status, body) = call(AppState::fake(), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, "authorization header missing");
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_unauthorized() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state).sign("bob@example.com").unwrap();
        let (status, body) = call(state, Some(&format!("Token {token}"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, "invalid token format");
    }

    #[tokio::test]
    async fn bad_token_reason_is_not_echoed() {
        let token = jwt::issue("bob@example.com", "some-other-secret", "1h").unwrap();
        let (status, body) = call(AppState::fake(), Some(&format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, "invalid token");
    }

    #[tokio::test]
    async fn extractor_without_middleware_rejects() {
        let state = AppState::fake();
        let router = Router::new().route("/whoami", get(whoami)).with_state(state);
        let res = router
            .oneshot(HttpRequest::builder().uri("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
