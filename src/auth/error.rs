use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(argon2::password_hash::Error),
    #[error("failed to verify password: {0}")]
    Verify(argon2::password_hash::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
    /// Any structural, signature, algorithm or expiry failure.
    #[error("invalid token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
}

/// Rejections produced by the bearer-token middleware.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authorization header missing")]
    MissingHeader,
    #[error("invalid token format")]
    MalformedAuthHeader,
    #[error("invalid token")]
    Unauthenticated,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
    }
}
