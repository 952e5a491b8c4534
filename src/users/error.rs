use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use super::repo::RepoError;
use crate::{
    auth::error::{PasswordError, TokenError},
    geoip::GeoIpError,
};

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("failed to enrich user with country")]
    EnrichmentFailed(#[source] GeoIpError),
    #[error("failed to save user")]
    PersistenceFailed(#[source] RepoError),
    #[error("failed to issue token")]
    TokenIssuanceFailed(#[source] TokenError),
    #[error("password hashing failed")]
    Hashing(#[source] PasswordError),
    #[error("failed to read users")]
    Repository(#[source] RepoError),
}

impl UserError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::EnrichmentFailed(_)
            | Self::PersistenceFailed(_)
            | Self::TokenIssuanceFailed(_)
            | Self::Hashing(_)
            | Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Full error chain, for logs only.
fn chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %chain(&self), "request failed");
        }
        // top-level message only; causes stay in the logs
        (status, self.to_string()).into_response()
    }
}
