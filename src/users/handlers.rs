use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{LoginRequest, PublicUser, RegisterRequest, TokenResponse},
    error::UserError,
};
use crate::{
    auth::{require_auth, AuthUser},
    state::AppState,
};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user))
        .route_layer(from_fn_with_state(state, require_auth))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, UserError> {
    payload.map(|Json(body)| body).map_err(|e| {
        warn!(error = %e, "invalid JSON");
        UserError::InvalidInput("invalid JSON".into())
    })
}

#[utoipa::path(
    post,
    path = "/register",
    tag = "users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = PublicUser),
        (status = 400, description = "Malformed body or invalid field"),
        (status = 500, description = "Country lookup or storage failed"),
    )
)]
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PublicUser>), UserError> {
    let input = json_body(payload)?.validate().map_err(|msg| {
        warn!(reason = %msg, "validation failed");
        UserError::InvalidInput(msg)
    })?;

    let user = state.users.register(input).await?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed bearer token", body = TokenResponse),
        (status = 400, description = "Malformed body or invalid field"),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, UserError> {
    let creds = json_body(payload)?.validate().map_err(|msg| {
        warn!(reason = %msg, "validation failed");
        UserError::InvalidInput(msg)
    })?;

    let token = state.users.login(&creds.email, &creds.password).await?;
    Ok(Json(TokenResponse { token }))
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users", body = [PublicUser]),
        (status = 401, description = "Missing or invalid token"),
    )
)]
#[instrument(skip(state, caller), fields(requested_by = %caller.email))]
pub async fn list_users(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<Vec<PublicUser>>, UserError> {
    let users = state.users.list().await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The user", body = PublicUser),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "No such user"),
    )
)]
#[instrument(skip(state, caller), fields(requested_by = %caller.email))]
pub async fn get_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, UserError> {
    // an id that is not a UUID cannot exist
    let Ok(id) = Uuid::parse_str(&id) else {
        info!(%id, "user not found");
        return Ok((StatusCode::NOT_FOUND, "user not found").into_response());
    };

    match state.users.get_by_id(id).await? {
        Some(user) => Ok(Json(PublicUser::from(user)).into_response()),
        None => {
            info!(%id, "user not found");
            Ok((StatusCode::NOT_FOUND, "user not found").into_response())
        }
    }
}
