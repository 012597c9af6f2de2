use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::{
    auth::jwt::AuthSubject,
    dto::auth::{
        AccessTokenQuery, AccessTokenResponse, CheckAccessTokenQuery, MeResponse,
        RefreshTokenQuery, RefreshTokenResponse,
    },
    errors::AppError,
    models::jwt::Claims,
    services::auth_service,
    state::AppState,
};

/// Without `code`: mails a refresh token hash, or a confirmation code when
/// the current token is still valid. With `code`: mails a new hash and
/// answers 204.
#[utoipa::path(
    get,
    path = "/auth/refresh-token",
    params(RefreshTokenQuery),
    responses(
        (status = 200, description = "Hash or code sent by mail", body = RefreshTokenResponse),
        (status = 204, description = "Code accepted, new hash sent by mail"),
        (status = 401, description = "Invalid mail or code"),
        (status = 500, description = "Store unavailable")
    ),
    tag = "auth"
)]
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Query(q): Query<RefreshTokenQuery>,
) -> Result<Response, AppError> {
    match q.code.as_deref() {
        None => {
            let body = auth_service::request_refresh_token(&state, &q.mail).await?;
            Ok(Json(body).into_response())
        }
        Some(code) => {
            auth_service::confirm_refresh_token(&state, &q.mail, code).await?;
            Ok(StatusCode::NO_CONTENT.into_response())
        }
    }
}

#[utoipa::path(
    get,
    path = "/auth/access-token",
    params(AccessTokenQuery),
    responses(
        (status = 200, description = "New access token", body = AccessTokenResponse),
        (status = 401, description = "Invalid, expired or black-listed refresh token")
    ),
    tag = "auth"
)]
pub async fn access_token(
    State(state): State<Arc<AppState>>,
    Query(q): Query<AccessTokenQuery>,
) -> Result<Json<AccessTokenResponse>, AppError> {
    Ok(Json(auth_service::access_token(&state, &q.refresh_token).await?))
}

#[utoipa::path(
    get,
    path = "/auth/check-access-token",
    params(CheckAccessTokenQuery),
    responses(
        (status = 200, description = "Decoded access token", body = Claims),
        (status = 401, description = "Invalid or expired access token")
    ),
    tag = "auth"
)]
pub async fn check_access_token(
    State(state): State<Arc<AppState>>,
    Query(q): Query<CheckAccessTokenQuery>,
) -> Result<Json<Claims>, AppError> {
    Ok(Json(auth_service::check_access_token(&state, &q.access_token)?))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Owner of the bearer token", body = MeResponse),
        (status = 401, description = "Missing or invalid bearer token")
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn me(AuthSubject(email): AuthSubject) -> Json<MeResponse> {
    Json(MeResponse { email })
}
