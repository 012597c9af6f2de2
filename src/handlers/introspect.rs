use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::dto::auth::{IntrospectRequest, IntrospectResponse};
use crate::services::auth_service;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/auth/introspect",
    request_body = IntrospectRequest,
    responses(
        (status = 200, description = "Token introspection result", body = IntrospectResponse)
    ),
    tag = "auth"
)]
pub async fn introspect(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IntrospectRequest>,
) -> Json<IntrospectResponse> {
    Json(auth_service::introspect(&state, &req.token))
}
