use axum::{
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::{
    handlers::{auth as auth_handlers, introspect},
    openapi::ApiDoc,
    state::AppState,
};

pub fn app_router(state: Arc<AppState>) -> Router {
    let auth = Router::new()
        .route("/refresh-token", get(auth_handlers::refresh_token))
        .route("/access-token", get(auth_handlers::access_token))
        .route("/check-access-token", get(auth_handlers::check_access_token))
        .route("/introspect", post(introspect::introspect))
        .route("/me", get(auth_handlers::me));

    Router::new()
        .nest("/auth", auth)
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .with_state(state)
}
