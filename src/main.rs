// src/main.rs
mod auth;
mod config;
mod dto;
mod errors;
mod handlers;
mod messenger;
mod models;
mod openapi;
mod routes;
mod services;
mod state;
mod store;
mod validation;

use crate::{config::Config, routes::app_router, state::AppState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailpass_auth=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Config::from_env()?;
    let state = Arc::new(AppState::new(&cfg).await?);
    if !state.authority.is_available() {
        tracing::error!("token store unavailable, serving errors until restart");
    }

    let bind_addr = state.cfg.bind_addr.clone();
    let app = app_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
