use std::{sync::Arc, time::Duration};

use mongodb::{bson::doc, options::ClientOptions, Client};

use crate::{
    auth::authority::{AuthoritySettings, TokenAuthority},
    config::{Config, Storage},
    errors::AppError,
    messenger::{LogMessenger, Messenger, SmtpMessenger},
    store::{StoreStatus, TokenCollections},
};

#[derive(Clone)]
pub struct AppState {
    pub authority: Arc<TokenAuthority>,
    pub messenger: Arc<dyn Messenger>,
    pub cfg: Arc<Config>,
}

impl AppState {
    pub async fn new(cfg: &Config) -> Result<Self, AppError> {
        let store = match &cfg.storage {
            Storage::Mongo { uri, db_name } => connect_mongo(uri, db_name).await?,
            Storage::Memory => StoreStatus::Connected(TokenCollections::in_memory()),
        };

        let messenger: Arc<dyn Messenger> = match &cfg.smtp {
            Some(smtp) => Arc::new(SmtpMessenger::new(smtp)?),
            None => {
                tracing::warn!("SMTP_HOST not set, letters go to the log");
                Arc::new(LogMessenger)
            }
        };

        Ok(Self::with_parts(cfg, store, messenger).await)
    }

    pub async fn with_parts(cfg: &Config, store: StoreStatus, messenger: Arc<dyn Messenger>) -> Self {
        let authority = TokenAuthority::new(store, AuthoritySettings::from(cfg)).await;
        Self {
            authority: Arc::new(authority),
            messenger,
            cfg: Arc::new(cfg.clone()),
        }
    }
}

/// A malformed URI is a configuration error; an unreachable server only
/// degrades the service.
async fn connect_mongo(uri: &str, db_name: &str) -> Result<StoreStatus, AppError> {
    let mut opts = ClientOptions::parse(uri)
        .await
        .map_err(|e| AppError::Internal(format!("MONGODB_URI: {e}")))?;
    opts.app_name = Some("mailpass-auth".to_string());
    opts.server_selection_timeout = Some(Duration::from_secs(5));

    let client =
        Client::with_options(opts).map_err(|e| AppError::Internal(format!("mongodb client: {e}")))?;
    let db = client.database(db_name);

    if let Err(e) = db.run_command(doc! { "ping": 1 }).await {
        tracing::error!(error = %e, "mongodb unreachable");
        return Ok(StoreStatus::Unavailable);
    }

    match TokenCollections::open_mongo(&db).await {
        Ok(collections) => Ok(StoreStatus::Connected(collections)),
        Err(e) => {
            tracing::error!(error = %e, "failed to open collections");
            Ok(StoreStatus::Unavailable)
        }
    }
}
