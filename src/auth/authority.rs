//! Refresh/access token lifecycle for the e-mail login flow.
//!
//! A subject owns at most one outstanding refresh token. Asking for a new one
//! while the current one still verifies yields a confirmation code instead;
//! the replacement is issued only once that code comes back. Replaced tokens
//! move to the black list, which is trimmed once per construction.
//!
//! Access tokens are never stored: they are minted from a valid refresh hash
//! and verified by signature alone.

use chrono::{Duration, Utc};
use mongodb::bson::DateTime as BsonDateTime;

use crate::{
    auth::{
        jwt::{CodecError, TokenCodec},
        locks::SubjectLocks,
        tokens::refresh_token_hash,
    },
    config::Config,
    errors::AppError,
    models::{
        confirmation_code::{ConfirmationCode, ConfirmationCodeDoc},
        jwt::{Claims, Scope},
        refresh_token::RefreshTokenDoc,
    },
    store::{Filter, StoreError, StoreStatus, TokenCollections},
    validation::normalize_mail,
};

#[derive(Debug, Clone)]
pub struct AuthoritySettings {
    pub refresh_ttl: Duration,
    pub access_ttl: Duration,
    pub black_list_retention_days: i64,
}

impl From<&Config> for AuthoritySettings {
    fn from(cfg: &Config) -> Self {
        Self {
            refresh_ttl: Duration::try_seconds(cfg.jwt_refresh_ttl_seconds).unwrap_or(Duration::MAX),
            access_ttl: Duration::try_seconds(cfg.jwt_access_ttl_seconds).unwrap_or(Duration::MAX),
            black_list_retention_days: cfg.black_list_retention_days,
        }
    }
}

/// Result of asking for a refresh token. The caller delivers whichever
/// secret it carries to the subject's mailbox.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Issued { token_hash: String },
    ConfirmationRequired { code: ConfirmationCode },
}

impl RefreshOutcome {
    pub fn needs_confirmation(&self) -> bool {
        matches!(self, RefreshOutcome::ConfirmationRequired { .. })
    }
}

pub struct TokenAuthority {
    store: StoreStatus,
    codec: TokenCodec,
    settings: AuthoritySettings,
    locks: SubjectLocks,
}

impl TokenAuthority {
    /// Builds the authority with a fresh signing secret, so every credential
    /// issued by a previous instance stops verifying. Old black-list entries
    /// are purged before the first request is served.
    pub async fn new(store: StoreStatus, settings: AuthoritySettings) -> Self {
        let store = match store {
            StoreStatus::Connected(c) => {
                match purge_black_list(&c, settings.black_list_retention_days).await {
                    Ok(purged) => {
                        tracing::info!(purged, "black list purged");
                        StoreStatus::Connected(c)
                    }
                    Err(StoreError::Unavailable(e)) => {
                        tracing::error!(error = %e, "store unreachable, serving in degraded mode");
                        StoreStatus::Unavailable
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "black list purge failed");
                        StoreStatus::Connected(c)
                    }
                }
            }
            StoreStatus::Unavailable => {
                tracing::error!("store unreachable, serving in degraded mode");
                StoreStatus::Unavailable
            }
        };

        Self {
            store,
            codec: TokenCodec::with_random_secret(),
            settings,
            locks: SubjectLocks::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.store, StoreStatus::Connected(_))
    }

    fn collections(&self) -> Result<&TokenCollections, AppError> {
        match &self.store {
            StoreStatus::Connected(c) => Ok(c),
            StoreStatus::Unavailable => Err(AppError::StoreUnavailable),
        }
    }

    /// Issues a refresh token right away unless the subject still holds a
    /// valid one, in which case a confirmation code is issued instead.
    #[tracing::instrument(skip(self))]
    pub async fn request_refresh(&self, subject: &str) -> Result<RefreshOutcome, AppError> {
        let subject = normalize_mail(subject);
        let _guard = self.locks.lock(&subject).await;

        if self.check_refresh_for(&subject).await? {
            let code = self.replace_code(&subject).await?;
            Ok(RefreshOutcome::ConfirmationRequired { code })
        } else {
            let token_hash = self.replace_refresh(&subject).await?;
            Ok(RefreshOutcome::Issued { token_hash })
        }
    }

    /// Redeems a confirmation code for a new refresh token and returns its
    /// hash. A wrong code is burnt: the subject has to request a new one.
    #[tracing::instrument(skip(self, code))]
    pub async fn confirm_and_refresh(&self, subject: &str, code: &str) -> Result<String, AppError> {
        let subject = normalize_mail(subject);
        let _guard = self.locks.lock(&subject).await;
        let c = self.collections()?;

        let stored = c
            .confirmation_codes
            .find_one(Filter::Email(&subject))
            .await?
            .ok_or(AppError::NoCodeForSubject)?;

        if !stored.code.matches(code) {
            c.confirmation_codes.delete_all(Filter::Email(&subject)).await?;
            tracing::info!("confirmation code mismatch, code reset");
            return Err(AppError::InvalidCode);
        }

        self.replace_refresh(&subject).await
    }

    /// Whether the subject's outstanding refresh token would be accepted.
    /// Only store failures are errors; a rejected token is just `false`.
    pub async fn has_valid_refresh_for(&self, subject: &str) -> Result<bool, AppError> {
        self.check_refresh_for(&normalize_mail(subject)).await
    }

    /// Replaces any pending code of the subject with a new one.
    pub async fn new_confirmation_code_for(
        &self,
        subject: &str,
    ) -> Result<ConfirmationCode, AppError> {
        let subject = normalize_mail(subject);
        let _guard = self.locks.lock(&subject).await;
        self.replace_code(&subject).await
    }

    /// Unconditionally supersedes the subject's refresh token.
    pub async fn new_refresh_hash_for(&self, subject: &str) -> Result<String, AppError> {
        let subject = normalize_mail(subject);
        let _guard = self.locks.lock(&subject).await;
        self.replace_refresh(&subject).await
    }

    /// Resolves a client-held refresh hash to its subject.
    pub async fn verify_refresh_hash(&self, hash: &str) -> Result<String, AppError> {
        let c = self.collections()?;

        if c.black_list.find_one(Filter::TokenHash(hash)).await?.is_some() {
            return Err(AppError::Blacklisted);
        }

        let record = c
            .refresh_tokens
            .find_one(Filter::TokenHash(hash))
            .await?
            .ok_or(AppError::InvalidRefresh)?;

        match self.codec.verify(&record.token, Scope::RefreshToken) {
            Ok(_) => Ok(record.email),
            Err(CodecError::Expired) => Err(AppError::RefreshExpired),
            Err(_) => Err(AppError::InvalidRefresh),
        }
    }

    /// Mints an access token for the owner of a valid refresh hash. Nothing
    /// is written.
    pub async fn refresh_access_from_hash(&self, hash: &str) -> Result<String, AppError> {
        let subject = self.verify_refresh_hash(hash).await?;
        self.codec
            .issue(&subject, Scope::AccessToken, self.settings.access_ttl)
            .map_err(|e| AppError::Internal(e.to_string()))
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Claims, AppError> {
        self.codec
            .verify(token, Scope::AccessToken)
            .map_err(|e| match e {
                CodecError::Expired => AppError::AccessExpired,
                CodecError::WrongScope(_) => AppError::WrongScope,
                CodecError::Malformed | CodecError::Encoding(_) => AppError::InvalidAccess,
            })
    }

    pub fn subject_from_access_token(&self, token: &str) -> Result<String, AppError> {
        self.verify_access_token(token).map(|claims| claims.sub)
    }

    async fn check_refresh_for(&self, subject: &str) -> Result<bool, AppError> {
        let c = self.collections()?;
        let Some(record) = c.refresh_tokens.find_one(Filter::Email(subject)).await? else {
            return Ok(false);
        };

        match self.verify_refresh_hash(&record.token_hash).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_store_failure() => Err(e),
            Err(e) => {
                tracing::debug!(reason = %e, "outstanding refresh token rejected");
                Ok(false)
            }
        }
    }

    async fn replace_code(&self, subject: &str) -> Result<ConfirmationCode, AppError> {
        let c = self.collections()?;
        c.confirmation_codes.delete_all(Filter::Email(subject)).await?;

        let code = ConfirmationCode::generate();
        c.confirmation_codes
            .insert(ConfirmationCodeDoc::new(subject, code))
            .await?;
        tracing::debug!("confirmation code issued");
        Ok(code)
    }

    async fn replace_refresh(&self, subject: &str) -> Result<String, AppError> {
        let c = self.collections()?;

        self.supersede(c, subject).await?;
        c.confirmation_codes.delete_all(Filter::Email(subject)).await?;

        let token = self
            .codec
            .issue(subject, Scope::RefreshToken, self.settings.refresh_ttl)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let token_hash = refresh_token_hash(&token);

        c.refresh_tokens
            .insert(RefreshTokenDoc::new(subject, token, token_hash.clone()))
            .await?;
        tracing::info!("refresh token issued");
        Ok(token_hash)
    }

    /// Moves every outstanding refresh token of `subject` to the black list.
    /// More than one only exists after a race between processes.
    async fn supersede(&self, c: &TokenCollections, subject: &str) -> Result<u64, AppError> {
        let mut retired = 0;
        while let Some(current) = c.refresh_tokens.find_one(Filter::Email(subject)).await? {
            match c
                .refresh_tokens
                .delete_one(Filter::TokenHash(&current.token_hash))
                .await
            {
                Ok(()) => {}
                // someone else retired it between the read and the delete
                Err(StoreError::NotFound) => continue,
                Err(e) => return Err(e.into()),
            }
            c.black_list.insert(current.retired()).await?;
            retired += 1;
        }

        if retired > 0 {
            tracing::info!(retired, "refresh token superseded");
        }
        Ok(retired)
    }
}

async fn purge_black_list(c: &TokenCollections, retention_days: i64) -> Result<u64, StoreError> {
    // nothing can be older than the earliest representable instant
    let Some(cutoff) = Duration::try_days(retention_days)
        .and_then(|retention| Utc::now().checked_sub_signed(retention))
    else {
        return Ok(0);
    };
    c.black_list
        .delete_all(Filter::RecordedBefore(BsonDateTime::from_millis(
            cutoff.timestamp_millis(),
        )))
        .await
}
