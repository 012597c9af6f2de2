use crate::{
    auth::authority::RefreshOutcome,
    dto::auth::{AccessTokenResponse, IntrospectResponse, RefreshTokenResponse},
    errors::AppError,
    models::jwt::Claims,
    state::AppState,
    validation::validate_mail,
};

/// First step of the login flow: the refresh hash, or a confirmation code
/// when a valid token is still outstanding, goes to the mailbox.
pub async fn request_refresh_token(
    state: &AppState,
    mail: &str,
) -> Result<RefreshTokenResponse, AppError> {
    let mail = validate_mail(mail)?;

    let outcome = state.authority.request_refresh(&mail).await?;
    let need_confirmation_code = outcome.needs_confirmation();

    match outcome {
        RefreshOutcome::Issued { token_hash } => {
            state.messenger.send_refresh_hash(&mail, &token_hash).await?
        }
        RefreshOutcome::ConfirmationRequired { code } => {
            state.messenger.send_confirmation_code(&mail, code).await?
        }
    }

    Ok(RefreshTokenResponse {
        need_confirmation_code,
    })
}

/// Second step: trade the mailed code for a new refresh hash, delivered by
/// mail as well.
pub async fn confirm_refresh_token(state: &AppState, mail: &str, code: &str) -> Result<(), AppError> {
    let mail = validate_mail(mail)?;

    let token_hash = state.authority.confirm_and_refresh(&mail, code).await?;
    state.messenger.send_refresh_hash(&mail, &token_hash).await
}

pub async fn access_token(state: &AppState, refresh_hash: &str) -> Result<AccessTokenResponse, AppError> {
    let access_token = state
        .authority
        .refresh_access_from_hash(refresh_hash.trim())
        .await?;
    Ok(AccessTokenResponse { access_token })
}

pub fn check_access_token(state: &AppState, access_token: &str) -> Result<Claims, AppError> {
    let claims = state.authority.verify_access_token(access_token.trim())?;
    tracing::debug!(
        issued_at = ?claims.issued_at(),
        expires_at = ?claims.expires_at(),
        "access token checked"
    );
    Ok(claims)
}

/// Never fails on a bad token; it is reported as inactive.
pub fn introspect(state: &AppState, token: &str) -> IntrospectResponse {
    match state.authority.verify_access_token(token.trim()) {
        Ok(claims) => IntrospectResponse {
            active: true,
            sub: Some(claims.sub),
            scope: Some(claims.scope),
        },
        Err(e) => {
            tracing::debug!(reason = %e, "inactive token introspected");
            IntrospectResponse {
                active: false,
                sub: None,
                scope: None,
            }
        }
    }
}
