use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::jwt::Scope;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RefreshTokenQuery {
    /// Address the token or code is mailed to.
    pub mail: String,
    /// Confirmation code received by mail, when replacing a live token.
    pub code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshTokenResponse {
    pub need_confirmation_code: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AccessTokenQuery {
    /// Refresh token hash received by mail.
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccessTokenResponse {
    pub access_token: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CheckAccessTokenQuery {
    pub access_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IntrospectRequest {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IntrospectResponse {
    pub active: bool,
    pub sub: Option<String>,
    pub scope: Option<Scope>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub email: String,
}
