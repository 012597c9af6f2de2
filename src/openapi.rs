use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::{
    dto::auth::{
        AccessTokenResponse, IntrospectRequest, IntrospectResponse, MeResponse,
        RefreshTokenResponse,
    },
    handlers,
    models::jwt::{Claims, Scope},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::refresh_token,
        handlers::auth::access_token,
        handlers::auth::check_access_token,
        handlers::auth::me,
        handlers::introspect::introspect,
    ),
    components(schemas(
        RefreshTokenResponse,
        AccessTokenResponse,
        IntrospectRequest,
        IntrospectResponse,
        MeResponse,
        Claims,
        Scope,
    )),
    modifiers(&BearerAuth),
    tags((name = "auth", description = "Passwordless e-mail login"))
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
