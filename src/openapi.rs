//! OpenAPI documentation for the relay API at `/api/v1/*`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api;

/// Bearer security scheme covering both credential shapes.
struct BearerSecurityAddon;

impl Modify for BearerSecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "bearer_auth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("API key or session token")
                        .description(Some(
                            "Bearer authentication. Accepts either an API key (`ms_...`) or a \
                            session token from `/auth/login`:\n\n\
                            ```\nAuthorization: Bearer YOUR_KEY_OR_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    servers(
        (url = "/api/v1", description = "Mailship relay API")
    ),
    modifiers(&BearerSecurityAddon),
    paths(
        api::handlers::auth::signup,
        api::handlers::auth::login,
        api::handlers::auth::reset_password,
        api::handlers::otp::send_otp,
        api::handlers::otp::verify_otp,
        api::handlers::api_keys::create_api_key,
        api::handlers::api_keys::list_api_keys,
        api::handlers::api_keys::revoke_api_key,
        api::handlers::mail_credentials::get_mail_credentials,
        api::handlers::mail_credentials::put_mail_credentials,
        api::handlers::send::send_email,
        api::handlers::health::health,
    ),
    components(
        schemas(
            api::models::accounts::AccountResponse,
            api::models::auth::SignupRequest,
            api::models::auth::SignupResponse,
            api::models::auth::LoginRequest,
            api::models::auth::LoginResponse,
            api::models::auth::ResetPasswordRequest,
            api::models::auth::MessageResponse,
            api::models::otp::OtpSendRequest,
            api::models::otp::OtpSendResponse,
            api::models::otp::OtpVerifyRequest,
            api::models::otp::OtpVerifyResponse,
            api::models::api_keys::ApiKeyCreate,
            api::models::api_keys::ApiKeyResponse,
            api::models::api_keys::ApiKeyInfoResponse,
            api::models::api_keys::RevokeApiKeyQuery,
            api::models::mail_credentials::MailCredentialsUpdate,
            api::models::mail_credentials::MailCredentialsResponse,
            api::models::send::AttachmentPayload,
            api::models::send::SendEmailRequest,
            api::models::send::SendEmailResponse,
        )
    ),
    tags(
        (name = "auth", description = "Account signup, login, and password reset"),
        (name = "otp", description = "One-time verification codes"),
        (name = "api-keys", description = "Programmatic API key management"),
        (name = "smtp", description = "Per-account relay credentials"),
        (name = "send", description = "Email relay"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;
