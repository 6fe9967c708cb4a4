use utoipa::OpenApi;
use crate::domains::auth::models::*;

// OpenAPI 스키마 정의: Swagger 문서 자동 생성
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::domains::auth::handlers::auth_handler::login,
        crate::domains::auth::handlers::auth_handler::refresh,
        crate::domains::auth::handlers::auth_handler::logout,
        crate::domains::auth::handlers::auth_handler::logout_all,
        crate::domains::auth::handlers::auth_handler::get_me,
        crate::domains::auth::handlers::session_handler::list_sessions,
        crate::domains::auth::handlers::session_handler::close_session,
        crate::routes::health
    ),
    components(schemas(
        LoginRequest,
        LoginResponse,
        RefreshTokenRequest,
        RefreshTokenResponse,
        LogoutRequest,
        LogoutAllResponse,
        SessionResponse,
        SessionsResponse,
        UserResponse
    )),
    modifiers(
        &SecurityAddon
    ),
    tags(
        (name = "Auth", description = "Login, token refresh and logout"),
        (name = "Sessions", description = "Per-device session management"),
        (name = "Health", description = "Liveness probe")
    ),
    info(
        title = "Snippet Auth API",
        description = "Authentication and session API for the snippet service",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;

// Security scheme 정의: Swagger UI에서 "Authorize" 버튼 추가
pub struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "BearerAuth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
