use utoipa::OpenApi;

/// OpenAPI documentation for the authority's public surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Signet Authority API",
        description = "Authentication strategies, scoped grants and token issuance"
    ),
    paths(
        crate::api::tokens::authorize,
        crate::api::tokens::token,
        crate::api::tokens::introspect,
        crate::api::session::login,
        crate::api::session::request_link,
        crate::api::health::health,
    ),
    tags(
        (name = "Tokens", description = "Authorization codes and token exchange"),
        (name = "Session", description = "Login and session establishment"),
        (name = "Health", description = "Service health")
    )
)]
pub struct ApiDoc;
