//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, borrows, health, members};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bookclub API",
        version = "0.1.0",
        description = "Book club catalog and lending REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::catalog_events,
        // Lending
        borrows::borrow_book,
        borrows::return_book,
        borrows::my_borrows,
        borrows::active_borrows,
        // Members
        members::update_member_role,
    ),
    components(
        schemas(
            // Auth
            auth::LoginResponse,
            auth::MeResponse,
            crate::models::member::Member,
            crate::models::member::Role,
            crate::models::member::RegisterRequest,
            crate::models::member::LoginRequest,
            crate::models::member::UpdateRole,
            // Books
            crate::models::book::Book,
            crate::models::book::Borrower,
            crate::models::book::CreateBook,
            crate::models::book::BookQuery,
            // Lending
            borrows::LendingResponse,
            crate::models::book::BorrowedBook,
            crate::models::book::ActiveBorrow,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration and authentication"),
        (name = "books", description = "Catalog browsing and live updates"),
        (name = "lending", description = "Borrowing and returning books"),
        (name = "members", description = "Member administration")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
