//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, health, loans, readers};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Biblios API",
        version = "0.1.0",
        description = "Library Catalog & Lending REST API",
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
        books::update_book,
        books::delete_book,
        // Readers
        readers::get_reader,
        readers::create_reader,
        readers::update_reader,
        readers::delete_reader,
        readers::get_reader_loans,
        // Loans
        loans::borrow,
        loans::return_book,
    ),
    components(
        schemas(
            // Health
            health::HealthResponse,
            // Auth
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::TokenResponse,
            auth::MeResponse,
            // Books
            crate::models::book::Book,
            crate::models::book::BookSummary,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Readers
            crate::models::reader::Reader,
            crate::models::reader::CreateReader,
            crate::models::reader::UpdateReader,
            // Loans
            crate::models::loan::Loan,
            crate::models::loan::LoanDetails,
            crate::models::loan::LoanRequest,
            loans::BorrowResponse,
            loans::ReturnResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "auth", description = "User registration and login"),
        (name = "books", description = "Book catalog"),
        (name = "readers", description = "Reader registry"),
        (name = "loans", description = "Borrow and return transactions"),
    )
)]
pub struct ApiDoc;

/// Create the Swagger UI router serving the OpenAPI document
pub fn create_openapi_router() -> Router {
    Router::new().merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
