//! Book model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Book model from database
///
/// `copies` counts the physical units currently available for lending
/// (not counting those on loan). It is mutated only by borrow/return
/// transactions and by explicit catalog updates, and never drops below 0.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub year: Option<i32>,
    pub isbn: Option<String>,
    pub copies: i32,
}

/// Short book representation embedded in loan listings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookSummary {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub year: Option<i32>,
    pub isbn: Option<String>,
    pub copies: i32,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author must not be empty"))]
    pub author: String,
    pub description: Option<String>,
    pub year: Option<i32>,
    pub isbn: Option<String>,
    /// Number of available copies, defaults to 1
    #[validate(range(min = 0, message = "Copies must not be negative"))]
    pub copies: Option<i32>,
}

/// Update book request; only provided fields are changed
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Author must not be empty"))]
    pub author: Option<String>,
    pub description: Option<String>,
    pub year: Option<i32>,
    pub isbn: Option<String>,
    #[validate(range(min = 0, message = "Copies must not be negative"))]
    pub copies: Option<i32>,
}
