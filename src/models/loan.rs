//! Loan (borrowed-book) model and the lending policy

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::book::BookSummary;

/// Loan model from database
///
/// A loan is open while `return_date` is null. Loans are created by a
/// borrow, closed exactly once by a return, and never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub book_id: i32,
    pub reader_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
}

/// Open loan joined with current book data, for reader loan listings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub borrow_date: DateTime<Utc>,
    pub book: BookSummary,
}

/// Borrow / return request payload
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoanRequest {
    pub reader_id: i32,
    pub book_id: i32,
}

/// Lending policy checks.
///
/// These are the pure business rules applied inside the borrow transaction,
/// after the relevant rows have been locked. Keeping them free of any
/// database access makes the rules testable on their own.
pub mod policy {
    use crate::error::{AppError, AppResult};

    /// Maximum number of concurrently open loans per reader, system-wide
    pub const MAX_OPEN_LOANS: i64 = 3;

    /// A book can be lent only while it has at least one available copy
    pub fn check_copies_available(copies: i32) -> AppResult<()> {
        if copies > 0 {
            Ok(())
        } else {
            Err(AppError::NoCopiesAvailable)
        }
    }

    /// A reader may hold at most [`MAX_OPEN_LOANS`] open loans
    pub fn check_borrow_limit(open_loans: i64) -> AppResult<()> {
        if open_loans < MAX_OPEN_LOANS {
            Ok(())
        } else {
            Err(AppError::BorrowLimitExceeded)
        }
    }
}
