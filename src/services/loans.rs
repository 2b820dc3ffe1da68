//! Loan management service
//!
//! Thin orchestration over the loans repository, which owns the atomic
//! borrow/return transactions. The lending rules themselves live in
//! [`crate::models::loan::policy`].

use crate::{
    error::AppResult,
    models::loan::{Loan, LoanDetails},
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
}

impl LoansService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Borrow a book for a reader
    pub async fn borrow(&self, reader_id: i32, book_id: i32) -> AppResult<Loan> {
        self.repository.loans.borrow(reader_id, book_id).await
    }

    /// Return a borrowed book
    pub async fn return_book(&self, reader_id: i32, book_id: i32) -> AppResult<Loan> {
        self.repository.loans.return_book(reader_id, book_id).await
    }

    /// Get open loans for a reader
    pub async fn get_reader_loans(&self, reader_id: i32) -> AppResult<Vec<LoanDetails>> {
        // Verify reader exists
        self.repository.readers.get_by_id(reader_id).await?;
        self.repository.loans.get_open_loans_for_reader(reader_id).await
    }
}
