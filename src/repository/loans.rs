//! Loans repository: borrow/return transactions and loan queries
//!
//! Borrow and Return each run as a single transaction. The rows backing the
//! shared counters (`books.copies`, the per-reader open-loan count) are
//! locked with `SELECT ... FOR UPDATE` before any check, so concurrent
//! requests against the same book or reader serialize instead of racing the
//! check-then-act sequence.

use chrono::Utc;
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::BookSummary,
        loan::{policy, Loan, LoanDetails},
    },
};

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Borrow a book: create an open loan and decrement the book's copies.
    ///
    /// Precondition order is fixed: reader exists, book exists, copies
    /// available, borrow limit not reached. First failure wins.
    pub async fn borrow(&self, reader_id: i32, book_id: i32) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        // Lock the reader row so the open-loan count cannot change under us
        let reader_exists: Option<i32> =
            sqlx::query_scalar("SELECT id FROM readers WHERE id = $1 FOR UPDATE")
                .bind(reader_id)
                .fetch_optional(&mut *tx)
                .await?;
        if reader_exists.is_none() {
            return Err(AppError::NotFound(format!(
                "Reader with id {} not found",
                reader_id
            )));
        }

        // Lock the book row so the copies check and decrement are one unit
        let copies: Option<i32> =
            sqlx::query_scalar("SELECT copies FROM books WHERE id = $1 FOR UPDATE")
                .bind(book_id)
                .fetch_optional(&mut *tx)
                .await?;
        let copies = copies.ok_or_else(|| {
            AppError::NotFound(format!("Book with id {} not found", book_id))
        })?;

        policy::check_copies_available(copies)?;

        let open_loans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE reader_id = $1 AND return_date IS NULL",
        )
        .bind(reader_id)
        .fetch_one(&mut *tx)
        .await?;

        policy::check_borrow_limit(open_loans)?;

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (book_id, reader_id, borrow_date)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(book_id)
        .bind(reader_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE books SET copies = copies - 1 WHERE id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Loan {} created: reader {} borrowed book {}",
            loan.id,
            reader_id,
            book_id
        );

        Ok(loan)
    }

    /// Return a book: close the open loan and increment the book's copies.
    ///
    /// If several open loans exist for the same (reader, book) pair the one
    /// with the lowest id is closed, so the selection is deterministic.
    pub async fn return_book(&self, reader_id: i32, book_id: i32) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan_id: Option<i32> = sqlx::query_scalar(
            r#"
            SELECT id FROM loans
            WHERE book_id = $1 AND reader_id = $2 AND return_date IS NULL
            ORDER BY id
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(book_id)
        .bind(reader_id)
        .fetch_optional(&mut *tx)
        .await?;

        let loan_id = loan_id.ok_or_else(|| {
            AppError::NoOpenLoan(format!(
                "No open loan for reader {} and book {}",
                reader_id, book_id
            ))
        })?;

        // An open loan references this book; a missing row here means the
        // store invariants were violated elsewhere.
        let updated = sqlx::query("UPDATE books SET copies = copies + 1 WHERE id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(AppError::Inconsistency(format!(
                "Open loan {} references missing book {}",
                loan_id, book_id
            )));
        }

        let loan = sqlx::query_as::<_, Loan>(
            "UPDATE loans SET return_date = $1 WHERE id = $2 RETURNING *",
        )
        .bind(Utc::now())
        .bind(loan_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Loan {} closed: reader {} returned book {}",
            loan.id,
            reader_id,
            book_id
        );

        Ok(loan)
    }

    /// Get all open loans for a reader, joined with current book data.
    ///
    /// Ordered by borrow date ascending. Loans whose book no longer exists
    /// are skipped by the join rather than failing the whole listing.
    pub async fn get_open_loans_for_reader(&self, reader_id: i32) -> AppResult<Vec<LoanDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT l.id, l.borrow_date,
                   b.id as book_id, b.title, b.author, b.year, b.isbn, b.copies
            FROM loans l
            JOIN books b ON l.book_id = b.id
            WHERE l.reader_id = $1 AND l.return_date IS NULL
            ORDER BY l.borrow_date, l.id
            "#,
        )
        .bind(reader_id)
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            result.push(LoanDetails {
                id: row.get("id"),
                borrow_date: row.get("borrow_date"),
                book: BookSummary {
                    id: row.get("book_id"),
                    title: row.get("title"),
                    author: row.get("author"),
                    year: row.get("year"),
                    isbn: row.get("isbn"),
                    copies: row.get("copies"),
                },
            });
        }

        Ok(result)
    }
}
