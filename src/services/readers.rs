//! Reader registry service

use crate::{
    error::{AppError, AppResult},
    models::reader::{CreateReader, Reader, UpdateReader},
    repository::Repository,
};

#[derive(Clone)]
pub struct ReadersService {
    repository: Repository,
}

impl ReadersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Get a reader by ID
    pub async fn get_reader(&self, id: i32) -> AppResult<Reader> {
        self.repository.readers.get_by_id(id).await
    }

    /// Create a new reader, enforcing email uniqueness
    pub async fn create_reader(&self, reader: CreateReader) -> AppResult<Reader> {
        if self.repository.readers.email_exists(&reader.email, None).await? {
            return Err(AppError::Duplicate(format!(
                "Reader with email {} already exists",
                reader.email
            )));
        }

        let created = self.repository.readers.create(&reader).await?;
        tracing::info!("Reader {} created: {}", created.id, created.name);
        Ok(created)
    }

    /// Update a reader, enforcing email uniqueness
    pub async fn update_reader(&self, id: i32, reader: UpdateReader) -> AppResult<Reader> {
        if let Some(ref email) = reader.email {
            if self.repository.readers.email_exists(email, Some(id)).await? {
                return Err(AppError::Duplicate(format!(
                    "Reader with email {} already exists",
                    email
                )));
            }
        }

        self.repository.readers.update(id, &reader).await
    }

    /// Delete a reader; refused while open loans exist
    pub async fn delete_reader(&self, id: i32) -> AppResult<()> {
        self.repository.readers.delete(id).await
    }
}
