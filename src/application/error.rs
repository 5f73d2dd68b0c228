use thiserror::Error;

use crate::domain::UserId;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Username already exists: {0}")]
    DuplicateUsername(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("No savings record for user {0}")]
    SavingsNotFound(UserId),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    /// True for the "referenced row does not exist" family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::UserNotFound(_) | AppError::SavingsNotFound(_))
    }
}
