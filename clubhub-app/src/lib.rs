//! ClubHub application layer
//!
//! This crate holds everything between the HTTP surface and sqlite:
//!
//! - The identity directory: users, categories, groups, and members
//! - The credential store (argon2 password hashing)
//! - The session principal and the pure authorization engine
//! - The guarded operations route handlers call
//!
//! ## Architecture
//!
//! Handlers never touch the directory themselves. They resolve a
//! [`Principal`] and hand it to a [`ClubService`] operation, which looks up
//! the targets, applies the not-found policy, asks the engine for a
//! decision, and only then mutates.

pub mod auth;
pub mod directory;
pub mod service;

pub use auth::{decide, Action, Decision, DenyReason, Principal};
pub use directory::{Category, Directory, Group, Member, User};
pub use service::ClubService;

/// Application-level error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Core error: {0}")]
    Core(#[from] clubhub_core::CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Access denied: {0}")]
    Denied(DenyReason),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a not found error for a missing record
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a validation error with a user-facing reason
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
