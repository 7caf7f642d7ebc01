//! ClubHub Core - Shared error handling and logging infrastructure
//!
//! This crate defines the error types and logging setup used by the rest of
//! the clubhub workspace.

pub mod error;
pub mod logging;

pub use error::*;
pub use logging::*;
