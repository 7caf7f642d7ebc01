//! Authentication and Authorization
//!
//! Three small pieces:
//! - `credential`: argon2 password hashing and verification
//! - `principal`: the identity a request acts as
//! - `engine`: the pure decision function guarding every operation

pub mod credential;
pub mod engine;
pub mod principal;

pub use engine::{decide, Action, Decision, DenyReason};
pub use principal::Principal;
