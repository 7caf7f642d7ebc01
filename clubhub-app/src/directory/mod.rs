//! Identity Directory
//!
//! Sqlite-backed storage for the club's records: user accounts, categories,
//! groups, and members. All lookups and mutations go through [`Directory`];
//! the rest of the crate never issues SQL of its own.

pub mod models;
pub mod store;

pub use models::{Category, Group, Member, User};
pub use store::{CategoryGroupCount, Directory, DirectoryStats, GroupSummary, NewMember, NewUser};
