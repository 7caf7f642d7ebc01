//! Domain records
//!
//! Plain structs referencing each other by id. Resolution always goes
//! through the directory's lookup interface.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// A registered account. Carries the password hash, so it is never
/// serialized directly; the web layer converts to a public shape first.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub birthdate: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// A category owning zero or more groups
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A group of members, belonging to exactly one category
#[derive(Debug, Clone, Serialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A club member, optionally linked to a user account
#[derive(Debug, Clone, Serialize)]
pub struct Member {
    pub id: i64,
    pub name: String,
    pub department: Option<String>,
    pub blog_url: Option<String>,
    pub group_id: i64,
    pub user_id: Option<i64>,
}

impl Member {
    /// Whether this member is the account link for the given user id
    pub fn is_linked_to(&self, user_id: i64) -> bool {
        self.user_id == Some(user_id)
    }
}
