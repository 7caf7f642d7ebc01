//! Sqlite-backed directory store

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use clubhub_core::{storage_error, CoreError, CoreResult, ErrorContext};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use super::models::{Category, Group, Member, User};
use crate::auth::credential;
use crate::{AppError, AppResult};

const DEFAULT_ADMIN_NAME: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
const DEFAULT_ADMIN_EMAIL: &str = "admin@club.com";
const DEFAULT_ADMIN_BIRTHDATE: &str = "1990-01-01";

const DEFAULT_CATEGORIES: [&str; 2] = ["Beginner", "Challenger"];

const BIRTHDATE_FORMAT: &str = "%Y-%m-%d";

/// New account row, hash already computed by the caller
#[derive(Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub birthdate: NaiveDate,
}

/// New member row
#[derive(Debug)]
pub struct NewMember {
    pub name: String,
    pub department: Option<String>,
    pub blog_url: Option<String>,
    pub group_id: i64,
    pub user_id: Option<i64>,
}

/// Group together with its category name and member count
#[derive(Debug, Clone)]
pub struct GroupSummary {
    pub group: Group,
    pub category_name: String,
    pub member_count: i64,
}

/// Record counts across the directory
#[derive(Debug, Clone, Copy)]
pub struct DirectoryStats {
    pub total_users: i64,
    pub total_groups: i64,
    pub total_members: i64,
}

/// Category with the number of groups it owns
#[derive(Debug, Clone)]
pub struct CategoryGroupCount {
    pub category: Category,
    pub group_count: i64,
}

/// The identity directory: a shared sqlite pool plus the queries over it
#[derive(Debug, Clone)]
pub struct Directory {
    pool: SqlitePool,
}

impl Directory {
    /// Open (and create if missing) the database at the given url
    pub async fn connect(database_url: &str) -> CoreResult<Self> {
        let path = database_url
            .trim_start_matches("sqlite://")
            .trim_start_matches("sqlite:");
        if path != ":memory:" {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                storage_error!(
                    format!("invalid database url: {database_url}"),
                    "directory",
                    e
                )
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| storage_error!("failed to open sqlite database", "directory", e))?;

        info!(url = database_url, "Connected to identity directory");
        Ok(Self { pool })
    }

    /// In-memory directory. Single connection so every handle sees the same
    /// database.
    pub async fn in_memory() -> CoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| storage_error!("failed to open in-memory database", "directory", e))?;
        Ok(Self { pool })
    }

    /// Create database tables
    pub async fn create_tables(&self) -> AppResult<()> {
        let query = r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                is_admin BOOLEAN NOT NULL DEFAULT FALSE,
                birthdate TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_users_name ON users(name);
            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);

            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL
            );

            CREATE TABLE IF NOT EXISTS groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL,
                category_id INTEGER NOT NULL REFERENCES categories(id),
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_groups_category ON groups(category_id);

            CREATE TABLE IF NOT EXISTS members (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                department TEXT,
                blog_url TEXT,
                group_id INTEGER NOT NULL REFERENCES groups(id),
                user_id INTEGER REFERENCES users(id)
            );

            CREATE INDEX IF NOT EXISTS idx_members_group ON members(group_id);
            CREATE INDEX IF NOT EXISTS idx_members_user ON members(user_id);
        "#;

        sqlx::query(query).execute(&self.pool).await?;
        info!("Directory tables created");
        Ok(())
    }

    /// Seed default categories and the default admin account if absent
    pub async fn seed_defaults(&self) -> AppResult<()> {
        for name in DEFAULT_CATEGORIES {
            sqlx::query("INSERT OR IGNORE INTO categories (name) VALUES (?)")
                .bind(name)
                .execute(&self.pool)
                .await?;
        }
        self.ensure_default_admin().await
    }

    async fn ensure_default_admin(&self) -> AppResult<()> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM users WHERE name = ?")
            .bind(DEFAULT_ADMIN_NAME)
            .fetch_one(&self.pool)
            .await?;

        let count: i64 = row.get("count");
        if count > 0 {
            debug!("Default admin account already exists");
            return Ok(());
        }

        let password_hash = credential::hash_password(DEFAULT_ADMIN_PASSWORD)?;
        sqlx::query(
            "INSERT INTO users (name, email, password_hash, is_admin, birthdate, created_at) \
             VALUES (?, ?, ?, TRUE, ?, ?)",
        )
        .bind(DEFAULT_ADMIN_NAME)
        .bind(DEFAULT_ADMIN_EMAIL)
        .bind(&password_hash)
        .bind(DEFAULT_ADMIN_BIRTHDATE)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        info!(name = DEFAULT_ADMIN_NAME, "Created default admin account");
        Ok(())
    }

    // ----- users -----

    pub async fn user_by_id(&self, user_id: i64) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn user_by_name(&self, name: &str) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn name_exists(&self, name: &str) -> AppResult<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM users WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    pub async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    pub async fn name_taken_by_other(&self, name: &str, user_id: i64) -> AppResult<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM users WHERE name = ? AND id != ?")
            .bind(name)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    pub async fn email_taken_by_other(&self, email: &str, user_id: i64) -> AppResult<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM users WHERE email = ? AND id != ?")
            .bind(email)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    pub async fn insert_user(&self, new: &NewUser) -> AppResult<User> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO users (name, email, password_hash, is_admin, birthdate, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.is_admin)
        .bind(new.birthdate.format(BIRTHDATE_FORMAT).to_string())
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(User {
            id: result.last_insert_rowid(),
            name: new.name.clone(),
            email: new.email.clone(),
            password_hash: new.password_hash.clone(),
            is_admin: new.is_admin,
            birthdate: new.birthdate,
            created_at,
        })
    }

    pub async fn count_users(&self) -> AppResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }

    pub async fn list_users(&self, limit: i64, offset: i64) -> AppResult<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY id LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(user_from_row).collect()
    }

    pub async fn recent_users(&self, limit: i64) -> AppResult<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY created_at DESC, id DESC LIMIT ?")
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(user_from_row).collect()
    }

    /// Flip the admin flag and return the committed row. The flip and the
    /// read-back are one statement, so concurrent toggles serialize and each
    /// caller sees the state its own toggle produced.
    pub async fn toggle_admin(&self, user_id: i64) -> AppResult<Option<User>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("UPDATE users SET is_admin = NOT is_admin WHERE id = ? RETURNING *")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
        let user = row.as_ref().map(user_from_row).transpose()?;
        tx.commit().await?;
        Ok(user)
    }

    /// Delete an account, detaching any member row linked to it
    pub async fn delete_user(&self, user_id: i64) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE members SET user_id = NULL WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update_user_profile(
        &self,
        user_id: i64,
        name: &str,
        email: &str,
        birthdate: NaiveDate,
    ) -> AppResult<Option<User>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            "UPDATE users SET name = ?, email = ?, birthdate = ? WHERE id = ? RETURNING *",
        )
        .bind(name)
        .bind(email)
        .bind(birthdate.format(BIRTHDATE_FORMAT).to_string())
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
        let user = row.as_ref().map(user_from_row).transpose()?;
        tx.commit().await?;
        Ok(user)
    }

    // ----- categories -----

    pub async fn categories(&self) -> AppResult<Vec<Category>> {
        let rows = sqlx::query("SELECT * FROM categories ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(category_from_row).collect())
    }

    pub async fn category_by_id(&self, category_id: i64) -> AppResult<Option<Category>> {
        let row = sqlx::query("SELECT * FROM categories WHERE id = ?")
            .bind(category_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(category_from_row))
    }

    pub async fn category_group_counts(&self) -> AppResult<Vec<CategoryGroupCount>> {
        let rows = sqlx::query(
            "SELECT c.id, c.name, \
             (SELECT COUNT(*) FROM groups g WHERE g.category_id = c.id) as group_count \
             FROM categories c ORDER BY c.id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|row| CategoryGroupCount {
                category: category_from_row(row),
                group_count: row.get("group_count"),
            })
            .collect())
    }

    // ----- groups -----

    pub async fn group_by_id(&self, group_id: i64) -> AppResult<Option<Group>> {
        let row = sqlx::query("SELECT * FROM groups WHERE id = ?")
            .bind(group_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(group_from_row).transpose()
    }

    pub async fn group_name_exists(&self, name: &str) -> AppResult<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM groups WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    pub async fn list_groups(&self) -> AppResult<Vec<Group>> {
        let rows = sqlx::query("SELECT * FROM groups ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(group_from_row).collect()
    }

    pub async fn groups_in_category(&self, category_id: i64) -> AppResult<Vec<Group>> {
        let rows = sqlx::query("SELECT * FROM groups WHERE category_id = ? ORDER BY id")
            .bind(category_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(group_from_row).collect()
    }

    pub async fn groups_with_counts(&self) -> AppResult<Vec<GroupSummary>> {
        let rows = sqlx::query(
            "SELECT g.*, c.name as category_name, \
             (SELECT COUNT(*) FROM members m WHERE m.group_id = g.id) as member_count \
             FROM groups g JOIN categories c ON c.id = g.category_id ORDER BY g.id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                Ok(GroupSummary {
                    group: group_from_row(row)?,
                    category_name: row.get("category_name"),
                    member_count: row.get("member_count"),
                })
            })
            .collect()
    }

    pub async fn insert_group(&self, name: &str, category_id: i64) -> AppResult<Group> {
        let created_at = Utc::now();
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "INSERT INTO groups (name, category_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(name)
        .bind(category_id)
        .bind(created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(Group {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            category_id,
            created_at,
        })
    }

    /// Delete a group and all of its members in one transaction
    pub async fn delete_group(&self, group_id: i64) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM members WHERE group_id = ?")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM groups WHERE id = ?")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    // ----- members -----

    pub async fn member_by_id(&self, member_id: i64) -> AppResult<Option<Member>> {
        let row = sqlx::query("SELECT * FROM members WHERE id = ?")
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(member_from_row))
    }

    /// The member row linked to a user account. The schema allows at most
    /// one link per user.
    pub async fn member_for_user(&self, user_id: i64) -> AppResult<Option<Member>> {
        let row = sqlx::query("SELECT * FROM members WHERE user_id = ? LIMIT 1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(member_from_row))
    }

    pub async fn members_of_group(&self, group_id: i64) -> AppResult<Vec<Member>> {
        let rows = sqlx::query("SELECT * FROM members WHERE group_id = ? ORDER BY id")
            .bind(group_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(member_from_row).collect())
    }

    pub async fn insert_member(&self, new: &NewMember) -> AppResult<Member> {
        let result = sqlx::query(
            "INSERT INTO members (name, department, blog_url, group_id, user_id) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&new.name)
        .bind(&new.department)
        .bind(&new.blog_url)
        .bind(new.group_id)
        .bind(new.user_id)
        .execute(&self.pool)
        .await?;

        Ok(Member {
            id: result.last_insert_rowid(),
            name: new.name.clone(),
            department: new.department.clone(),
            blog_url: new.blog_url.clone(),
            group_id: new.group_id,
            user_id: new.user_id,
        })
    }

    // ----- stats -----

    pub async fn stats(&self) -> AppResult<DirectoryStats> {
        let row = sqlx::query(
            "SELECT \
             (SELECT COUNT(*) FROM users) as total_users, \
             (SELECT COUNT(*) FROM groups) as total_groups, \
             (SELECT COUNT(*) FROM members) as total_members",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DirectoryStats {
            total_users: row.get("total_users"),
            total_groups: row.get("total_groups"),
            total_members: row.get("total_members"),
        })
    }
}

fn user_from_row(row: &SqliteRow) -> AppResult<User> {
    let birthdate_raw: String = row.get("birthdate");
    let created_raw: String = row.get("created_at");

    let birthdate = NaiveDate::parse_from_str(&birthdate_raw, BIRTHDATE_FORMAT)
        .map_err(|_| AppError::internal(format!("invalid birthdate in directory: {birthdate_raw}")))?;
    let created_at: DateTime<Utc> = created_raw
        .parse()
        .map_err(|_| AppError::internal(format!("invalid created_at in directory: {created_raw}")))?;

    Ok(User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        is_admin: row.get("is_admin"),
        birthdate,
        created_at,
    })
}

fn group_from_row(row: &SqliteRow) -> AppResult<Group> {
    let created_raw: String = row.get("created_at");
    let created_at: DateTime<Utc> = created_raw
        .parse()
        .map_err(|_| AppError::internal(format!("invalid created_at in directory: {created_raw}")))?;

    Ok(Group {
        id: row.get("id"),
        name: row.get("name"),
        category_id: row.get("category_id"),
        created_at,
    })
}

fn category_from_row(row: &SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
    }
}

fn member_from_row(row: &SqliteRow) -> Member {
    Member {
        id: row.get("id"),
        name: row.get("name"),
        department: row.get("department"),
        blog_url: row.get("blog_url"),
        group_id: row.get("group_id"),
        user_id: row.get("user_id"),
    }
}
