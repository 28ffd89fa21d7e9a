//! # User Repository
//!
//! Users and their credentials. Passwords enter as plaintext and are hashed
//! here with an explicit [`hash_password`] call before any write.
//!
//! ```text
//! create(NewUser { password, .. })
//!      │
//!      ├── hash_password(password)   → "$argon2id$v=19$..."
//!      │
//!      └── INSERT INTO users (..., password_hash, ...)
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use pdv_core::{Role, User};

use crate::error::{DbError, DbResult};
use crate::password::hash_password;

const USER_COLUMNS: &str = r#"
    id, name, email, password_hash, role, active, last_login_at, created_at, updated_at
"#;

/// Fields of a user to be created. `password` is plaintext.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Replacement values for [`UserRepository::update`].
///
/// `password: Some` is hashed before it is stored; `None` keeps the current
/// hash. `active: None` keeps the current flag.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub active: Option<bool>,
    pub password: Option<String>,
}

/// Repository for back-office users.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Lists all users, ordered by name.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY name");
        let users = sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Looks a user up by email, case-insensitively.
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        debug!(email = %email, "Looking up user by email");

        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Creates an active user, hashing the password first.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - Email already registered
    pub async fn create(&self, new: NewUser) -> DbResult<User> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            email: normalize_email(&new.email),
            password_hash: hash_password(&new.password)?,
            role: new.role,
            active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO users (
                id, name, email, password_hash, role, active,
                last_login_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.active)
        .bind(user.last_login_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| email_conflict(e, &user.email))?;

        info!(id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// Rewrites a user's profile, role and flag, and the password when one
    /// is given.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - unknown id
    /// * `Err(DbError::UniqueViolation)` - email registered to someone else
    pub async fn update(&self, id: &str, changes: UserUpdate) -> DbResult<User> {
        debug!(id = %id, role = %changes.role, "Updating user");

        let email = normalize_email(&changes.email);
        let hash = changes.password.as_deref().map(hash_password).transpose()?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = ?2,
                email = ?3,
                role = ?4,
                active = COALESCE(?5, active),
                password_hash = COALESCE(?6, password_hash),
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(changes.name.trim())
        .bind(&email)
        .bind(changes.role)
        .bind(changes.active)
        .bind(hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| email_conflict(e, &email))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        info!(id = %id, "User updated");
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Deletes a user who never recorded a sale.
    ///
    /// ## Returns
    /// * `Err(DbError::InUse)` - sales are attributed to this user
    /// * `Err(DbError::NotFound)` - unknown id
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        let sales: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE user_id = ?1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if sales > 0 {
            return Err(DbError::in_use("User", id, format!("{} sale(s)", sales)));
        }

        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        tx.commit().await.map_err(DbError::transaction)?;
        info!(id = %id, "User deleted");
        Ok(())
    }

    /// Stamps `last_login_at` with the current time.
    pub async fn record_login(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();
        let result = sqlx::query("UPDATE users SET last_login_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }

    /// Replaces the password hash with a hash of `new_password`.
    pub async fn update_password(&self, id: &str, new_password: &str) -> DbResult<()> {
        debug!(id = %id, "Updating password");

        let hash = hash_password(new_password)?;
        let now = Utc::now();

        let result =
            sqlx::query("UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(hash)
                .bind(now)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        info!(id = %id, "Password changed");
        Ok(())
    }

    /// Counts users.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

fn email_conflict(err: sqlx::Error, email: &str) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate("email", email),
        other => other,
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
