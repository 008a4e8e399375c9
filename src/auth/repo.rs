use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::repo_types::{NewUser, StoreError, User};

/// Persistence for users. Writes must be atomic on their own: uniqueness is
/// enforced by the insert and the paid flag by a keyed update, never by a
/// read followed by a write.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;

    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    /// Sets `paid = true` for the row with this email. Returns whether a row matched.
    async fn mark_paid(&self, email: &str) -> anyhow::Result<bool>;

    async fn count(&self) -> anyhow::Result<i64>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    /// Find a user by username.
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, is_admin, paid, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .context("find user by username")?;
        Ok(user)
    }

    /// Create a new user with hashed password.
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, is_admin)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password_hash, is_admin, paid, created_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .fetch_one(&self.db)
        .await;

        match result {
            Ok(u) => Ok(u),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(StoreError::Duplicate),
            Err(e) => Err(StoreError::Other(anyhow::Error::new(e).context("insert user"))),
        }
    }

    async fn mark_paid(&self, email: &str) -> anyhow::Result<bool> {
        let done = sqlx::query(
            r#"
            UPDATE users
               SET paid = TRUE
             WHERE email = $1
            "#,
        )
        .bind(email)
        .execute(&self.db)
        .await
        .context("mark user paid")?;
        Ok(done.rows_affected() > 0)
    }

    async fn count(&self) -> anyhow::Result<i64> {
        let (n,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await
            .context("count users")?;
        Ok(n)
    }
}
