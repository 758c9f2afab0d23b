use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use roteiro_core::repository::UserDirectory;
use roteiro_core::CoreResult;
use roteiro_order::RegisteredUser;

use crate::database::db_error;

/// Reads the `users` mirror of the auth provider.
pub struct StoreUserDirectory {
    pool: PgPool,
}

impl StoreUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    phone: Option<String>,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl UserDirectory for StoreUserDirectory {
    async fn list_users(&self) -> CoreResult<Vec<RegisteredUser>> {
        let rows = sqlx::query_as::<_, UserRow>("SELECT id, name, email, phone, created_at FROM users ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list users", e))?;

        Ok(rows
            .into_iter()
            .map(|row| RegisteredUser {
                id: row.id,
                name: row.name,
                email: row.email,
                phone: row.phone,
                created_at: row.created_at,
            })
            .collect())
    }
}
