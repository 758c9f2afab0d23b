use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use roteiro_core::contact::{ContactMessage, ContactStatus};
use roteiro_core::repository::ContactRepository;
use roteiro_core::{CoreError, CoreResult};

use crate::database::{corrupt, db_error};

pub struct StoreContactRepository {
    pool: PgPool,
}

impl StoreContactRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CONTACT_COLUMNS: &str = "id, name, email, phone, subject, message, status, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ContactRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    subject: String,
    message: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ContactRow> for ContactMessage {
    type Error = CoreError;

    fn try_from(row: ContactRow) -> Result<Self, Self::Error> {
        let status = ContactStatus::parse(&row.status).ok_or_else(|| corrupt("contact status", &row.status))?;
        Ok(ContactMessage {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            subject: row.subject,
            message: row.message,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl ContactRepository for StoreContactRepository {
    async fn create_contact(&self, contact: &ContactMessage) -> CoreResult<()> {
        let sql = format!("INSERT INTO contacts ({CONTACT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)");
        sqlx::query(&sql)
            .bind(contact.id)
            .bind(&contact.name)
            .bind(&contact.email)
            .bind(&contact.phone)
            .bind(&contact.subject)
            .bind(&contact.message)
            .bind(contact.status.as_str())
            .bind(contact.created_at)
            .bind(contact.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("create contact", e))?;

        Ok(())
    }

    async fn list_contacts(&self, status: Option<ContactStatus>) -> CoreResult<Vec<ContactMessage>> {
        let sql = format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE ($1::TEXT IS NULL OR status = $1) ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list contacts", e))?;

        rows.into_iter().map(ContactMessage::try_from).collect()
    }

    async fn get_contact(&self, id: Uuid) -> CoreResult<Option<ContactMessage>> {
        let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = $1");
        let row = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("get contact", e))?;

        row.map(ContactMessage::try_from).transpose()
    }

    async fn update_contact(&self, contact: &ContactMessage) -> CoreResult<()> {
        let result = sqlx::query("UPDATE contacts SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(contact.id)
            .bind(contact.status.as_str())
            .bind(contact.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("update contact", e))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("contact {}", contact.id)));
        }
        Ok(())
    }

    async fn delete_contact(&self, id: Uuid) -> CoreResult<()> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete contact", e))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("contact {id}")));
        }
        Ok(())
    }
}
