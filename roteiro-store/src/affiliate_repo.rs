use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use roteiro_core::repository::AffiliateRepository;
use roteiro_core::{CoreError, CoreResult};
use roteiro_order::{Affiliate, AffiliateStatus, CommissionStatus, Referral};

use crate::database::{corrupt, db_error};

pub struct StoreAffiliateRepository {
    pool: PgPool,
}

impl StoreAffiliateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const AFFILIATE_COLUMNS: &str =
    "id, user_id, name, email, code, commission_rate, status, pix_key, created_at, updated_at";
const REFERRAL_COLUMNS: &str = "id, affiliate_id, booking_id, sale_cents, commission_cents, status, created_at";

#[derive(sqlx::FromRow)]
struct AffiliateRow {
    id: Uuid,
    user_id: String,
    name: String,
    email: String,
    code: String,
    commission_rate: i32,
    status: String,
    pix_key: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AffiliateRow> for Affiliate {
    type Error = CoreError;

    fn try_from(row: AffiliateRow) -> Result<Self, Self::Error> {
        let status = AffiliateStatus::parse(&row.status).ok_or_else(|| corrupt("affiliate status", &row.status))?;
        Ok(Affiliate {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            email: row.email,
            code: row.code,
            commission_rate: row.commission_rate,
            status,
            pix_key: row.pix_key,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReferralRow {
    id: Uuid,
    affiliate_id: Uuid,
    booking_id: Uuid,
    sale_cents: i64,
    commission_cents: i64,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReferralRow> for Referral {
    type Error = CoreError;

    fn try_from(row: ReferralRow) -> Result<Self, Self::Error> {
        let status = CommissionStatus::parse(&row.status).ok_or_else(|| corrupt("commission status", &row.status))?;
        Ok(Referral {
            id: row.id,
            affiliate_id: row.affiliate_id,
            booking_id: row.booking_id,
            sale_cents: row.sale_cents,
            commission_cents: row.commission_cents,
            status,
            created_at: row.created_at,
        })
    }
}

impl StoreAffiliateRepository {
    async fn fetch_one_affiliate(&self, clause: &str, arg: &str, context: &str) -> CoreResult<Option<Affiliate>> {
        let sql = format!("SELECT {AFFILIATE_COLUMNS} FROM affiliates WHERE {clause}");
        let row = sqlx::query_as::<_, AffiliateRow>(&sql)
            .bind(arg)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error(context, e))?;

        row.map(Affiliate::try_from).transpose()
    }
}

#[async_trait]
impl AffiliateRepository for StoreAffiliateRepository {
    async fn list_affiliates(&self, status: Option<AffiliateStatus>) -> CoreResult<Vec<Affiliate>> {
        let sql = format!(
            "SELECT {AFFILIATE_COLUMNS} FROM affiliates WHERE ($1::TEXT IS NULL OR status = $1) ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, AffiliateRow>(&sql)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list affiliates", e))?;

        rows.into_iter().map(Affiliate::try_from).collect()
    }

    async fn get_affiliate(&self, id: Uuid) -> CoreResult<Option<Affiliate>> {
        let sql = format!("SELECT {AFFILIATE_COLUMNS} FROM affiliates WHERE id = $1");
        let row = sqlx::query_as::<_, AffiliateRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("get affiliate", e))?;

        row.map(Affiliate::try_from).transpose()
    }

    async fn find_affiliate_by_user(&self, user_id: &str) -> CoreResult<Option<Affiliate>> {
        self.fetch_one_affiliate("user_id = $1", user_id, "find affiliate by user").await
    }

    async fn find_affiliate_by_code(&self, code: &str) -> CoreResult<Option<Affiliate>> {
        self.fetch_one_affiliate("code = upper($1)", code.trim(), "find affiliate by code").await
    }

    async fn create_affiliate(&self, affiliate: &Affiliate) -> CoreResult<()> {
        let sql = format!("INSERT INTO affiliates ({AFFILIATE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)");
        sqlx::query(&sql)
            .bind(affiliate.id)
            .bind(&affiliate.user_id)
            .bind(&affiliate.name)
            .bind(&affiliate.email)
            .bind(&affiliate.code)
            .bind(affiliate.commission_rate)
            .bind(affiliate.status.as_str())
            .bind(&affiliate.pix_key)
            .bind(affiliate.created_at)
            .bind(affiliate.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("create affiliate", e))?;

        Ok(())
    }

    async fn update_affiliate(&self, affiliate: &Affiliate) -> CoreResult<()> {
        let result = sqlx::query(
            "UPDATE affiliates SET name = $2, email = $3, commission_rate = $4, status = $5, pix_key = $6, updated_at = $7 \
             WHERE id = $1",
        )
        .bind(affiliate.id)
        .bind(&affiliate.name)
        .bind(&affiliate.email)
        .bind(affiliate.commission_rate)
        .bind(affiliate.status.as_str())
        .bind(&affiliate.pix_key)
        .bind(affiliate.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("update affiliate", e))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("affiliate {}", affiliate.id)));
        }
        Ok(())
    }

    async fn create_referral(&self, referral: &Referral) -> CoreResult<()> {
        let sql = format!("INSERT INTO referrals ({REFERRAL_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)");
        sqlx::query(&sql)
            .bind(referral.id)
            .bind(referral.affiliate_id)
            .bind(referral.booking_id)
            .bind(referral.sale_cents)
            .bind(referral.commission_cents)
            .bind(referral.status.as_str())
            .bind(referral.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("create referral", e))?;

        Ok(())
    }

    async fn list_referrals(&self, affiliate_id: Uuid) -> CoreResult<Vec<Referral>> {
        let sql = format!("SELECT {REFERRAL_COLUMNS} FROM referrals WHERE affiliate_id = $1 ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, ReferralRow>(&sql)
            .bind(affiliate_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list referrals", e))?;

        rows.into_iter().map(Referral::try_from).collect()
    }

    async fn get_referral(&self, id: Uuid) -> CoreResult<Option<Referral>> {
        let sql = format!("SELECT {REFERRAL_COLUMNS} FROM referrals WHERE id = $1");
        let row = sqlx::query_as::<_, ReferralRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("get referral", e))?;

        row.map(Referral::try_from).transpose()
    }

    async fn update_referral(&self, referral: &Referral) -> CoreResult<()> {
        let result = sqlx::query("UPDATE referrals SET status = $2 WHERE id = $1")
            .bind(referral.id)
            .bind(referral.status.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("update referral", e))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("referral {}", referral.id)));
        }
        Ok(())
    }
}
