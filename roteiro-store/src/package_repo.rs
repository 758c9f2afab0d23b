use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use roteiro_catalog::{ChildPriceTier, Package, PackageStatus};
use roteiro_core::repository::PackageRepository;
use roteiro_core::{CoreError, CoreResult};

use crate::database::{corrupt, db_error};

pub struct StorePackageRepository {
    pool: PgPool,
}

impl StorePackageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PACKAGE_COLUMNS: &str = "id, title, destination, description, price_cents, child_prices, duration_days, \
     departure_date, departure_time, return_date, return_time, total_seats, cover_image, gallery, \
     included, excluded, attractions, status, bus_id, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct PackageRow {
    id: Uuid,
    title: String,
    destination: String,
    description: Option<String>,
    price_cents: i64,
    child_prices: Json<Vec<ChildPriceTier>>,
    duration_days: i32,
    departure_date: NaiveDate,
    departure_time: Option<NaiveTime>,
    return_date: NaiveDate,
    return_time: Option<NaiveTime>,
    total_seats: i32,
    cover_image: Option<String>,
    gallery: Vec<String>,
    included: Vec<String>,
    excluded: Vec<String>,
    attractions: Vec<String>,
    status: String,
    bus_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PackageRow> for Package {
    type Error = CoreError;

    fn try_from(row: PackageRow) -> Result<Self, Self::Error> {
        let status = PackageStatus::parse(&row.status).ok_or_else(|| corrupt("package status", &row.status))?;
        Ok(Package {
            id: row.id,
            title: row.title,
            destination: row.destination,
            description: row.description,
            price_cents: row.price_cents,
            child_prices: row.child_prices.0,
            duration_days: row.duration_days.max(0) as u32,
            departure_date: row.departure_date,
            departure_time: row.departure_time,
            return_date: row.return_date,
            return_time: row.return_time,
            total_seats: row.total_seats.max(0) as u32,
            cover_image: row.cover_image,
            gallery: row.gallery,
            included: row.included,
            excluded: row.excluded,
            attractions: row.attractions,
            status,
            bus_id: row.bus_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl PackageRepository for StorePackageRepository {
    async fn list_packages(&self, status: Option<PackageStatus>) -> CoreResult<Vec<Package>> {
        let sql = format!(
            "SELECT {PACKAGE_COLUMNS} FROM packages \
             WHERE ($1::TEXT IS NULL OR status = $1) \
             ORDER BY departure_date ASC, title ASC"
        );
        let rows = sqlx::query_as::<_, PackageRow>(&sql)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list packages", e))?;

        rows.into_iter().map(Package::try_from).collect()
    }

    async fn get_package(&self, id: Uuid) -> CoreResult<Option<Package>> {
        let sql = format!("SELECT {PACKAGE_COLUMNS} FROM packages WHERE id = $1");
        let row = sqlx::query_as::<_, PackageRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("get package", e))?;

        row.map(Package::try_from).transpose()
    }

    async fn create_package(&self, package: &Package) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO packages (
                id, title, destination, description, price_cents, child_prices, duration_days,
                departure_date, departure_time, return_date, return_time, total_seats, cover_image,
                gallery, included, excluded, attractions, status, bus_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
            "#,
        )
        .bind(package.id)
        .bind(&package.title)
        .bind(&package.destination)
        .bind(&package.description)
        .bind(package.price_cents)
        .bind(Json(&package.child_prices))
        .bind(package.duration_days as i32)
        .bind(package.departure_date)
        .bind(package.departure_time)
        .bind(package.return_date)
        .bind(package.return_time)
        .bind(package.total_seats as i32)
        .bind(&package.cover_image)
        .bind(&package.gallery)
        .bind(&package.included)
        .bind(&package.excluded)
        .bind(&package.attractions)
        .bind(package.status.as_str())
        .bind(package.bus_id)
        .bind(package.created_at)
        .bind(package.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("create package", e))?;

        Ok(())
    }

    async fn update_package(&self, package: &Package) -> CoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE packages SET
                title = $2, destination = $3, description = $4, price_cents = $5, child_prices = $6,
                duration_days = $7, departure_date = $8, departure_time = $9, return_date = $10,
                return_time = $11, total_seats = $12, cover_image = $13, gallery = $14, included = $15,
                excluded = $16, attractions = $17, status = $18, bus_id = $19, updated_at = $20
            WHERE id = $1
            "#,
        )
        .bind(package.id)
        .bind(&package.title)
        .bind(&package.destination)
        .bind(&package.description)
        .bind(package.price_cents)
        .bind(Json(&package.child_prices))
        .bind(package.duration_days as i32)
        .bind(package.departure_date)
        .bind(package.departure_time)
        .bind(package.return_date)
        .bind(package.return_time)
        .bind(package.total_seats as i32)
        .bind(&package.cover_image)
        .bind(&package.gallery)
        .bind(&package.included)
        .bind(&package.excluded)
        .bind(&package.attractions)
        .bind(package.status.as_str())
        .bind(package.bus_id)
        .bind(package.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("update package", e))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("package {}", package.id)));
        }
        Ok(())
    }

    async fn delete_package(&self, id: Uuid) -> CoreResult<()> {
        let result = sqlx::query("DELETE FROM packages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete package", e))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("package {id}")));
        }
        Ok(())
    }
}
