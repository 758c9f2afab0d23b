use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use roteiro_catalog::Bus;
use roteiro_core::repository::FleetRepository;
use roteiro_core::{CoreError, CoreResult};

use crate::database::db_error;

pub struct StoreFleetRepository {
    pool: PgPool,
}

impl StoreFleetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BusRow {
    id: Uuid,
    model: String,
    year: i32,
    plate: String,
    seat_count: i32,
    floor_count: i32,
    photos: Vec<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BusRow> for Bus {
    fn from(row: BusRow) -> Self {
        Bus {
            id: row.id,
            model: row.model,
            year: row.year,
            plate: row.plate,
            seat_count: row.seat_count.max(0) as u32,
            floor_count: row.floor_count.max(1) as u32,
            photos: row.photos,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl FleetRepository for StoreFleetRepository {
    async fn list_buses(&self, active_only: bool) -> CoreResult<Vec<Bus>> {
        let rows = sqlx::query_as::<_, BusRow>(
            "SELECT id, model, year, plate, seat_count, floor_count, photos, active, created_at, updated_at \
             FROM buses WHERE (NOT $1 OR active) ORDER BY model ASC, plate ASC",
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list buses", e))?;

        Ok(rows.into_iter().map(Bus::from).collect())
    }

    async fn get_bus(&self, id: Uuid) -> CoreResult<Option<Bus>> {
        let row = sqlx::query_as::<_, BusRow>(
            "SELECT id, model, year, plate, seat_count, floor_count, photos, active, created_at, updated_at \
             FROM buses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get bus", e))?;

        Ok(row.map(Bus::from))
    }

    async fn create_bus(&self, bus: &Bus) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO buses (id, model, year, plate, seat_count, floor_count, photos, active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(bus.id)
        .bind(&bus.model)
        .bind(bus.year)
        .bind(&bus.plate)
        .bind(bus.seat_count as i32)
        .bind(bus.floor_count as i32)
        .bind(&bus.photos)
        .bind(bus.active)
        .bind(bus.created_at)
        .bind(bus.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("create bus", e))?;

        Ok(())
    }

    async fn update_bus(&self, bus: &Bus) -> CoreResult<()> {
        let result = sqlx::query(
            "UPDATE buses SET model = $2, year = $3, plate = $4, seat_count = $5, floor_count = $6, \
             photos = $7, active = $8, updated_at = $9 WHERE id = $1",
        )
        .bind(bus.id)
        .bind(&bus.model)
        .bind(bus.year)
        .bind(&bus.plate)
        .bind(bus.seat_count as i32)
        .bind(bus.floor_count as i32)
        .bind(&bus.photos)
        .bind(bus.active)
        .bind(bus.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("update bus", e))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("bus {}", bus.id)));
        }
        Ok(())
    }

    async fn delete_bus(&self, id: Uuid) -> CoreResult<()> {
        let result = sqlx::query("DELETE FROM buses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete bus", e))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("bus {id}")));
        }
        Ok(())
    }
}
