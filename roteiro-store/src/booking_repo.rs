use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use roteiro_core::repository::{BookingFilter, BookingRepository};
use roteiro_core::{CoreError, CoreResult};
use roteiro_order::{Booking, BookingStatus, Occupancy, PaymentStatus};

use crate::database::{corrupt, db_error};

pub struct StoreBookingRepository {
    pool: PgPool,
}

impl StoreBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const BOOKING_COLUMNS: &str = "id, package_id, customer_name, customer_email, customer_phone, passengers, \
     child_ages, seats, total_cents, status, payment_status, affiliate_code, notes, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    package_id: Uuid,
    customer_name: String,
    customer_email: String,
    customer_phone: String,
    passengers: i32,
    child_ages: Vec<i32>,
    seats: Vec<i32>,
    total_cents: i64,
    status: String,
    payment_status: String,
    affiliate_code: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = CoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status = BookingStatus::parse(&row.status).ok_or_else(|| corrupt("booking status", &row.status))?;
        let payment_status =
            PaymentStatus::parse(&row.payment_status).ok_or_else(|| corrupt("payment status", &row.payment_status))?;
        Ok(Booking {
            id: row.id,
            package_id: row.package_id,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            customer_phone: row.customer_phone,
            passengers: row.passengers.max(0) as u32,
            child_ages: row.child_ages.into_iter().map(|a| a.clamp(0, u8::MAX as i32) as u8).collect(),
            seats: row.seats.into_iter().map(|s| s.max(0) as u32).collect(),
            total_cents: row.total_cents,
            status,
            payment_status,
            affiliate_code: row.affiliate_code,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn seat_params(seats: &[u32]) -> Vec<i32> {
    seats.iter().map(|&s| s as i32).collect()
}

#[async_trait]
impl BookingRepository for StoreBookingRepository {
    async fn occupancy(&self, package_id: Uuid) -> CoreResult<Occupancy> {
        let seats: Vec<i32> = sqlx::query_scalar(
            "SELECT seat_number FROM booking_seats WHERE package_id = $1 ORDER BY seat_number",
        )
        .bind(package_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("load occupied seats", e))?;

        let passengers: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(passengers), 0)::BIGINT FROM bookings WHERE package_id = $1 AND status <> 'canceled'",
        )
        .bind(package_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("count passengers", e))?;

        Ok(Occupancy {
            seats: seats.into_iter().map(|s| s as u32).collect(),
            passengers: passengers.max(0) as u32,
        })
    }

    async fn create_booking(&self, booking: &Booking, capacity: u32) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("begin booking", e))?;

        // Serialises concurrent bookings of the same package.
        let locked: Option<Uuid> = sqlx::query_scalar("SELECT id FROM packages WHERE id = $1 FOR UPDATE")
            .bind(booking.package_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_error("lock package", e))?;
        if locked.is_none() {
            return Err(CoreError::NotFound(format!("package {}", booking.package_id)));
        }

        let booked: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(passengers), 0)::BIGINT FROM bookings WHERE package_id = $1 AND status <> 'canceled'",
        )
        .bind(booking.package_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("count passengers", e))?;

        let available = (capacity as i64 - booked).max(0);
        if booking.passengers as i64 > available {
            return Err(CoreError::Conflict(format!(
                "only {available} seats left, {} requested",
                booking.passengers
            )));
        }

        let seats = seat_params(&booking.seats);
        if !seats.is_empty() {
            let taken: Vec<i32> = sqlx::query_scalar(
                "SELECT seat_number FROM booking_seats WHERE package_id = $1 AND seat_number = ANY($2) ORDER BY seat_number",
            )
            .bind(booking.package_id)
            .bind(&seats)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| db_error("check seats", e))?;

            if !taken.is_empty() {
                return Err(CoreError::Conflict(format!("seats already taken: {taken:?}")));
            }
        }

        let sql = format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"
        );
        sqlx::query(&sql)
            .bind(booking.id)
            .bind(booking.package_id)
            .bind(&booking.customer_name)
            .bind(&booking.customer_email)
            .bind(&booking.customer_phone)
            .bind(booking.passengers as i32)
            .bind(booking.child_ages.iter().map(|&a| a as i32).collect::<Vec<i32>>())
            .bind(&seats)
            .bind(booking.total_cents)
            .bind(booking.status.as_str())
            .bind(booking.payment_status.as_str())
            .bind(&booking.affiliate_code)
            .bind(&booking.notes)
            .bind(booking.created_at)
            .bind(booking.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("insert booking", e))?;

        if !seats.is_empty() {
            sqlx::query(
                "INSERT INTO booking_seats (package_id, seat_number, booking_id) \
                 SELECT $1, seat, $2 FROM UNNEST($3::INT[]) AS seat",
            )
            .bind(booking.package_id)
            .bind(booking.id)
            .bind(&seats)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("claim seats", e))?;
        }

        tx.commit().await.map_err(|e| db_error("commit booking", e))?;
        info!("Booking {} stored with seats {:?}", booking.id, booking.seats);
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<Booking>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("get booking", e))?;

        row.map(Booking::try_from).transpose()
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> CoreResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings \
             WHERE ($1::UUID IS NULL OR package_id = $1) \
               AND ($2::TEXT IS NULL OR status = $2) \
               AND ($3::TEXT IS NULL OR lower(customer_email) = lower($3)) \
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(filter.package_id)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.email.as_deref().map(str::trim))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list bookings", e))?;

        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn update_booking_status(&self, booking: &Booking, expected: (BookingStatus, PaymentStatus)) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("begin status update", e))?;

        let result = sqlx::query(
            "UPDATE bookings SET status = $2, payment_status = $3, updated_at = $4 \
             WHERE id = $1 AND status = $5 AND payment_status = $6",
        )
        .bind(booking.id)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(booking.updated_at)
        .bind(expected.0.as_str())
        .bind(expected.1.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("update booking status", e))?;

        if result.rows_affected() == 0 {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM bookings WHERE id = $1)")
                .bind(booking.id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| db_error("check booking", e))?;
            if exists {
                return Err(CoreError::Conflict(format!(
                    "booking {} is no longer {}",
                    booking.id,
                    expected.0.as_str()
                )));
            }
            return Err(CoreError::NotFound(format!("booking {}", booking.id)));
        }

        if booking.status == BookingStatus::Canceled {
            sqlx::query("DELETE FROM booking_seats WHERE booking_id = $1")
                .bind(booking.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("release seats", e))?;
        }

        tx.commit().await.map_err(|e| db_error("commit status update", e))?;
        Ok(())
    }
}
