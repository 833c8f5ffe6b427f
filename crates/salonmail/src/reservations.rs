use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use sqlx::PgPool;

/// The slice of a reservation that mail templates need.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Reservation {
    pub id: i64,
    pub reservation_code: String,
    pub customer_name: String,
    pub email: String,
    pub service_name: String,
    pub reservation_date: NaiveDate,
    pub start_time: NaiveTime,
}

#[derive(Clone)]
pub struct ReservationsRepo {
    pool: PgPool,
}

impl ReservationsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, id: i64) -> anyhow::Result<Option<Reservation>> {
        let row = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT
                r.id,
                r.reservation_code,
                r.customer_name,
                r.email,
                s.name AS service_name,
                r.reservation_date,
                r.start_time
            FROM reservations r
            JOIN services s ON s.id = r.service_id
            WHERE r.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
