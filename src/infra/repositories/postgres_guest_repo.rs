use crate::domain::{
    models::guest::{Guest, Table},
    ports::{contains_pattern, GuestRepository},
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, PgPool};

pub struct PostgresGuestRepo {
    pool: PgPool,
}

impl PostgresGuestRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn name_pattern(search: Option<&str>) -> String {
    search.map(contains_pattern).unwrap_or_else(|| "%".to_string())
}

#[async_trait]
impl GuestRepository for PostgresGuestRepo {
    async fn replace_seating(&self, event_id: &str, tables: &[Table], guests: &[Guest]) -> Result<usize, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        sqlx::query("DELETE FROM guests WHERE event_id = $1")
            .bind(event_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;
        sqlx::query("DELETE FROM tables WHERE event_id = $1")
            .bind(event_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        for table in tables {
            sqlx::query("INSERT INTO tables (id, event_id, table_name) VALUES ($1, $2, $3)")
                .bind(&table.id)
                .bind(&table.event_id)
                .bind(&table.table_name)
                .execute(&mut *tx)
                .await
                .map_err(AppError::Database)?;
        }

        for (position, guest) in guests.iter().enumerate() {
            sqlx::query(
                r#"INSERT INTO guests (id, event_id, name, table_name, seat_no, dietary, checked_in, updated_at, position)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#
            )
                .bind(&guest.id)
                .bind(&guest.event_id)
                .bind(&guest.name)
                .bind(&guest.table_name)
                .bind(guest.seat_no)
                .bind(&guest.dietary)
                .bind(guest.checked_in)
                .bind(guest.updated_at)
                .bind(position as i64)
                .execute(&mut *tx)
                .await
                .map_err(AppError::Database)?;
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(guests.len())
    }

    async fn list_by_event(&self, event_id: &str) -> Result<Vec<Guest>, AppError> {
        sqlx::query_as::<_, Guest>("SELECT * FROM guests WHERE event_id = $1 ORDER BY position")
            .bind(event_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_tables(&self, event_id: &str) -> Result<Vec<Table>, AppError> {
        sqlx::query_as::<_, Table>("SELECT * FROM tables WHERE event_id = $1 ORDER BY table_name")
            .bind(event_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_by_table(&self, event_id: &str, table_name: &str) -> Result<Vec<Guest>, AppError> {
        sqlx::query_as::<_, Guest>("SELECT * FROM guests WHERE event_id = $1 AND table_name = $2 ORDER BY seat_no")
            .bind(event_id)
            .bind(table_name)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, event_id: &str, id: &str) -> Result<Option<Guest>, AppError> {
        sqlx::query_as::<_, Guest>("SELECT * FROM guests WHERE event_id = $1 AND id = $2")
            .bind(event_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_first_by_name(&self, event_id: &str, fragment: &str) -> Result<Option<Guest>, AppError> {
        sqlx::query_as::<_, Guest>(
            r"SELECT * FROM guests WHERE event_id = $1 AND lower(name) LIKE $2 ESCAPE '\' LIMIT 1",
        )
            .bind(event_id)
            .bind(contains_pattern(fragment))
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn search(&self, event_id: &str, search: Option<&str>, limit: i64, offset: i64) -> Result<Vec<Guest>, AppError> {
        sqlx::query_as::<_, Guest>(
            r"SELECT * FROM guests WHERE event_id = $1 AND lower(name) LIKE $2 ESCAPE '\'
              ORDER BY table_name, seat_no LIMIT $3 OFFSET $4",
        )
            .bind(event_id)
            .bind(name_pattern(search))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn count(&self, event_id: &str, search: Option<&str>) -> Result<i64, AppError> {
        let row = sqlx::query(
            r"SELECT COUNT(*) as count FROM guests WHERE event_id = $1 AND lower(name) LIKE $2 ESCAPE '\'",
        )
            .bind(event_id)
            .bind(name_pattern(search))
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(row.get::<i64, _>("count"))
    }

    async fn count_in_table(&self, event_id: &str, table_name: &str, exclude_guest_id: Option<&str>) -> Result<i64, AppError> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM guests WHERE event_id = $1 AND table_name = $2 AND id != $3",
        )
            .bind(event_id)
            .bind(table_name)
            .bind(exclude_guest_id.unwrap_or(""))
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(row.get::<i64, _>("count"))
    }

    async fn seat_taken(&self, event_id: &str, table_name: &str, seat_no: i64, exclude_guest_id: Option<&str>) -> Result<bool, AppError> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM guests WHERE event_id = $1 AND table_name = $2 AND seat_no = $3 AND id != $4",
        )
            .bind(event_id)
            .bind(table_name)
            .bind(seat_no)
            .bind(exclude_guest_id.unwrap_or(""))
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(row.get::<i64, _>("count") > 0)
    }

    async fn update(&self, guest: &Guest) -> Result<Guest, AppError> {
        sqlx::query_as::<_, Guest>(
            r#"UPDATE guests SET name = $1, table_name = $2, seat_no = $3, dietary = $4, checked_in = $5, updated_at = $6
               WHERE id = $7 AND event_id = $8 RETURNING *"#
        )
            .bind(&guest.name)
            .bind(&guest.table_name)
            .bind(guest.seat_no)
            .bind(&guest.dietary)
            .bind(guest.checked_in)
            .bind(Utc::now())
            .bind(&guest.id)
            .bind(&guest.event_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .ok_or(AppError::NotFound("Guest not found".into()))
    }

    async fn mark_checked_in(&self, event_id: &str, id: &str) -> Result<Guest, AppError> {
        sqlx::query_as::<_, Guest>(
            "UPDATE guests SET checked_in = $1, updated_at = $2 WHERE id = $3 AND event_id = $4 RETURNING *",
        )
            .bind(true)
            .bind(Utc::now())
            .bind(id)
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .ok_or(AppError::NotFound("Guest not found".into()))
    }
}
