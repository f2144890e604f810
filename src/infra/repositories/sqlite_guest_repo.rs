use crate::domain::{
    models::guest::{Guest, Table},
    ports::{contains_pattern, GuestRepository},
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

pub struct SqliteGuestRepo {
    pool: SqlitePool,
}

impl SqliteGuestRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn name_pattern(search: Option<&str>) -> String {
    search.map(contains_pattern).unwrap_or_else(|| "%".to_string())
}

#[async_trait]
impl GuestRepository for SqliteGuestRepo {
    async fn replace_seating(&self, event_id: &str, tables: &[Table], guests: &[Guest]) -> Result<usize, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        sqlx::query("DELETE FROM guests WHERE event_id = ?")
            .bind(event_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;
        sqlx::query("DELETE FROM tables WHERE event_id = ?")
            .bind(event_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        for table in tables {
            sqlx::query("INSERT INTO tables (id, event_id, table_name) VALUES (?, ?, ?)")
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
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#
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
        sqlx::query_as::<_, Guest>("SELECT * FROM guests WHERE event_id = ? ORDER BY position")
            .bind(event_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_tables(&self, event_id: &str) -> Result<Vec<Table>, AppError> {
        sqlx::query_as::<_, Table>("SELECT * FROM tables WHERE event_id = ? ORDER BY table_name")
            .bind(event_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_by_table(&self, event_id: &str, table_name: &str) -> Result<Vec<Guest>, AppError> {
        sqlx::query_as::<_, Guest>("SELECT * FROM guests WHERE event_id = ? AND table_name = ? ORDER BY seat_no")
            .bind(event_id)
            .bind(table_name)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, event_id: &str, id: &str) -> Result<Option<Guest>, AppError> {
        sqlx::query_as::<_, Guest>("SELECT * FROM guests WHERE event_id = ? AND id = ?")
            .bind(event_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_first_by_name(&self, event_id: &str, fragment: &str) -> Result<Option<Guest>, AppError> {
        sqlx::query_as::<_, Guest>(
            r"SELECT * FROM guests WHERE event_id = ? AND lower(name) LIKE ? ESCAPE '\' LIMIT 1",
        )
            .bind(event_id)
            .bind(contains_pattern(fragment))
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn search(&self, event_id: &str, search: Option<&str>, limit: i64, offset: i64) -> Result<Vec<Guest>, AppError> {
        sqlx::query_as::<_, Guest>(
            r"SELECT * FROM guests WHERE event_id = ? AND lower(name) LIKE ? ESCAPE '\'
              ORDER BY table_name, seat_no LIMIT ? OFFSET ?",
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
            r"SELECT COUNT(*) as count FROM guests WHERE event_id = ? AND lower(name) LIKE ? ESCAPE '\'",
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
            "SELECT COUNT(*) as count FROM guests WHERE event_id = ? AND table_name = ? AND id != ?",
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
            "SELECT COUNT(*) as count FROM guests WHERE event_id = ? AND table_name = ? AND seat_no = ? AND id != ?",
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
            r#"UPDATE guests SET name = ?, table_name = ?, seat_no = ?, dietary = ?, checked_in = ?, updated_at = ?
               WHERE id = ? AND event_id = ? RETURNING *"#
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
            "UPDATE guests SET checked_in = ?, updated_at = ? WHERE id = ? AND event_id = ? RETURNING *",
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
