use async_trait::async_trait;
use chrono::Utc;
use dispatch_core::{
    traits::AmbulanceRepository, Ambulance, AmbulanceStatus, DispatchError, DispatchResult,
};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::debug;

pub struct SqliteAmbulanceRepository {
    pool: SqlitePool,
}

impl SqliteAmbulanceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_ambulance(row: &SqliteRow) -> DispatchResult<Ambulance> {
        Ok(Ambulance {
            id: row.try_get("id")?,
            hospital_id: row.try_get("hospital_id")?,
            vehicle_number: row.try_get("vehicle_number")?,
            status: row.try_get("status")?,
        })
    }
}

#[async_trait]
impl AmbulanceRepository for SqliteAmbulanceRepository {
    async fn get_by_id(&self, id: i64) -> DispatchResult<Option<Ambulance>> {
        let row = sqlx::query(
            "SELECT id, hospital_id, vehicle_number, status FROM ambulances WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DispatchError::Database)?;

        row.as_ref().map(Self::row_to_ambulance).transpose()
    }

    async fn find_by_status(&self, status: AmbulanceStatus) -> DispatchResult<Vec<Ambulance>> {
        let rows = sqlx::query(
            "SELECT id, hospital_id, vehicle_number, status FROM ambulances WHERE status = $1 ORDER BY id",
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(DispatchError::Database)?;

        debug!("按状态 {} 查询到 {} 辆救护车", status, rows.len());
        rows.iter().map(Self::row_to_ambulance).collect()
    }

    async fn compare_and_set_status(
        &self,
        id: i64,
        expected: AmbulanceStatus,
        new_status: AmbulanceStatus,
    ) -> DispatchResult<bool> {
        let result = sqlx::query(
            "UPDATE ambulances SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4",
        )
        .bind(new_status)
        .bind(Utc::now())
        .bind(id)
        .bind(expected)
        .execute(&self.pool)
        .await
        .map_err(DispatchError::Database)?;

        let swapped = result.rows_affected() == 1;
        debug!(
            "救护车 {} 状态 {} -> {}: {}",
            id,
            expected,
            new_status,
            if swapped { "成功" } else { "未变更" }
        );
        Ok(swapped)
    }
}
