use async_trait::async_trait;
use dispatch_core::{
    traits::CommunityHealthWorkerRepository, ChwStatus, CommunityHealthWorker, DispatchError,
    DispatchResult,
};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::debug;

const CHW_COLUMNS: &str = "id, name, phone, hospital_id, status, latitude, longitude, updated_at";

pub struct SqliteChwRepository {
    pool: SqlitePool,
}

impl SqliteChwRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub(crate) fn row_to_chw(row: &SqliteRow) -> DispatchResult<CommunityHealthWorker> {
        Ok(CommunityHealthWorker {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            phone: row.try_get("phone")?,
            hospital_id: row.try_get("hospital_id")?,
            status: row.try_get("status")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl CommunityHealthWorkerRepository for SqliteChwRepository {
    async fn get_by_id(&self, id: i64) -> DispatchResult<Option<CommunityHealthWorker>> {
        let sql = format!("SELECT {CHW_COLUMNS} FROM community_health_workers WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DispatchError::Database)?;

        row.as_ref().map(Self::row_to_chw).transpose()
    }

    async fn find_by_status(
        &self,
        status: ChwStatus,
        hospital_id: Option<i64>,
    ) -> DispatchResult<Vec<CommunityHealthWorker>> {
        let rows = match hospital_id {
            Some(hospital_id) => {
                let sql = format!(
                    "SELECT {CHW_COLUMNS} FROM community_health_workers WHERE status = $1 AND hospital_id = $2 ORDER BY id"
                );
                sqlx::query(&sql)
                    .bind(status)
                    .bind(hospital_id)
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                let sql = format!(
                    "SELECT {CHW_COLUMNS} FROM community_health_workers WHERE status = $1 ORDER BY id"
                );
                sqlx::query(&sql).bind(status).fetch_all(&self.pool).await
            }
        }
        .map_err(DispatchError::Database)?;

        debug!(
            "查询社区卫生工作者: status={}, hospital_id={:?}, 共 {} 名",
            status,
            hospital_id,
            rows.len()
        );
        rows.iter().map(Self::row_to_chw).collect()
    }
}
