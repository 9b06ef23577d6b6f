use async_trait::async_trait;
use dispatch_core::{
    traits::AssignmentRepository, AssignmentFilter, AssignmentStatus, ChwStatus,
    CommunityHealthWorkerAssignment, DispatchError, DispatchResult,
};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

const ASSIGNMENT_COLUMNS: &str = "id, chw_id, patient_id, hospital_id, status, priority, incident_type, \
     notes, pickup_latitude, pickup_longitude, distance_km, assigned_at, started_at, completed_at, \
     canceled_at, updated_at";

const DEFAULT_LIST_LIMIT: i64 = 100;

pub struct SqliteAssignmentRepository {
    pool: SqlitePool,
}

impl SqliteAssignmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_assignment(row: &SqliteRow) -> DispatchResult<CommunityHealthWorkerAssignment> {
        Ok(CommunityHealthWorkerAssignment {
            id: row.try_get("id")?,
            chw_id: row.try_get("chw_id")?,
            patient_id: row.try_get("patient_id")?,
            hospital_id: row.try_get("hospital_id")?,
            status: row.try_get("status")?,
            priority: row.try_get("priority")?,
            incident_type: row.try_get("incident_type")?,
            notes: row.try_get("notes")?,
            pickup_latitude: row.try_get("pickup_latitude")?,
            pickup_longitude: row.try_get("pickup_longitude")?,
            distance_km: row.try_get("distance_km")?,
            assigned_at: row.try_get("assigned_at")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
            canceled_at: row.try_get("canceled_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// 按预期状态条件写入指派记录；记录存在但状态已变更时返回 `false`
    async fn write_assignment(
        conn: &mut SqliteConnection,
        assignment: &CommunityHealthWorkerAssignment,
        expected: AssignmentStatus,
    ) -> DispatchResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE chw_assignments SET
                status = $1,
                notes = $2,
                started_at = $3,
                completed_at = $4,
                canceled_at = $5,
                updated_at = $6
            WHERE id = $7 AND status = $8
            "#,
        )
        .bind(assignment.status)
        .bind(&assignment.notes)
        .bind(assignment.started_at)
        .bind(assignment.completed_at)
        .bind(assignment.canceled_at)
        .bind(assignment.updated_at)
        .bind(assignment.id)
        .bind(expected)
        .execute(&mut *conn)
        .await
        .map_err(DispatchError::Database)?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        let exists = sqlx::query("SELECT 1 FROM chw_assignments WHERE id = $1")
            .bind(assignment.id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(DispatchError::Database)?;
        match exists {
            Some(_) => {
                debug!("指派 {} 状态已不是 {}，放弃写入", assignment.id, expected);
                Ok(false)
            }
            None => Err(DispatchError::AssignmentNotFound { id: assignment.id }),
        }
    }
}

#[async_trait]
impl AssignmentRepository for SqliteAssignmentRepository {
    async fn create_claiming_worker(
        &self,
        assignment: &CommunityHealthWorkerAssignment,
    ) -> DispatchResult<Option<CommunityHealthWorkerAssignment>> {
        // 以 UPDATE 开启事务，占用与插入同属一个写事务
        let mut tx = self.pool.begin().await.map_err(DispatchError::Database)?;

        let claimed = sqlx::query(
            "UPDATE community_health_workers SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4",
        )
        .bind(ChwStatus::Busy)
        .bind(assignment.assigned_at)
        .bind(assignment.chw_id)
        .bind(ChwStatus::Available)
        .execute(&mut *tx)
        .await
        .map_err(DispatchError::Database)?;

        if claimed.rows_affected() == 0 {
            tx.rollback().await.map_err(DispatchError::Database)?;
            debug!("社区卫生工作者 {} 已不可用，放弃指派", assignment.chw_id);
            return Ok(None);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO chw_assignments (
                chw_id, patient_id, hospital_id, status, priority, incident_type, notes,
                pickup_latitude, pickup_longitude, distance_km, assigned_at, started_at,
                completed_at, canceled_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(assignment.chw_id)
        .bind(assignment.patient_id)
        .bind(assignment.hospital_id)
        .bind(assignment.status)
        .bind(&assignment.priority)
        .bind(&assignment.incident_type)
        .bind(&assignment.notes)
        .bind(assignment.pickup_latitude)
        .bind(assignment.pickup_longitude)
        .bind(assignment.distance_km)
        .bind(assignment.assigned_at)
        .bind(assignment.started_at)
        .bind(assignment.completed_at)
        .bind(assignment.canceled_at)
        .bind(assignment.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(DispatchError::Database)?;

        tx.commit().await.map_err(DispatchError::Database)?;

        let mut created = assignment.clone();
        created.id = inserted.last_insert_rowid();
        debug!(
            "创建社区卫生工作者指派成功: ID {} -> CHW {}",
            created.id, created.chw_id
        );
        Ok(Some(created))
    }

    async fn get_by_id(&self, id: i64) -> DispatchResult<Option<CommunityHealthWorkerAssignment>> {
        let sql = format!("SELECT {ASSIGNMENT_COLUMNS} FROM chw_assignments WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DispatchError::Database)?;

        row.as_ref().map(Self::row_to_assignment).transpose()
    }

    async fn list(
        &self,
        filter: &AssignmentFilter,
    ) -> DispatchResult<Vec<CommunityHealthWorkerAssignment>> {
        let mut builder: QueryBuilder<'static, Sqlite> = QueryBuilder::new(format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM chw_assignments WHERE 1 = 1"
        ));
        if let Some(chw_id) = filter.chw_id {
            builder.push(" AND chw_id = ").push_bind(chw_id);
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status);
        }
        builder
            .push(" ORDER BY assigned_at DESC, id DESC LIMIT ")
            .push_bind(filter.limit.unwrap_or(DEFAULT_LIST_LIMIT))
            .push(" OFFSET ")
            .push_bind(filter.offset.unwrap_or(0));

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(DispatchError::Database)?;

        rows.iter().map(Self::row_to_assignment).collect()
    }

    async fn update(
        &self,
        assignment: &CommunityHealthWorkerAssignment,
        expected: AssignmentStatus,
    ) -> DispatchResult<bool> {
        let mut conn = self.pool.acquire().await.map_err(DispatchError::Database)?;
        let written = Self::write_assignment(&mut conn, assignment, expected).await?;
        if written {
            debug!("更新指派记录成功: {} -> {}", assignment.id, assignment.status);
        }
        Ok(written)
    }

    async fn update_releasing_worker(
        &self,
        assignment: &CommunityHealthWorkerAssignment,
        expected: AssignmentStatus,
    ) -> DispatchResult<bool> {
        let mut tx = self.pool.begin().await.map_err(DispatchError::Database)?;

        if !Self::write_assignment(&mut tx, assignment, expected).await? {
            tx.rollback().await.map_err(DispatchError::Database)?;
            return Ok(false);
        }

        sqlx::query(
            "UPDATE community_health_workers SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4",
        )
        .bind(ChwStatus::Available)
        .bind(assignment.updated_at)
        .bind(assignment.chw_id)
        .bind(ChwStatus::Busy)
        .execute(&mut *tx)
        .await
        .map_err(DispatchError::Database)?;

        tx.commit().await.map_err(DispatchError::Database)?;

        debug!(
            "指派记录 {} 已终结为 {}，释放社区卫生工作者 {}",
            assignment.id, assignment.status, assignment.chw_id
        );
        Ok(true)
    }
}
