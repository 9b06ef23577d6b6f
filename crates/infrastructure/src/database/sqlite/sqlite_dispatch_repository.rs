use async_trait::async_trait;
use chrono::Utc;
use dispatch_core::{
    generate_incident_id, traits::DispatchRepository, Dispatch, DispatchError, DispatchFilter,
    DispatchResult, DispatchStatus,
};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::{debug, warn};

const DISPATCH_COLUMNS: &str = "id, incident_id, patient_id, hospital_id, ambulance_id, status, priority, \
     caller_name, caller_phone, incident_type, notes, pickup_latitude, pickup_longitude, \
     pickup_address_line1, pickup_address_line2, pickup_city, pickup_state, pickup_postal_code, \
     pickup_country, dropoff_hospital_id, dropoff_address, dropoff_latitude, dropoff_longitude, \
     request_time, dispatch_time, en_route_time, on_scene_time, depart_scene_time, \
     arrival_at_hospital_time, completion_time, canceled_time, created_at, updated_at";

const DEFAULT_LIST_LIMIT: i64 = 100;

pub struct SqliteDispatchRepository {
    pool: SqlitePool,
    incident_id_attempts: u32,
}

impl SqliteDispatchRepository {
    pub const DEFAULT_INCIDENT_ID_ATTEMPTS: u32 = 5;

    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            incident_id_attempts: Self::DEFAULT_INCIDENT_ID_ATTEMPTS,
        }
    }

    pub fn with_incident_id_attempts(mut self, attempts: u32) -> Self {
        self.incident_id_attempts = attempts.max(1);
        self
    }

    fn row_to_dispatch(row: &SqliteRow) -> DispatchResult<Dispatch> {
        Ok(Dispatch {
            id: row.try_get("id")?,
            incident_id: row.try_get("incident_id")?,
            patient_id: row.try_get("patient_id")?,
            hospital_id: row.try_get("hospital_id")?,
            ambulance_id: row.try_get("ambulance_id")?,
            status: row.try_get("status")?,
            priority: row.try_get("priority")?,
            caller_name: row.try_get("caller_name")?,
            caller_phone: row.try_get("caller_phone")?,
            incident_type: row.try_get("incident_type")?,
            notes: row.try_get("notes")?,
            pickup_latitude: row.try_get("pickup_latitude")?,
            pickup_longitude: row.try_get("pickup_longitude")?,
            pickup_address_line1: row.try_get("pickup_address_line1")?,
            pickup_address_line2: row.try_get("pickup_address_line2")?,
            pickup_city: row.try_get("pickup_city")?,
            pickup_state: row.try_get("pickup_state")?,
            pickup_postal_code: row.try_get("pickup_postal_code")?,
            pickup_country: row.try_get("pickup_country")?,
            dropoff_hospital_id: row.try_get("dropoff_hospital_id")?,
            dropoff_address: row.try_get("dropoff_address")?,
            dropoff_latitude: row.try_get("dropoff_latitude")?,
            dropoff_longitude: row.try_get("dropoff_longitude")?,
            request_time: row.try_get("request_time")?,
            dispatch_time: row.try_get("dispatch_time")?,
            en_route_time: row.try_get("en_route_time")?,
            on_scene_time: row.try_get("on_scene_time")?,
            depart_scene_time: row.try_get("depart_scene_time")?,
            arrival_at_hospital_time: row.try_get("arrival_at_hospital_time")?,
            completion_time: row.try_get("completion_time")?,
            canceled_time: row.try_get("canceled_time")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// 构造单条语句的条件插入：容量统计作为 WHERE 子查询，与插入同属一条语句
    fn conditional_insert(
        dispatch: &Dispatch,
        hospital_id: i64,
        capacity: i64,
        active_statuses: &[DispatchStatus],
    ) -> QueryBuilder<'static, Sqlite> {
        let mut builder = QueryBuilder::new(format!(
            "INSERT INTO ambulance_dispatches ({}) SELECT ",
            &DISPATCH_COLUMNS["id, ".len()..]
        ));

        let mut values = builder.separated(", ");
        values.push_bind(dispatch.incident_id.clone());
        values.push_bind(dispatch.patient_id);
        values.push_bind(hospital_id);
        values.push_bind(dispatch.ambulance_id);
        values.push_bind(dispatch.status);
        values.push_bind(dispatch.priority);
        values.push_bind(dispatch.caller_name.clone());
        values.push_bind(dispatch.caller_phone.clone());
        values.push_bind(dispatch.incident_type.clone());
        values.push_bind(dispatch.notes.clone());
        values.push_bind(dispatch.pickup_latitude);
        values.push_bind(dispatch.pickup_longitude);
        values.push_bind(dispatch.pickup_address_line1.clone());
        values.push_bind(dispatch.pickup_address_line2.clone());
        values.push_bind(dispatch.pickup_city.clone());
        values.push_bind(dispatch.pickup_state.clone());
        values.push_bind(dispatch.pickup_postal_code.clone());
        values.push_bind(dispatch.pickup_country.clone());
        values.push_bind(dispatch.dropoff_hospital_id);
        values.push_bind(dispatch.dropoff_address.clone());
        values.push_bind(dispatch.dropoff_latitude);
        values.push_bind(dispatch.dropoff_longitude);
        values.push_bind(dispatch.request_time);
        values.push_bind(dispatch.dispatch_time);
        values.push_bind(dispatch.en_route_time);
        values.push_bind(dispatch.on_scene_time);
        values.push_bind(dispatch.depart_scene_time);
        values.push_bind(dispatch.arrival_at_hospital_time);
        values.push_bind(dispatch.completion_time);
        values.push_bind(dispatch.canceled_time);
        values.push_bind(dispatch.created_at);
        values.push_bind(dispatch.updated_at);

        builder.push(" WHERE (SELECT COUNT(*) FROM ambulance_dispatches WHERE hospital_id = ");
        builder.push_bind(hospital_id);
        push_status_in(&mut builder, active_statuses);
        builder.push(") < ");
        builder.push_bind(capacity);
        builder
    }
}

/// 追加 `AND status IN (...)`
fn push_status_in(builder: &mut QueryBuilder<'static, Sqlite>, statuses: &[DispatchStatus]) {
    builder.push(" AND status IN (");
    let mut separated = builder.separated(", ");
    for status in statuses {
        separated.push_bind(*status);
    }
    builder.push(")");
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[async_trait]
impl DispatchRepository for SqliteDispatchRepository {
    async fn create_within_capacity(
        &self,
        dispatch: &Dispatch,
        capacity: i64,
        active_statuses: &[DispatchStatus],
    ) -> DispatchResult<Option<Dispatch>> {
        let hospital_id = dispatch
            .hospital_id
            .ok_or_else(|| DispatchError::Validation("调度记录缺少医院".to_string()))?;
        if active_statuses.is_empty() {
            return Err(DispatchError::Validation("占用容量的状态集合不能为空".to_string()));
        }

        let mut candidate = dispatch.clone();
        for attempt in 1..=self.incident_id_attempts {
            let result = Self::conditional_insert(&candidate, hospital_id, capacity, active_statuses)
                .build()
                .execute(&self.pool)
                .await;

            match result {
                Ok(result) if result.rows_affected() == 0 => {
                    debug!("医院 {} 车队容量已满 (容量 {})", hospital_id, capacity);
                    return Ok(None);
                }
                Ok(result) => {
                    candidate.id = result.last_insert_rowid();
                    debug!("创建调度记录成功: {} (ID: {})", candidate.incident_id, candidate.id);
                    return Ok(Some(candidate));
                }
                Err(err) if is_unique_violation(&err) => {
                    warn!(
                        "事件编号冲突: {} (第 {} 次尝试)，重新生成",
                        candidate.incident_id, attempt
                    );
                    candidate.incident_id = generate_incident_id(Utc::now());
                }
                Err(err) => return Err(DispatchError::Database(err)),
            }
        }

        Err(DispatchError::DatabaseOperation(format!(
            "连续 {} 次生成的事件编号均冲突",
            self.incident_id_attempts
        )))
    }

    async fn count_active(
        &self,
        hospital_id: i64,
        active_statuses: &[DispatchStatus],
    ) -> DispatchResult<i64> {
        if active_statuses.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<'static, Sqlite> = QueryBuilder::new(
            "SELECT COUNT(*) AS count FROM ambulance_dispatches WHERE hospital_id = ",
        );
        builder.push_bind(hospital_id);
        push_status_in(&mut builder, active_statuses);

        let row = builder
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(DispatchError::Database)?;

        Ok(row.try_get("count")?)
    }

    async fn get_by_incident_id(&self, incident_id: &str) -> DispatchResult<Option<Dispatch>> {
        let sql = format!("SELECT {DISPATCH_COLUMNS} FROM ambulance_dispatches WHERE incident_id = $1");
        let row = sqlx::query(&sql)
            .bind(incident_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DispatchError::Database)?;

        row.as_ref().map(Self::row_to_dispatch).transpose()
    }

    async fn list(&self, filter: &DispatchFilter) -> DispatchResult<Vec<Dispatch>> {
        let mut builder: QueryBuilder<'static, Sqlite> = QueryBuilder::new(format!(
            "SELECT {DISPATCH_COLUMNS} FROM ambulance_dispatches WHERE 1 = 1"
        ));
        if let Some(hospital_id) = filter.hospital_id {
            builder.push(" AND hospital_id = ").push_bind(hospital_id);
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status);
        }
        builder
            .push(" ORDER BY request_time DESC, id DESC LIMIT ")
            .push_bind(filter.limit.unwrap_or(DEFAULT_LIST_LIMIT))
            .push(" OFFSET ")
            .push_bind(filter.offset.unwrap_or(0));

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(DispatchError::Database)?;

        debug!("查询调度记录 {} 条", rows.len());
        rows.iter().map(Self::row_to_dispatch).collect()
    }

    async fn update(&self, dispatch: &Dispatch, expected: DispatchStatus) -> DispatchResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE ambulance_dispatches SET
                ambulance_id = $1,
                status = $2,
                notes = $3,
                dispatch_time = $4,
                en_route_time = $5,
                on_scene_time = $6,
                depart_scene_time = $7,
                arrival_at_hospital_time = $8,
                completion_time = $9,
                canceled_time = $10,
                updated_at = $11
            WHERE incident_id = $12 AND status = $13
            "#,
        )
        .bind(dispatch.ambulance_id)
        .bind(dispatch.status)
        .bind(&dispatch.notes)
        .bind(dispatch.dispatch_time)
        .bind(dispatch.en_route_time)
        .bind(dispatch.on_scene_time)
        .bind(dispatch.depart_scene_time)
        .bind(dispatch.arrival_at_hospital_time)
        .bind(dispatch.completion_time)
        .bind(dispatch.canceled_time)
        .bind(dispatch.updated_at)
        .bind(&dispatch.incident_id)
        .bind(expected)
        .execute(&self.pool)
        .await
        .map_err(DispatchError::Database)?;

        if result.rows_affected() == 0 {
            if self.get_by_incident_id(&dispatch.incident_id).await?.is_none() {
                return Err(DispatchError::DispatchNotFound {
                    incident_id: dispatch.incident_id.clone(),
                });
            }
            debug!("调度 {} 状态已不是 {}，放弃写入", dispatch.incident_id, expected);
            return Ok(false);
        }

        debug!("更新调度记录成功: {} -> {}", dispatch.incident_id, dispatch.status);
        Ok(true)
    }
}
