use async_trait::async_trait;
use dispatch_core::{
    traits::{HospitalRepository, PatientRepository},
    DispatchError, DispatchResult, Hospital, Patient,
};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::debug;

pub struct SqliteHospitalRepository {
    pool: SqlitePool,
}

impl SqliteHospitalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_hospital(row: &SqliteRow) -> DispatchResult<Hospital> {
        Ok(Hospital {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            number_of_ambulances: row.try_get("number_of_ambulances")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
        })
    }
}

#[async_trait]
impl HospitalRepository for SqliteHospitalRepository {
    async fn get_by_id(&self, id: i64) -> DispatchResult<Option<Hospital>> {
        let row = sqlx::query(
            "SELECT id, name, number_of_ambulances, latitude, longitude FROM hospitals WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DispatchError::Database)?;

        debug!("查询医院: {}", id);
        row.as_ref().map(Self::row_to_hospital).transpose()
    }
}

pub struct SqlitePatientRepository {
    pool: SqlitePool,
}

impl SqlitePatientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PatientRepository for SqlitePatientRepository {
    async fn get_by_id(&self, id: i64) -> DispatchResult<Option<Patient>> {
        let row = sqlx::query("SELECT id, first_name, last_name FROM patients WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DispatchError::Database)?;

        match row {
            Some(row) => Ok(Some(Patient {
                id: row.try_get("id")?,
                first_name: row.try_get("first_name")?,
                last_name: row.try_get("last_name")?,
            })),
            None => Ok(None),
        }
    }
}
