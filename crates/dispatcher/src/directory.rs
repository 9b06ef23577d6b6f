use std::sync::Arc;

use dispatch_core::{
    traits::{
        AmbulanceRepository, CommunityHealthWorkerRepository, DispatchRepository,
        HospitalRepository, PatientRepository,
    },
    Ambulance, AmbulanceStatus, ChwStatus, CommunityHealthWorker, DispatchError, DispatchResult,
    DispatchStatus, Hospital, HospitalCapacity, Patient,
};
use tracing::debug;

/// 资源目录
///
/// 救护车、社区卫生工作者、医院和患者的只读查询入口，
/// 外加医院在给定状态集合下的活跃调度计数。
#[derive(Clone)]
pub struct ResourceDirectory {
    hospitals: Arc<dyn HospitalRepository>,
    patients: Arc<dyn PatientRepository>,
    ambulances: Arc<dyn AmbulanceRepository>,
    chws: Arc<dyn CommunityHealthWorkerRepository>,
    dispatches: Arc<dyn DispatchRepository>,
}

impl ResourceDirectory {
    pub fn new(
        hospitals: Arc<dyn HospitalRepository>,
        patients: Arc<dyn PatientRepository>,
        ambulances: Arc<dyn AmbulanceRepository>,
        chws: Arc<dyn CommunityHealthWorkerRepository>,
        dispatches: Arc<dyn DispatchRepository>,
    ) -> Self {
        Self {
            hospitals,
            patients,
            ambulances,
            chws,
            dispatches,
        }
    }

    pub async fn hospital(&self, id: i64) -> DispatchResult<Hospital> {
        self.hospitals
            .get_by_id(id)
            .await?
            .ok_or(DispatchError::HospitalNotFound { id })
    }

    pub async fn patient(&self, id: i64) -> DispatchResult<Patient> {
        self.patients
            .get_by_id(id)
            .await?
            .ok_or(DispatchError::PatientNotFound { id })
    }

    pub async fn ambulance(&self, id: i64) -> DispatchResult<Ambulance> {
        self.ambulances
            .get_by_id(id)
            .await?
            .ok_or(DispatchError::AmbulanceNotFound { id })
    }

    pub async fn chw(&self, id: i64) -> DispatchResult<CommunityHealthWorker> {
        self.chws
            .get_by_id(id)
            .await?
            .ok_or(DispatchError::CommunityHealthWorkerNotFound { id })
    }

    pub async fn count_active_dispatches(
        &self,
        hospital_id: i64,
        active_statuses: &[DispatchStatus],
    ) -> DispatchResult<i64> {
        self.dispatches.count_active(hospital_id, active_statuses).await
    }

    /// 可用的社区卫生工作者，按ID升序
    pub async fn find_available_chws(
        &self,
        hospital_id: Option<i64>,
    ) -> DispatchResult<Vec<CommunityHealthWorker>> {
        let chws = self.chws.find_by_status(ChwStatus::Available, hospital_id).await?;
        debug!("可用社区卫生工作者 {} 名 (医院: {:?})", chws.len(), hospital_id);
        Ok(chws)
    }

    pub async fn find_ambulances_by_status(
        &self,
        status: AmbulanceStatus,
    ) -> DispatchResult<Vec<Ambulance>> {
        self.ambulances.find_by_status(status).await
    }

    /// 医院车队容量概况
    pub async fn hospital_capacity(
        &self,
        id: i64,
        active_statuses: &[DispatchStatus],
    ) -> DispatchResult<HospitalCapacity> {
        let hospital = self.hospital(id).await?;
        let active = self.count_active_dispatches(id, active_statuses).await?;
        Ok(HospitalCapacity {
            hospital_id: hospital.id,
            number_of_ambulances: hospital.number_of_ambulances,
            active_dispatches: active,
            available_slots: (hospital.number_of_ambulances - active).max(0),
        })
    }
}
