//! 内存存储
//!
//! 实现全部仓储接口，供嵌入式运行和测试使用。所有表由同一把互斥锁保护，
//! 容量判断、占用工作者等条件写入在持锁期间一次完成。

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use dispatch_core::{
    traits::{
        AmbulanceRepository, AssignmentRepository, CommunityHealthWorkerRepository,
        DispatchRepository, HealthCheck, HospitalRepository, PatientRepository,
    },
    Ambulance, AmbulanceStatus, AssignmentFilter, AssignmentStatus, ChwStatus,
    CommunityHealthWorker, CommunityHealthWorkerAssignment, Dispatch, DispatchError,
    DispatchFilter, DispatchResult, DispatchStatus, Hospital, Patient,
};
use tracing::debug;

const DEFAULT_LIST_LIMIT: i64 = 100;

#[derive(Debug, Default)]
struct Tables {
    hospitals: BTreeMap<i64, Hospital>,
    patients: BTreeMap<i64, Patient>,
    ambulances: BTreeMap<i64, Ambulance>,
    chws: BTreeMap<i64, CommunityHealthWorker>,
    dispatches: BTreeMap<i64, Dispatch>,
    assignments: BTreeMap<i64, CommunityHealthWorkerAssignment>,
    next_dispatch_id: i64,
    next_assignment_id: i64,
}

impl Tables {
    fn count_active(&self, hospital_id: i64, active_statuses: &[DispatchStatus]) -> i64 {
        self.dispatches
            .values()
            .filter(|d| d.hospital_id == Some(hospital_id) && active_statuses.contains(&d.status))
            .count() as i64
    }

    fn write_assignment(
        &mut self,
        assignment: &CommunityHealthWorkerAssignment,
        expected: AssignmentStatus,
    ) -> DispatchResult<bool> {
        let stored = self
            .assignments
            .get_mut(&assignment.id)
            .ok_or(DispatchError::AssignmentNotFound { id: assignment.id })?;
        if stored.status != expected {
            debug!(
                "指派 {} 已是 {}，放弃基于 {} 的写入",
                stored.id, stored.status, expected
            );
            return Ok(false);
        }
        *stored = assignment.clone();
        Ok(true)
    }
}

/// 内存仓储
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert_hospital(&self, hospital: Hospital) {
        self.lock().hospitals.insert(hospital.id, hospital);
    }

    pub fn insert_patient(&self, patient: Patient) {
        self.lock().patients.insert(patient.id, patient);
    }

    pub fn insert_ambulance(&self, ambulance: Ambulance) {
        self.lock().ambulances.insert(ambulance.id, ambulance);
    }

    pub fn insert_chw(&self, chw: CommunityHealthWorker) {
        self.lock().chws.insert(chw.id, chw);
    }

    /// 直接修改工作者状态（模拟外部管理界面的操作）
    pub fn set_chw_status(&self, id: i64, status: ChwStatus) -> DispatchResult<()> {
        let mut tables = self.lock();
        let chw = tables
            .chws
            .get_mut(&id)
            .ok_or(DispatchError::CommunityHealthWorkerNotFound { id })?;
        chw.status = status;
        chw.updated_at = Utc::now();
        Ok(())
    }

    pub fn dispatch_count(&self) -> usize {
        self.lock().dispatches.len()
    }

    pub fn assignment_count(&self) -> usize {
        self.lock().assignments.len()
    }
}

#[async_trait]
impl HealthCheck for InMemoryStore {
    async fn check(&self) -> DispatchResult<()> {
        Ok(())
    }
}

#[async_trait]
impl HospitalRepository for InMemoryStore {
    async fn get_by_id(&self, id: i64) -> DispatchResult<Option<Hospital>> {
        Ok(self.lock().hospitals.get(&id).cloned())
    }
}

#[async_trait]
impl PatientRepository for InMemoryStore {
    async fn get_by_id(&self, id: i64) -> DispatchResult<Option<Patient>> {
        Ok(self.lock().patients.get(&id).cloned())
    }
}

#[async_trait]
impl AmbulanceRepository for InMemoryStore {
    async fn get_by_id(&self, id: i64) -> DispatchResult<Option<Ambulance>> {
        Ok(self.lock().ambulances.get(&id).cloned())
    }

    async fn find_by_status(&self, status: AmbulanceStatus) -> DispatchResult<Vec<Ambulance>> {
        Ok(self
            .lock()
            .ambulances
            .values()
            .filter(|a| a.status == status)
            .cloned()
            .collect())
    }

    async fn compare_and_set_status(
        &self,
        id: i64,
        expected: AmbulanceStatus,
        new_status: AmbulanceStatus,
    ) -> DispatchResult<bool> {
        let mut tables = self.lock();
        match tables.ambulances.get_mut(&id) {
            Some(ambulance) if ambulance.status == expected => {
                ambulance.status = new_status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl CommunityHealthWorkerRepository for InMemoryStore {
    async fn get_by_id(&self, id: i64) -> DispatchResult<Option<CommunityHealthWorker>> {
        Ok(self.lock().chws.get(&id).cloned())
    }

    async fn find_by_status(
        &self,
        status: ChwStatus,
        hospital_id: Option<i64>,
    ) -> DispatchResult<Vec<CommunityHealthWorker>> {
        Ok(self
            .lock()
            .chws
            .values()
            .filter(|c| c.status == status)
            .filter(|c| hospital_id.is_none() || c.hospital_id == hospital_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DispatchRepository for InMemoryStore {
    async fn create_within_capacity(
        &self,
        dispatch: &Dispatch,
        capacity: i64,
        active_statuses: &[DispatchStatus],
    ) -> DispatchResult<Option<Dispatch>> {
        let hospital_id = dispatch
            .hospital_id
            .ok_or_else(|| DispatchError::Validation("调度记录缺少医院".to_string()))?;

        let mut tables = self.lock();
        if tables.count_active(hospital_id, active_statuses) >= capacity {
            debug!("医院 {} 车队容量已满 (容量 {})", hospital_id, capacity);
            return Ok(None);
        }
        if tables
            .dispatches
            .values()
            .any(|d| d.incident_id == dispatch.incident_id)
        {
            return Err(DispatchError::DatabaseOperation(format!(
                "事件编号重复: {}",
                dispatch.incident_id
            )));
        }

        tables.next_dispatch_id += 1;
        let mut created = dispatch.clone();
        created.id = tables.next_dispatch_id;
        tables.dispatches.insert(created.id, created.clone());
        Ok(Some(created))
    }

    async fn count_active(
        &self,
        hospital_id: i64,
        active_statuses: &[DispatchStatus],
    ) -> DispatchResult<i64> {
        Ok(self.lock().count_active(hospital_id, active_statuses))
    }

    async fn get_by_incident_id(&self, incident_id: &str) -> DispatchResult<Option<Dispatch>> {
        Ok(self
            .lock()
            .dispatches
            .values()
            .find(|d| d.incident_id == incident_id)
            .cloned())
    }

    async fn list(&self, filter: &DispatchFilter) -> DispatchResult<Vec<Dispatch>> {
        let tables = self.lock();
        let mut dispatches: Vec<Dispatch> = tables
            .dispatches
            .values()
            .filter(|d| filter.hospital_id.is_none() || d.hospital_id == filter.hospital_id)
            .filter(|d| filter.status.map_or(true, |status| d.status == status))
            .cloned()
            .collect();

        dispatches.sort_by(|a, b| b.request_time.cmp(&a.request_time).then(b.id.cmp(&a.id)));
        Ok(paginate(dispatches, filter.limit, filter.offset))
    }

    async fn update(&self, dispatch: &Dispatch, expected: DispatchStatus) -> DispatchResult<bool> {
        let mut tables = self.lock();
        let stored = tables
            .dispatches
            .values_mut()
            .find(|d| d.incident_id == dispatch.incident_id)
            .ok_or_else(|| DispatchError::DispatchNotFound {
                incident_id: dispatch.incident_id.clone(),
            })?;

        if stored.status != expected {
            debug!(
                "调度 {} 已是 {}，放弃基于 {} 的写入",
                stored.incident_id, stored.status, expected
            );
            return Ok(false);
        }

        let id = stored.id;
        *stored = dispatch.clone();
        stored.id = id;
        Ok(true)
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryStore {
    async fn create_claiming_worker(
        &self,
        assignment: &CommunityHealthWorkerAssignment,
    ) -> DispatchResult<Option<CommunityHealthWorkerAssignment>> {
        let mut tables = self.lock();
        match tables.chws.get_mut(&assignment.chw_id) {
            Some(chw) if chw.status == ChwStatus::Available => {
                chw.status = ChwStatus::Busy;
                chw.updated_at = assignment.assigned_at;
            }
            _ => return Ok(None),
        }

        tables.next_assignment_id += 1;
        let mut created = assignment.clone();
        created.id = tables.next_assignment_id;
        tables.assignments.insert(created.id, created.clone());
        Ok(Some(created))
    }

    async fn get_by_id(&self, id: i64) -> DispatchResult<Option<CommunityHealthWorkerAssignment>> {
        Ok(self.lock().assignments.get(&id).cloned())
    }

    async fn list(
        &self,
        filter: &AssignmentFilter,
    ) -> DispatchResult<Vec<CommunityHealthWorkerAssignment>> {
        let tables = self.lock();
        let mut assignments: Vec<CommunityHealthWorkerAssignment> = tables
            .assignments
            .values()
            .filter(|a| filter.chw_id.map_or(true, |chw_id| a.chw_id == chw_id))
            .filter(|a| filter.status.map_or(true, |status| a.status == status))
            .cloned()
            .collect();

        assignments.sort_by(|a, b| b.assigned_at.cmp(&a.assigned_at).then(b.id.cmp(&a.id)));
        Ok(paginate(assignments, filter.limit, filter.offset))
    }

    async fn update(
        &self,
        assignment: &CommunityHealthWorkerAssignment,
        expected: AssignmentStatus,
    ) -> DispatchResult<bool> {
        self.lock().write_assignment(assignment, expected)
    }

    async fn update_releasing_worker(
        &self,
        assignment: &CommunityHealthWorkerAssignment,
        expected: AssignmentStatus,
    ) -> DispatchResult<bool> {
        let mut tables = self.lock();
        if !tables.write_assignment(assignment, expected)? {
            return Ok(false);
        }

        if let Some(chw) = tables.chws.get_mut(&assignment.chw_id) {
            if chw.status == ChwStatus::Busy {
                chw.status = ChwStatus::Available;
                chw.updated_at = assignment.updated_at;
            }
        }
        Ok(true)
    }
}

fn paginate<T>(items: Vec<T>, limit: Option<i64>, offset: Option<i64>) -> Vec<T> {
    let offset = offset.unwrap_or(0).max(0) as usize;
    let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).max(0) as usize;
    items.into_iter().skip(offset).take(limit).collect()
}
