use std::sync::Arc;

use chrono::Utc;
use dispatch_core::{
    traits::{AmbulanceRepository, DispatchRepository},
    AmbulanceStatus, AssistanceRequest, Dispatch, DispatchError, DispatchEvent, DispatchFilter,
    DispatchResult, DispatchStatus, GeoPoint, Hospital,
};
use tracing::{debug, info, warn};

use crate::metrics;

/// 救护车调度生命周期管理
///
/// 负责调度记录的创建和状态流转，并在 `DISPATCH` 时占用救护车、
/// 在终结时释放救护车。
pub struct DispatchLifecycleManager {
    dispatches: Arc<dyn DispatchRepository>,
    ambulances: Arc<dyn AmbulanceRepository>,
    active_statuses: Vec<DispatchStatus>,
}

impl DispatchLifecycleManager {
    pub fn new(
        dispatches: Arc<dyn DispatchRepository>,
        ambulances: Arc<dyn AmbulanceRepository>,
        active_statuses: Vec<DispatchStatus>,
    ) -> Self {
        Self {
            dispatches,
            ambulances,
            active_statuses,
        }
    }

    pub fn active_statuses(&self) -> &[DispatchStatus] {
        &self.active_statuses
    }

    /// 在医院车队容量内创建 `REQUESTED` 调度记录
    ///
    /// 容量已满时返回 `None`，不写入任何数据。
    pub async fn create(
        &self,
        request: &AssistanceRequest,
        pickup: GeoPoint,
        hospital: &Hospital,
    ) -> DispatchResult<Option<Dispatch>> {
        let draft = Dispatch::from_request(
            request,
            pickup.latitude,
            pickup.longitude,
            Some(hospital.id),
        );

        let created = self
            .dispatches
            .create_within_capacity(&draft, hospital.number_of_ambulances, &self.active_statuses)
            .await?;

        if let Some(dispatch) = &created {
            metrics::record_transition("dispatch", dispatch.status.as_str());
            info!(
                "创建救护车调度 {} (医院: {}, 优先级: {})",
                dispatch.incident_id, hospital.id, dispatch.priority
            );
        }
        Ok(created)
    }

    pub async fn get(&self, incident_id: &str) -> DispatchResult<Dispatch> {
        self.dispatches
            .get_by_incident_id(incident_id)
            .await?
            .ok_or_else(|| DispatchError::DispatchNotFound {
                incident_id: incident_id.to_string(),
            })
    }

    pub async fn list(&self, filter: &DispatchFilter) -> DispatchResult<Vec<Dispatch>> {
        self.dispatches.list(filter).await
    }

    /// 执行调度事件
    ///
    /// `DISPATCH` 必须提供 `ambulance_id`，救护车需属于调度所在医院并处于 `AVAILABLE`。
    /// `COMPLETE` 和 `CANCEL` 释放调度持有的救护车。
    /// 读取后调度状态被并发修改时返回 [`DispatchError::InvalidTransition`]，
    /// 本次占用的救护车会被归还。
    pub async fn apply_event(
        &self,
        incident_id: &str,
        event: DispatchEvent,
        ambulance_id: Option<i64>,
    ) -> DispatchResult<Dispatch> {
        let mut dispatch = self.get(incident_id).await?;
        let held_ambulance = dispatch
            .holds_ambulance()
            .then_some(dispatch.ambulance_id)
            .flatten();
        let from = dispatch.status;

        dispatch.apply_event(event, Utc::now())?;

        let claimed = if event == DispatchEvent::Dispatch {
            let ambulance_id = ambulance_id.ok_or_else(|| {
                DispatchError::Validation("DISPATCH 事件需要提供 ambulance_id".to_string())
            })?;
            self.claim_ambulance(&dispatch, ambulance_id).await?;
            dispatch.ambulance_id = Some(ambulance_id);
            Some(ambulance_id)
        } else {
            if ambulance_id.is_some() {
                debug!("事件 {} 忽略 ambulance_id 参数", event);
            }
            None
        };

        let written = match self.dispatches.update(&dispatch, from).await {
            Ok(written) => written,
            Err(err) => {
                if let Some(ambulance_id) = claimed {
                    self.release_ambulance(ambulance_id).await;
                }
                return Err(err);
            }
        };
        if !written {
            if let Some(ambulance_id) = claimed {
                self.release_ambulance(ambulance_id).await;
            }
            return Err(self.stale_transition(incident_id, event).await);
        }

        if dispatch.status.is_terminal() {
            if let Some(ambulance_id) = held_ambulance {
                self.release_ambulance(ambulance_id).await;
            }
        }

        metrics::record_transition("dispatch", dispatch.status.as_str());
        info!(
            "调度 {} 状态变更: {} -> {} ({})",
            dispatch.incident_id, from, dispatch.status, event
        );
        Ok(dispatch)
    }

    /// 读取期间调度已被其他操作改变，按当前状态报告冲突
    async fn stale_transition(&self, incident_id: &str, event: DispatchEvent) -> DispatchError {
        metrics::record_stale_transition("dispatch");
        let current = match self.get(incident_id).await {
            Ok(current) => current,
            Err(e) => return e,
        };
        warn!(
            "调度 {} 已被并发变更为 {}，{} 事件未生效",
            incident_id, current.status, event
        );
        DispatchError::InvalidTransition {
            entity: "救护车调度",
            from: current.status.to_string(),
            event: event.to_string(),
        }
    }

    async fn claim_ambulance(&self, dispatch: &Dispatch, ambulance_id: i64) -> DispatchResult<()> {
        let ambulance = self
            .ambulances
            .get_by_id(ambulance_id)
            .await?
            .ok_or(DispatchError::AmbulanceNotFound { id: ambulance_id })?;

        if let Some(hospital_id) = dispatch.hospital_id {
            if ambulance.hospital_id != hospital_id {
                return Err(DispatchError::ResourceUnavailable(format!(
                    "救护车 {} 不属于医院 {}",
                    ambulance.vehicle_number, hospital_id
                )));
            }
        }

        let claimed = self
            .ambulances
            .compare_and_set_status(ambulance_id, AmbulanceStatus::Available, AmbulanceStatus::OnCall)
            .await?;
        if !claimed {
            metrics::record_claim_conflict("ambulance");
            warn!(
                "救护车 {} 当前状态不可派出，调度 {} 未变更",
                ambulance.vehicle_number, dispatch.incident_id
            );
            return Err(DispatchError::ResourceUnavailable(format!(
                "救护车 {} 当前不可用",
                ambulance.vehicle_number
            )));
        }

        debug!("救护车 {} 已占用", ambulance_id);
        Ok(())
    }

    /// 释放救护车；失败只记录日志，调度状态已经落库
    async fn release_ambulance(&self, ambulance_id: i64) {
        match self
            .ambulances
            .compare_and_set_status(ambulance_id, AmbulanceStatus::OnCall, AmbulanceStatus::Available)
            .await
        {
            Ok(true) => debug!("救护车 {} 已释放", ambulance_id),
            Ok(false) => warn!("救护车 {} 不处于 ON_CALL，跳过释放", ambulance_id),
            Err(e) => warn!("释放救护车 {} 失败: {}", ambulance_id, e),
        }
    }
}
