use std::sync::Arc;

use dispatch_core::{
    config::AllocationConfig, AssistanceRequest, AssistanceResult, DispatchError,
    DispatchResult, GeoPoint,
};
use tracing::{debug, info, warn};

use crate::assignment_lifecycle::AssignmentLifecycleManager;
use crate::directory::ResourceDirectory;
use crate::dispatch_lifecycle::DispatchLifecycleManager;
use crate::locator::ChwLocator;
use crate::metrics;

/// 资源分配决策引擎
///
/// 对每个急救请求做一次决策：医院车队有空余时创建救护车调度，
/// 否则指派距离最近的可用社区卫生工作者。
pub struct AllocationEngine {
    directory: ResourceDirectory,
    locator: ChwLocator,
    dispatches: Arc<DispatchLifecycleManager>,
    assignments: Arc<AssignmentLifecycleManager>,
    config: AllocationConfig,
}

impl AllocationEngine {
    pub fn new(
        directory: ResourceDirectory,
        locator: ChwLocator,
        dispatches: Arc<DispatchLifecycleManager>,
        assignments: Arc<AssignmentLifecycleManager>,
        config: AllocationConfig,
    ) -> Self {
        Self {
            directory,
            locator,
            dispatches,
            assignments,
            config,
        }
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    pub async fn request_assistance(
        &self,
        request: &AssistanceRequest,
    ) -> DispatchResult<AssistanceResult> {
        let result = self.allocate(request).await;
        match &result {
            Ok(outcome) => metrics::record_assistance(outcome.mode),
            Err(e) => {
                metrics::record_assistance_failure(e);
                warn!("急救请求处理失败: {}", e);
            }
        }
        result
    }

    async fn allocate(&self, request: &AssistanceRequest) -> DispatchResult<AssistanceResult> {
        let pickup = request.pickup_point()?;

        if let Some(patient_id) = request.patient_id {
            self.directory.patient(patient_id).await?;
        }
        let hospital = match request.hospital_id {
            Some(id) => Some(self.directory.hospital(id).await?),
            None => None,
        };

        match hospital.as_ref() {
            Some(hospital) if hospital.has_fleet() => {
                if let Some(dispatch) = self.dispatches.create(request, pickup, hospital).await? {
                    return Ok(AssistanceResult::from_dispatch(&dispatch));
                }
                info!(
                    "医院 {} 的 {} 辆救护车均在执勤，转为指派社区卫生工作者",
                    hospital.id, hospital.number_of_ambulances
                );
            }
            Some(hospital) => debug!("医院 {} 没有救护车，直接指派社区卫生工作者", hospital.id),
            None => debug!("请求未指定医院，直接指派社区卫生工作者"),
        }

        self.assign_nearest_chw(request, pickup).await
    }

    /// 指派最近的社区卫生工作者，占用冲突时排除该工作者后重新选择
    async fn assign_nearest_chw(
        &self,
        request: &AssistanceRequest,
        pickup: GeoPoint,
    ) -> DispatchResult<AssistanceResult> {
        let mut excluded = Vec::new();

        for attempt in 1..=self.config.max_claim_attempts {
            let candidate = self
                .locator
                .find_nearest_excluding(
                    pickup,
                    request.hospital_id,
                    self.config.default_search_radius_km,
                    &excluded,
                )
                .await?;

            if let Some(assignment) = self.assignments.assign(request, pickup, &candidate).await? {
                return Ok(AssistanceResult::from_assignment(&assignment));
            }

            metrics::record_claim_conflict("chw");
            warn!(
                "社区卫生工作者 {} 已被占用 (第 {}/{} 次尝试)",
                candidate.chw.id, attempt, self.config.max_claim_attempts
            );
            excluded.push(candidate.chw.id);
        }

        Err(DispatchError::NoAvailableCommunityHealthWorker)
    }
}
