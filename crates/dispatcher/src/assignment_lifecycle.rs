use std::sync::Arc;

use chrono::Utc;
use dispatch_core::{
    traits::{AssignmentRepository, ChwCandidate},
    AssignmentEvent, AssignmentFilter, AssistanceRequest, CommunityHealthWorkerAssignment,
    DispatchError, DispatchResult, GeoPoint,
};
use tracing::{info, warn};

use crate::metrics;

/// 社区卫生工作者指派生命周期管理
pub struct AssignmentLifecycleManager {
    assignments: Arc<dyn AssignmentRepository>,
}

impl AssignmentLifecycleManager {
    pub fn new(assignments: Arc<dyn AssignmentRepository>) -> Self {
        Self { assignments }
    }

    /// 占用候选工作者并创建 `ASSIGNED` 指派记录
    ///
    /// 工作者已被其他请求占用时返回 `None`。
    pub async fn assign(
        &self,
        request: &AssistanceRequest,
        pickup: GeoPoint,
        candidate: &ChwCandidate,
    ) -> DispatchResult<Option<CommunityHealthWorkerAssignment>> {
        let draft = CommunityHealthWorkerAssignment::from_request(
            request,
            candidate.chw.id,
            pickup,
            candidate.distance_km,
        );

        let created = self.assignments.create_claiming_worker(&draft).await?;
        if let Some(assignment) = &created {
            metrics::record_transition("chw_assignment", assignment.status.as_str());
            info!(
                "指派社区卫生工作者 {} (指派ID: {}, 距离: {:.2} km)",
                assignment.chw_id, assignment.id, assignment.distance_km
            );
        }
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> DispatchResult<CommunityHealthWorkerAssignment> {
        self.assignments
            .get_by_id(id)
            .await?
            .ok_or(DispatchError::AssignmentNotFound { id })
    }

    pub async fn list(
        &self,
        filter: &AssignmentFilter,
    ) -> DispatchResult<Vec<CommunityHealthWorkerAssignment>> {
        self.assignments.list(filter).await
    }

    pub async fn start(&self, id: i64) -> DispatchResult<CommunityHealthWorkerAssignment> {
        self.transition(id, AssignmentEvent::Start).await
    }

    pub async fn complete(&self, id: i64) -> DispatchResult<CommunityHealthWorkerAssignment> {
        self.transition(id, AssignmentEvent::Complete).await
    }

    pub async fn cancel(&self, id: i64) -> DispatchResult<CommunityHealthWorkerAssignment> {
        self.transition(id, AssignmentEvent::Cancel).await
    }

    async fn transition(
        &self,
        id: i64,
        event: AssignmentEvent,
    ) -> DispatchResult<CommunityHealthWorkerAssignment> {
        let mut assignment = self.get(id).await?;
        let from = assignment.status;
        assignment.apply_event(event, Utc::now())?;

        let written = if assignment.releases_worker() {
            self.assignments
                .update_releasing_worker(&assignment, from)
                .await?
        } else {
            self.assignments.update(&assignment, from).await?
        };
        if !written {
            return Err(self.stale_transition(id, event).await);
        }

        metrics::record_transition("chw_assignment", assignment.status.as_str());
        info!(
            "指派 {} 状态变更: {} -> {} (社区卫生工作者 {})",
            assignment.id, from, assignment.status, assignment.chw_id
        );
        Ok(assignment)
    }

    /// 读取期间记录已被其他操作改变，按当前状态报告冲突
    async fn stale_transition(&self, id: i64, event: AssignmentEvent) -> DispatchError {
        metrics::record_stale_transition("chw_assignment");
        let current = match self.get(id).await {
            Ok(current) => current,
            Err(e) => return e,
        };
        warn!(
            "指派 {} 已被并发变更为 {}，{} 操作未生效",
            id, current.status, event
        );
        DispatchError::InvalidTransition {
            entity: "社区卫生工作者指派",
            from: current.status.to_string(),
            event: event.to_string(),
        }
    }
}
