use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AssistanceRequest;
use crate::errors::{DispatchError, DispatchResult};
use crate::geo::GeoPoint;

/// 社区卫生工作者指派状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    Assigned,
    InProgress,
    Completed,
    Canceled,
}

/// 指派状态流转事件
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentEvent {
    Start,
    Complete,
    Cancel,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Assigned => "ASSIGNED",
            AssignmentStatus::InProgress => "IN_PROGRESS",
            AssignmentStatus::Completed => "COMPLETED",
            AssignmentStatus::Canceled => "CANCELED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AssignmentStatus::Completed | AssignmentStatus::Canceled)
    }

    pub fn apply(self, event: AssignmentEvent) -> DispatchResult<AssignmentStatus> {
        let next = match (self, event) {
            (AssignmentStatus::Assigned, AssignmentEvent::Start) => AssignmentStatus::InProgress,
            (AssignmentStatus::InProgress, AssignmentEvent::Complete) => AssignmentStatus::Completed,
            (current, AssignmentEvent::Cancel) if !current.is_terminal() => {
                AssignmentStatus::Canceled
            }
            (current, event) => {
                return Err(DispatchError::InvalidTransition {
                    entity: "社区卫生工作者指派",
                    from: current.to_string(),
                    event: event.to_string(),
                })
            }
        };
        Ok(next)
    }
}

impl FromStr for AssignmentStatus {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASSIGNED" => Ok(AssignmentStatus::Assigned),
            "IN_PROGRESS" => Ok(AssignmentStatus::InProgress),
            "COMPLETED" => Ok(AssignmentStatus::Completed),
            "CANCELED" => Ok(AssignmentStatus::Canceled),
            _ => Err(DispatchError::Validation(format!("无效的指派状态: {s}"))),
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for AssignmentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssignmentEvent::Start => "START",
            AssignmentEvent::Complete => "COMPLETE",
            AssignmentEvent::Cancel => "CANCEL",
        };
        f.write_str(s)
    }
}

sqlite_text_enum!(AssignmentStatus, "assignment status");

/// 社区卫生工作者指派记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommunityHealthWorkerAssignment {
    pub id: i64,
    pub chw_id: i64,
    pub patient_id: Option<i64>,
    pub hospital_id: Option<i64>,
    pub status: AssignmentStatus,
    /// 请求中的原始优先级字符串，不做解析
    pub priority: Option<String>,
    pub incident_type: Option<String>,
    pub notes: Option<String>,
    pub pickup_latitude: f64,
    pub pickup_longitude: f64,
    pub distance_km: f64,
    pub assigned_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl CommunityHealthWorkerAssignment {
    /// 根据急救请求创建处于 `ASSIGNED` 状态的指派记录
    pub fn from_request(
        request: &AssistanceRequest,
        chw_id: i64,
        pickup: GeoPoint,
        distance_km: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            chw_id,
            patient_id: request.patient_id,
            hospital_id: request.hospital_id,
            status: AssignmentStatus::Assigned,
            priority: request.priority.clone(),
            incident_type: request.incident_type.clone(),
            notes: request.notes.clone(),
            pickup_latitude: pickup.latitude,
            pickup_longitude: pickup.longitude,
            distance_km,
            assigned_at: now,
            started_at: None,
            completed_at: None,
            canceled_at: None,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn apply_event(&mut self, event: AssignmentEvent, at: DateTime<Utc>) -> DispatchResult<()> {
        let next = self.status.apply(event)?;
        self.status = next;
        match next {
            AssignmentStatus::InProgress => self.started_at = Some(at),
            AssignmentStatus::Completed => self.completed_at = Some(at),
            AssignmentStatus::Canceled => self.canceled_at = Some(at),
            AssignmentStatus::Assigned => {}
        }
        self.updated_at = at;
        Ok(())
    }

    /// 当前状态是否应释放社区卫生工作者
    pub fn releases_worker(&self) -> bool {
        self.status.is_terminal()
    }
}

/// 指派记录查询条件
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignmentFilter {
    pub chw_id: Option<i64>,
    pub status: Option<AssignmentStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
