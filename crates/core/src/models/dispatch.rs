use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AssistanceRequest, Priority};
use crate::errors::{DispatchError, DispatchResult};

/// 救护车调度状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchStatus {
    Requested,
    Dispatched,
    EnRoute,
    OnScene,
    Transporting,
    AtHospital,
    Completed,
    Canceled,
}

/// 驱动调度状态流转的操作事件
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchEvent {
    Dispatch,
    DepartForScene,
    ArriveOnScene,
    DepartScene,
    ArriveAtHospital,
    Complete,
    Cancel,
}

impl DispatchStatus {
    pub const ALL: [DispatchStatus; 8] = [
        DispatchStatus::Requested,
        DispatchStatus::Dispatched,
        DispatchStatus::EnRoute,
        DispatchStatus::OnScene,
        DispatchStatus::Transporting,
        DispatchStatus::AtHospital,
        DispatchStatus::Completed,
        DispatchStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchStatus::Requested => "REQUESTED",
            DispatchStatus::Dispatched => "DISPATCHED",
            DispatchStatus::EnRoute => "EN_ROUTE",
            DispatchStatus::OnScene => "ON_SCENE",
            DispatchStatus::Transporting => "TRANSPORTING",
            DispatchStatus::AtHospital => "AT_HOSPITAL",
            DispatchStatus::Completed => "COMPLETED",
            DispatchStatus::Canceled => "CANCELED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DispatchStatus::Completed | DispatchStatus::Canceled)
    }

    /// 默认占用救护车容量的状态集合
    ///
    /// 包含 `REQUESTED`：调度记录一经创建即占用一个车队名额。
    pub fn default_active() -> Vec<DispatchStatus> {
        vec![
            DispatchStatus::Requested,
            DispatchStatus::Dispatched,
            DispatchStatus::EnRoute,
            DispatchStatus::OnScene,
            DispatchStatus::Transporting,
        ]
    }

    /// 状态机转换：根据当前状态和事件计算下一个状态
    pub fn apply(self, event: DispatchEvent) -> DispatchResult<DispatchStatus> {
        use DispatchEvent as E;
        use DispatchStatus as S;

        let next = match (self, event) {
            (S::Requested, E::Dispatch) => S::Dispatched,
            (S::Dispatched, E::DepartForScene) => S::EnRoute,
            (S::EnRoute, E::ArriveOnScene) => S::OnScene,
            (S::OnScene, E::DepartScene) => S::Transporting,
            (S::Transporting, E::ArriveAtHospital) => S::AtHospital,
            (S::AtHospital, E::Complete) => S::Completed,
            (current, E::Cancel) if !current.is_terminal() => S::Canceled,
            (current, event) => {
                return Err(DispatchError::InvalidTransition {
                    entity: "救护车调度",
                    from: current.to_string(),
                    event: event.to_string(),
                })
            }
        };
        Ok(next)
    }
}

impl FromStr for DispatchStatus {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        DispatchStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| DispatchError::Validation(format!("无效的调度状态: {s}")))
    }
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DispatchEvent {
    pub const ALL: [DispatchEvent; 7] = [
        DispatchEvent::Dispatch,
        DispatchEvent::DepartForScene,
        DispatchEvent::ArriveOnScene,
        DispatchEvent::DepartScene,
        DispatchEvent::ArriveAtHospital,
        DispatchEvent::Complete,
        DispatchEvent::Cancel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchEvent::Dispatch => "DISPATCH",
            DispatchEvent::DepartForScene => "DEPART_FOR_SCENE",
            DispatchEvent::ArriveOnScene => "ARRIVE_ON_SCENE",
            DispatchEvent::DepartScene => "DEPART_SCENE",
            DispatchEvent::ArriveAtHospital => "ARRIVE_AT_HOSPITAL",
            DispatchEvent::Complete => "COMPLETE",
            DispatchEvent::Cancel => "CANCEL",
        }
    }
}

impl FromStr for DispatchEvent {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        DispatchEvent::ALL
            .into_iter()
            .find(|event| event.as_str() == normalized)
            .ok_or_else(|| DispatchError::Validation(format!("无效的调度事件: {s}")))
    }
}

impl fmt::Display for DispatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

sqlite_text_enum!(DispatchStatus, "dispatch status");

/// 救护车调度记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dispatch {
    pub id: i64,
    pub incident_id: String,
    pub patient_id: Option<i64>,
    pub hospital_id: Option<i64>,
    pub ambulance_id: Option<i64>,
    pub status: DispatchStatus,
    pub priority: Priority,
    pub caller_name: Option<String>,
    pub caller_phone: Option<String>,
    pub incident_type: Option<String>,
    pub notes: Option<String>,
    pub pickup_latitude: f64,
    pub pickup_longitude: f64,
    pub pickup_address_line1: Option<String>,
    pub pickup_address_line2: Option<String>,
    pub pickup_city: Option<String>,
    pub pickup_state: Option<String>,
    pub pickup_postal_code: Option<String>,
    pub pickup_country: Option<String>,
    pub dropoff_hospital_id: Option<i64>,
    pub dropoff_address: Option<String>,
    pub dropoff_latitude: Option<f64>,
    pub dropoff_longitude: Option<f64>,
    pub request_time: DateTime<Utc>,
    pub dispatch_time: Option<DateTime<Utc>>,
    pub en_route_time: Option<DateTime<Utc>>,
    pub on_scene_time: Option<DateTime<Utc>>,
    pub depart_scene_time: Option<DateTime<Utc>>,
    pub arrival_at_hospital_time: Option<DateTime<Utc>>,
    pub completion_time: Option<DateTime<Utc>>,
    pub canceled_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Dispatch {
    /// 根据急救请求创建处于 `REQUESTED` 状态的调度记录
    ///
    /// 调用方需保证请求中的接诊坐标已校验。
    pub fn from_request(
        request: &AssistanceRequest,
        pickup_latitude: f64,
        pickup_longitude: f64,
        hospital_id: Option<i64>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // 将由数据库生成
            incident_id: generate_incident_id(now),
            patient_id: request.patient_id,
            hospital_id,
            ambulance_id: None,
            status: DispatchStatus::Requested,
            priority: Priority::parse_or_default(request.priority.as_deref()),
            caller_name: request.caller_name.clone(),
            caller_phone: request.caller_phone.clone(),
            incident_type: request.incident_type.clone(),
            notes: request.notes.clone(),
            pickup_latitude,
            pickup_longitude,
            pickup_address_line1: request.pickup_address_line1.clone(),
            pickup_address_line2: request.pickup_address_line2.clone(),
            pickup_city: request.pickup_city.clone(),
            pickup_state: request.pickup_state.clone(),
            pickup_postal_code: request.pickup_postal_code.clone(),
            pickup_country: request.pickup_country.clone(),
            dropoff_hospital_id: request.dropoff_hospital_id,
            dropoff_address: request.dropoff_address.clone(),
            dropoff_latitude: request.dropoff_latitude,
            dropoff_longitude: request.dropoff_longitude,
            request_time: now,
            dispatch_time: None,
            en_route_time: None,
            on_scene_time: None,
            depart_scene_time: None,
            arrival_at_hospital_time: None,
            completion_time: None,
            canceled_time: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// 执行状态流转并写入对应阶段的时间戳
    pub fn apply_event(&mut self, event: DispatchEvent, at: DateTime<Utc>) -> DispatchResult<()> {
        let next = self.status.apply(event)?;
        self.status = next;
        let stamp = match next {
            DispatchStatus::Requested => None,
            DispatchStatus::Dispatched => Some(&mut self.dispatch_time),
            DispatchStatus::EnRoute => Some(&mut self.en_route_time),
            DispatchStatus::OnScene => Some(&mut self.on_scene_time),
            DispatchStatus::Transporting => Some(&mut self.depart_scene_time),
            DispatchStatus::AtHospital => Some(&mut self.arrival_at_hospital_time),
            DispatchStatus::Completed => Some(&mut self.completion_time),
            DispatchStatus::Canceled => Some(&mut self.canceled_time),
        };
        if let Some(stamp) = stamp {
            *stamp = Some(at);
        }
        self.updated_at = at;
        Ok(())
    }

    /// 是否持有救护车（离开 REQUESTED 且尚未终结）
    pub fn holds_ambulance(&self) -> bool {
        self.ambulance_id.is_some() && self.is_active() && self.status != DispatchStatus::Requested
    }
}

/// 生成事件编号，格式 `EMG-YYYYMMDD-HHMMSS-XXXXXX`
///
/// 后缀取自新生成的 UUID v4，数据库唯一约束兜底。
pub fn generate_incident_id(at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..6].to_ascii_uppercase();
    format!("EMG-{}-{}", at.format("%Y%m%d-%H%M%S"), suffix)
}

/// 调度记录查询条件
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DispatchFilter {
    pub hospital_id: Option<i64>,
    pub status: Option<DispatchStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
