use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DispatchError;
use crate::geo::GeoPoint;

/// 社区卫生工作者状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChwStatus {
    Available,
    Busy,
    Offline,
}

impl ChwStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChwStatus::Available => "AVAILABLE",
            ChwStatus::Busy => "BUSY",
            ChwStatus::Offline => "OFFLINE",
        }
    }
}

impl FromStr for ChwStatus {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AVAILABLE" => Ok(ChwStatus::Available),
            "BUSY" => Ok(ChwStatus::Busy),
            "OFFLINE" => Ok(ChwStatus::Offline),
            _ => Err(DispatchError::Validation(format!(
                "无效的社区卫生工作者状态: {s}"
            ))),
        }
    }
}

impl fmt::Display for ChwStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

sqlite_text_enum!(ChwStatus, "chw status");

/// 社区卫生工作者
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommunityHealthWorker {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub hospital_id: Option<i64>,
    pub status: ChwStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl CommunityHealthWorker {
    pub fn is_available(&self) -> bool {
        matches!(self.status, ChwStatus::Available)
    }

    /// 坐标完整时返回位置
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        }
    }
}
