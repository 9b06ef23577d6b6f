use serde::Serialize;

use crate::geo::GeoPoint;
use crate::models::CommunityHealthWorker;

/// 候选社区卫生工作者及其与接诊点的距离
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChwCandidate {
    pub chw: CommunityHealthWorker,
    pub distance_km: f64,
}

/// 社区卫生工作者选择策略
///
/// `candidates` 已按状态和医院过滤；实现负责坐标缺失、搜索半径和排序规则。
pub trait ChwSelectionStrategy: Send + Sync {
    fn select(
        &self,
        origin: GeoPoint,
        candidates: &[CommunityHealthWorker],
        radius_km: Option<f64>,
    ) -> Option<ChwCandidate>;

    fn name(&self) -> &str;
}
