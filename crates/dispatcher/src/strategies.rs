use std::cmp::Ordering;

use dispatch_core::{
    traits::{ChwCandidate, ChwSelectionStrategy},
    CommunityHealthWorker, GeoPoint,
};
use tracing::debug;

/// 最近可用社区卫生工作者策略
///
/// 丢弃缺少坐标和超出半径的候选，取距离最小者；距离完全相同时取ID较小者。
pub struct NearestAvailableStrategy;

impl NearestAvailableStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NearestAvailableStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ChwSelectionStrategy for NearestAvailableStrategy {
    fn select(
        &self,
        origin: GeoPoint,
        candidates: &[CommunityHealthWorker],
        radius_km: Option<f64>,
    ) -> Option<ChwCandidate> {
        let selected = candidates
            .iter()
            .filter(|chw| chw.is_available())
            .filter_map(|chw| {
                chw.location()
                    .map(|location| (chw, origin.distance_to(&location)))
            })
            .filter(|(_, distance)| radius_km.map_or(true, |radius| *distance <= radius))
            .min_by(|(a, da), (b, db)| {
                da.partial_cmp(db)
                    .unwrap_or(Ordering::Equal)
                    .then(a.id.cmp(&b.id))
            })
            .map(|(chw, distance)| ChwCandidate {
                chw: chw.clone(),
                distance_km: distance,
            });

        match &selected {
            Some(candidate) => debug!(
                "最近策略选择社区卫生工作者: {} (距离: {:.3} km, 候选 {} 名)",
                candidate.chw.id,
                candidate.distance_km,
                candidates.len()
            ),
            None => debug!("候选 {} 名中没有符合条件的社区卫生工作者", candidates.len()),
        }
        selected
    }

    fn name(&self) -> &str {
        "NearestAvailable"
    }
}
