use std::sync::Arc;

use dispatch_core::{
    traits::{ChwCandidate, ChwSelectionStrategy},
    DispatchError, DispatchResult, GeoPoint,
};
use tracing::debug;

use crate::directory::ResourceDirectory;
use crate::strategies::NearestAvailableStrategy;

/// 社区卫生工作者定位器
#[derive(Clone)]
pub struct ChwLocator {
    directory: ResourceDirectory,
    strategy: Arc<dyn ChwSelectionStrategy>,
}

impl ChwLocator {
    pub fn new(directory: ResourceDirectory) -> Self {
        Self::with_strategy(directory, Arc::new(NearestAvailableStrategy::new()))
    }

    pub fn with_strategy(
        directory: ResourceDirectory,
        strategy: Arc<dyn ChwSelectionStrategy>,
    ) -> Self {
        Self {
            directory,
            strategy,
        }
    }

    /// 查找距离接诊点最近的可用社区卫生工作者
    pub async fn find_nearest(
        &self,
        origin: GeoPoint,
        hospital_id: Option<i64>,
        radius_km: Option<f64>,
    ) -> DispatchResult<ChwCandidate> {
        self.find_nearest_excluding(origin, hospital_id, radius_km, &[])
            .await
    }

    /// 查找最近的可用社区卫生工作者，跳过 `excluded` 中的ID
    pub async fn find_nearest_excluding(
        &self,
        origin: GeoPoint,
        hospital_id: Option<i64>,
        radius_km: Option<f64>,
        excluded: &[i64],
    ) -> DispatchResult<ChwCandidate> {
        let mut pool = self.directory.find_available_chws(hospital_id).await?;
        pool.retain(|chw| !excluded.contains(&chw.id));

        debug!(
            "使用 {} 策略在 {} 名候选中查找 ({:.4}, {:.4}) 附近的社区卫生工作者",
            self.strategy.name(),
            pool.len(),
            origin.latitude,
            origin.longitude
        );

        self.strategy
            .select(origin, &pool, radius_km)
            .ok_or(DispatchError::NoAvailableCommunityHealthWorker)
    }
}
