//! # 仓储接口
//!
//! 急救调度核心依赖的外部协作方接口。每个 trait 对应一类持久化实体，
//! 由基础设施层提供 SQLite 实现和内存实现。
//!
//! ## 原子性约定
//!
//! 医院车队容量和社区卫生工作者状态是仅有的两类共享可变状态，
//! 对它们的修改必须通过以下条件写入完成，不允许"先读后写"：
//!
//! - [`DispatchRepository::create_within_capacity`] - 容量判断与调度记录插入为一个原子操作
//! - [`AssignmentRepository::create_claiming_worker`] - 占用社区卫生工作者与插入指派记录在同一事务中
//! - [`AssignmentRepository::update_releasing_worker`] - 指派终结与释放社区卫生工作者在同一事务中
//! - [`AmbulanceRepository::compare_and_set_status`] - 救护车状态的比较并交换
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use dispatch_core::traits::DispatchRepository;
//!
//! async fn reserve(repo: &dyn DispatchRepository, dispatch: &Dispatch) -> DispatchResult<()> {
//!     let statuses = DispatchStatus::default_active();
//!     match repo.create_within_capacity(dispatch, 2, &statuses).await? {
//!         Some(created) => println!("占用车队名额: {}", created.incident_id),
//!         None => println!("车队已满"),
//!     }
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;

use crate::errors::DispatchResult;
use crate::models::{
    Ambulance, AmbulanceStatus, AssignmentFilter, AssignmentStatus, ChwStatus,
    CommunityHealthWorker, CommunityHealthWorkerAssignment, Dispatch, DispatchFilter,
    DispatchStatus, Hospital, Patient,
};

/// 医院查询接口
#[async_trait]
pub trait HospitalRepository: Send + Sync {
    async fn get_by_id(&self, id: i64) -> DispatchResult<Option<Hospital>>;
}

/// 患者查询接口
#[async_trait]
pub trait PatientRepository: Send + Sync {
    async fn get_by_id(&self, id: i64) -> DispatchResult<Option<Patient>>;
}

/// 救护车仓储接口
#[async_trait]
pub trait AmbulanceRepository: Send + Sync {
    async fn get_by_id(&self, id: i64) -> DispatchResult<Option<Ambulance>>;

    /// 按状态查询救护车，按ID升序
    async fn find_by_status(&self, status: AmbulanceStatus) -> DispatchResult<Vec<Ambulance>>;

    /// 比较并交换救护车状态
    ///
    /// 仅当当前状态等于 `expected` 时写入 `new_status`，返回是否写入成功。
    /// 救护车不存在时返回 `Ok(false)`。
    async fn compare_and_set_status(
        &self,
        id: i64,
        expected: AmbulanceStatus,
        new_status: AmbulanceStatus,
    ) -> DispatchResult<bool>;
}

/// 社区卫生工作者仓储接口
#[async_trait]
pub trait CommunityHealthWorkerRepository: Send + Sync {
    async fn get_by_id(&self, id: i64) -> DispatchResult<Option<CommunityHealthWorker>>;

    /// 按状态查询，可选限定所属医院，按ID升序返回
    async fn find_by_status(
        &self,
        status: ChwStatus,
        hospital_id: Option<i64>,
    ) -> DispatchResult<Vec<CommunityHealthWorker>>;
}

/// 救护车调度仓储接口
#[async_trait]
pub trait DispatchRepository: Send + Sync {
    /// 在容量范围内创建调度记录
    ///
    /// 统计 `hospital_id` 下状态属于 `active_statuses` 的调度数量，仅当数量严格小于
    /// `capacity` 时插入记录。统计与插入是一个原子操作。
    ///
    /// # 返回值
    ///
    /// 插入成功时返回带数据库ID的记录；容量已满时返回 `None`。
    /// 事件编号冲突时由实现重新生成编号并重试。
    async fn create_within_capacity(
        &self,
        dispatch: &Dispatch,
        capacity: i64,
        active_statuses: &[DispatchStatus],
    ) -> DispatchResult<Option<Dispatch>>;

    /// 统计医院在给定状态集合内的调度数量
    async fn count_active(
        &self,
        hospital_id: i64,
        active_statuses: &[DispatchStatus],
    ) -> DispatchResult<i64>;

    async fn get_by_incident_id(&self, incident_id: &str) -> DispatchResult<Option<Dispatch>>;

    async fn list(&self, filter: &DispatchFilter) -> DispatchResult<Vec<Dispatch>>;

    /// 按事件编号更新调度记录，仅当已存状态仍为 `expected` 时写入
    ///
    /// 已存状态不同时不做任何写入并返回 `Ok(false)`；记录不存在时返回
    /// [`DispatchError::DispatchNotFound`](crate::errors::DispatchError::DispatchNotFound)。
    async fn update(&self, dispatch: &Dispatch, expected: DispatchStatus) -> DispatchResult<bool>;
}

/// 社区卫生工作者指派仓储接口
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// 占用社区卫生工作者并创建指派记录
    ///
    /// 在同一事务中把 `assignment.chw_id` 对应的工作者从 `AVAILABLE` 改为 `BUSY`
    /// 并插入指派记录。工作者已不处于 `AVAILABLE` 时不做任何写入并返回 `None`。
    async fn create_claiming_worker(
        &self,
        assignment: &CommunityHealthWorkerAssignment,
    ) -> DispatchResult<Option<CommunityHealthWorkerAssignment>>;

    async fn get_by_id(&self, id: i64) -> DispatchResult<Option<CommunityHealthWorkerAssignment>>;

    async fn list(
        &self,
        filter: &AssignmentFilter,
    ) -> DispatchResult<Vec<CommunityHealthWorkerAssignment>>;

    /// 更新指派记录，仅当已存状态仍为 `expected` 时写入
    ///
    /// 已存状态不同时返回 `Ok(false)`。
    async fn update(
        &self,
        assignment: &CommunityHealthWorkerAssignment,
        expected: AssignmentStatus,
    ) -> DispatchResult<bool>;

    /// 更新指派记录并释放社区卫生工作者
    ///
    /// 在同一事务中写入指派记录，并把处于 `BUSY` 的工作者恢复为 `AVAILABLE`。
    /// 工作者已被改为其他状态（例如 `OFFLINE`）时保持不变。
    /// 已存状态不是 `expected` 时整个事务回滚，工作者不会被释放，返回 `Ok(false)`。
    async fn update_releasing_worker(
        &self,
        assignment: &CommunityHealthWorkerAssignment,
        expected: AssignmentStatus,
    ) -> DispatchResult<bool>;
}

/// 存储健康检查接口
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// 存储可用时返回 `Ok(())`
    async fn check(&self) -> DispatchResult<()>;
}
