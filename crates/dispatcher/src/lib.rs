//! 急救资源分配
//!
//! 资源目录、社区卫生工作者选择策略、两类生命周期管理器和分配决策引擎。

pub mod assignment_lifecycle;
pub mod directory;
pub mod dispatch_lifecycle;
pub mod engine;
pub mod locator;
pub mod metrics;
pub mod strategies;

pub use assignment_lifecycle::AssignmentLifecycleManager;
pub use directory::ResourceDirectory;
pub use dispatch_lifecycle::DispatchLifecycleManager;
pub use engine::AllocationEngine;
pub use locator::ChwLocator;
pub use strategies::NearestAvailableStrategy;
