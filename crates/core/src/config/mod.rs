//! 配置管理
//!
//! 配置按以下顺序叠加，后者覆盖前者：
//!
//! 1. 内置默认值
//! 2. TOML 配置文件
//! 3. 环境变量（前缀 `DISPATCH_`，层级分隔符 `__`，例如 `DISPATCH_DATABASE__URL`）

pub mod models;

pub use models::*;
