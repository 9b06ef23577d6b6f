//! # 数据模型
//!
//! 急救调度核心的数据结构：调度记录、社区卫生工作者指派记录，
//! 以及作为只读引用的医院、患者、救护车和社区卫生工作者。
//!
//! ## 状态流转
//!
//! ### 救护车调度
//! ```text
//! REQUESTED → DISPATCHED → EN_ROUTE → ON_SCENE → TRANSPORTING → AT_HOSPITAL → COMPLETED
//!     ↓           ↓           ↓          ↓            ↓              ↓
//!                              CANCELED
//! ```
//!
//! ### 社区卫生工作者指派
//! ```text
//! ASSIGNED → IN_PROGRESS → COMPLETED
//!     ↓           ↓
//!        CANCELED
//! ```
//!
//! 状态字段全部使用枚举，以大写下划线字符串形式写入 JSON 和数据库。

/// 为以 TEXT 列存储的状态枚举实现 SQLite 编解码
macro_rules! sqlite_text_enum {
    ($ty:ty, $label:literal) => {
        impl sqlx::Type<sqlx::Sqlite> for $ty {
            fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
                <str as sqlx::Type<sqlx::Sqlite>>::type_info()
            }

            fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
                <str as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for $ty {
            fn decode(
                value: sqlx::sqlite::SqliteValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
                s.parse::<$ty>()
                    .map_err(|_| -> sqlx::error::BoxDynError {
                        format!("Invalid {}: {s}", $label).into()
                    })
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut <sqlx::Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <&str as sqlx::Encode<sqlx::Sqlite>>::encode(self.as_str(), buf)
            }
        }
    };
}

pub mod ambulance;
pub mod assignment;
pub mod chw;
pub mod dispatch;
pub mod hospital;
pub mod priority;
pub mod request;

pub use ambulance::*;
pub use assignment::*;
pub use chw::*;
pub use dispatch::*;
pub use hospital::*;
pub use priority::*;
pub use request::*;
