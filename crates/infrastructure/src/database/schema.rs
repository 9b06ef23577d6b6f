//! SQLite 表结构
//!
//! 医院、患者、救护车和社区卫生工作者由外部管理界面维护，这里只建表供查询；
//! 调度记录和指派记录由本系统写入。

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::info;

const TABLES: [(&str, &str); 6] = [
    (
        "hospitals",
        r#"
        CREATE TABLE IF NOT EXISTS hospitals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            number_of_ambulances INTEGER NOT NULL DEFAULT 0,
            latitude REAL,
            longitude REAL,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    ),
    (
        "patients",
        r#"
        CREATE TABLE IF NOT EXISTS patients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    ),
    (
        "ambulances",
        r#"
        CREATE TABLE IF NOT EXISTS ambulances (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            hospital_id INTEGER NOT NULL,
            vehicle_number TEXT NOT NULL UNIQUE,
            status TEXT NOT NULL DEFAULT 'AVAILABLE',
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (hospital_id) REFERENCES hospitals (id)
        )
        "#,
    ),
    (
        "community_health_workers",
        r#"
        CREATE TABLE IF NOT EXISTS community_health_workers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            phone TEXT,
            hospital_id INTEGER,
            status TEXT NOT NULL DEFAULT 'AVAILABLE',
            latitude REAL,
            longitude REAL,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (hospital_id) REFERENCES hospitals (id)
        )
        "#,
    ),
    (
        "ambulance_dispatches",
        r#"
        CREATE TABLE IF NOT EXISTS ambulance_dispatches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            incident_id TEXT NOT NULL UNIQUE,
            patient_id INTEGER,
            hospital_id INTEGER,
            ambulance_id INTEGER,
            status TEXT NOT NULL DEFAULT 'REQUESTED',
            priority TEXT NOT NULL DEFAULT 'MEDIUM',
            caller_name TEXT,
            caller_phone TEXT,
            incident_type TEXT,
            notes TEXT,
            pickup_latitude REAL NOT NULL,
            pickup_longitude REAL NOT NULL,
            pickup_address_line1 TEXT,
            pickup_address_line2 TEXT,
            pickup_city TEXT,
            pickup_state TEXT,
            pickup_postal_code TEXT,
            pickup_country TEXT,
            dropoff_hospital_id INTEGER,
            dropoff_address TEXT,
            dropoff_latitude REAL,
            dropoff_longitude REAL,
            request_time DATETIME NOT NULL,
            dispatch_time DATETIME,
            en_route_time DATETIME,
            on_scene_time DATETIME,
            depart_scene_time DATETIME,
            arrival_at_hospital_time DATETIME,
            completion_time DATETIME,
            canceled_time DATETIME,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (patient_id) REFERENCES patients (id),
            FOREIGN KEY (hospital_id) REFERENCES hospitals (id),
            FOREIGN KEY (ambulance_id) REFERENCES ambulances (id)
        )
        "#,
    ),
    (
        "chw_assignments",
        r#"
        CREATE TABLE IF NOT EXISTS chw_assignments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            chw_id INTEGER NOT NULL,
            patient_id INTEGER,
            hospital_id INTEGER,
            status TEXT NOT NULL DEFAULT 'ASSIGNED',
            priority TEXT,
            incident_type TEXT,
            notes TEXT,
            pickup_latitude REAL NOT NULL,
            pickup_longitude REAL NOT NULL,
            distance_km REAL NOT NULL,
            assigned_at DATETIME NOT NULL,
            started_at DATETIME,
            completed_at DATETIME,
            canceled_at DATETIME,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (chw_id) REFERENCES community_health_workers (id),
            FOREIGN KEY (patient_id) REFERENCES patients (id)
        )
        "#,
    ),
];

const INDEXES: [&str; 7] = [
    "CREATE INDEX IF NOT EXISTS idx_ambulances_status ON ambulances(status)",
    "CREATE INDEX IF NOT EXISTS idx_chws_status_hospital ON community_health_workers(status, hospital_id)",
    "CREATE INDEX IF NOT EXISTS idx_dispatches_hospital_status ON ambulance_dispatches(hospital_id, status)",
    "CREATE INDEX IF NOT EXISTS idx_dispatches_request_time ON ambulance_dispatches(request_time)",
    "CREATE INDEX IF NOT EXISTS idx_dispatches_ambulance_id ON ambulance_dispatches(ambulance_id)",
    "CREATE INDEX IF NOT EXISTS idx_assignments_chw_status ON chw_assignments(chw_id, status)",
    "CREATE INDEX IF NOT EXISTS idx_assignments_assigned_at ON chw_assignments(assigned_at)",
];

/// 运行数据库迁移，可重复执行
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("运行SQLite数据库迁移");

    for (table, ddl) in TABLES {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .with_context(|| format!("创建表 {table} 失败"))?;
    }

    for index_sql in INDEXES {
        sqlx::query(index_sql)
            .execute(pool)
            .await
            .with_context(|| format!("创建索引失败: {index_sql}"))?;
    }

    info!("✅ 数据库迁移完成");
    Ok(())
}
