// ==========================================
// SINAPI 目录同步 - SQLite 连接初始化与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键 / busy_timeout）
// - 幂等建表：目录、维护历史、结构边、月度事实、配置覆写
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开内存库并建表（测试与演练用）
pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;
    Ok(conn)
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL DEFAULT 'global',
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS elementary_item (
    code INTEGER PRIMARY KEY,
    description TEXT NOT NULL,
    unit TEXT,
    classification TEXT,
    status TEXT NOT NULL DEFAULT 'ACTIVE' CHECK (status IN ('ACTIVE', 'DEACTIVATED')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS assembly_item (
    code INTEGER PRIMARY KEY,
    description TEXT NOT NULL,
    unit TEXT,
    classification TEXT,
    status TEXT NOT NULL DEFAULT 'ACTIVE' CHECK (status IN ('ACTIVE', 'DEACTIVATED')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS maintenance_history (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    item_code INTEGER NOT NULL,
    item_kind TEXT NOT NULL CHECK (item_kind IN ('ELEMENTARY', 'ASSEMBLY')),
    reference_date TEXT NOT NULL,
    maintenance_type TEXT NOT NULL,
    description TEXT,
    ingested_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (item_code, item_kind, reference_date, maintenance_type)
);

CREATE INDEX IF NOT EXISTS idx_maintenance_history_item
    ON maintenance_history (item_kind, item_code, reference_date, seq);

CREATE TABLE IF NOT EXISTS assembly_elementary_edge (
    parent_code INTEGER NOT NULL REFERENCES assembly_item(code),
    child_code INTEGER NOT NULL REFERENCES elementary_item(code),
    coefficient REAL NOT NULL,
    PRIMARY KEY (parent_code, child_code)
);

CREATE TABLE IF NOT EXISTS assembly_subassembly_edge (
    parent_code INTEGER NOT NULL REFERENCES assembly_item(code),
    child_code INTEGER NOT NULL REFERENCES assembly_item(code),
    coefficient REAL NOT NULL,
    PRIMARY KEY (parent_code, child_code)
);

CREATE TABLE IF NOT EXISTS elementary_price_monthly (
    item_code INTEGER NOT NULL REFERENCES elementary_item(code),
    region_code TEXT NOT NULL,
    reference_date TEXT NOT NULL,
    regime TEXT NOT NULL,
    value REAL NOT NULL,
    PRIMARY KEY (item_code, region_code, reference_date, regime)
);

CREATE TABLE IF NOT EXISTS assembly_cost_monthly (
    item_code INTEGER NOT NULL REFERENCES assembly_item(code),
    region_code TEXT NOT NULL,
    reference_date TEXT NOT NULL,
    regime TEXT NOT NULL,
    value REAL NOT NULL,
    PRIMARY KEY (item_code, region_code, reference_date, regime)
);

CREATE VIEW IF NOT EXISTS v_assembly_component AS
SELECT parent_code, child_code AS item_code, 'ELEMENTARY' AS item_kind, coefficient
FROM assembly_elementary_edge
UNION ALL
SELECT parent_code, child_code AS item_code, 'ASSEMBLY' AS item_kind, coefficient
FROM assembly_subassembly_edge;
"#;

/// 幂等建表，并登记当前 schema_version
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_component_view_unions_both_edge_tables() {
        let conn = open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO elementary_item (code, description) VALUES (10, 'CIMENTO');
            INSERT INTO assembly_item (code, description) VALUES (100, 'CONCRETO'), (200, 'LAJE');
            INSERT INTO assembly_elementary_edge VALUES (100, 10, 0.35);
            INSERT INTO assembly_subassembly_edge VALUES (200, 100, 1.2);
            "#,
        )
        .unwrap();

        let kinds: Vec<String> = conn
            .prepare("SELECT item_kind FROM v_assembly_component ORDER BY parent_code")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(kinds, vec!["ELEMENTARY".to_string(), "ASSEMBLY".to_string()]);
    }
}
