// ==========================================
// SINAPI 目录同步 - 维护历史数据仓储
// ==========================================
// 存储: maintenance_history（只追加，seq 即写入顺序）
// 红线: 不更新、不删除；自然键已存在时静默跳过
// ==========================================

use crate::domain::{HistoryEvent, ItemKind, NewHistoryEvent};
use crate::repository::error::RepositoryResult;
use crate::repository::parse_text_column;
use rusqlite::{params, Connection, Row};

pub struct HistoryRepository<'a> {
    conn: &'a Connection,
}

fn map_event(row: &Row<'_>) -> rusqlite::Result<HistoryEvent> {
    Ok(HistoryEvent {
        seq: row.get(0)?,
        item_code: row.get(1)?,
        item_kind: parse_text_column(row, 2)?,
        reference_date: row.get(3)?,
        maintenance_type: row.get(4)?,
        description: row.get(5)?,
    })
}

impl<'a> HistoryRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 条件写入：自然键 (item_code, item_kind, reference_date, maintenance_type) 不存在时插入
    ///
    /// # 返回
    /// - Ok(true): 新写入
    /// - Ok(false): 已存在，跳过
    pub fn insert_if_absent(&self, event: &NewHistoryEvent) -> RepositoryResult<bool> {
        let changed = self.conn.execute(
            r#"
            INSERT OR IGNORE INTO maintenance_history (
                item_code, item_kind, reference_date, maintenance_type, description
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                event.item_code,
                event.item_kind.as_str(),
                event.reference_date,
                event.maintenance_type,
                event.description,
            ],
        )?;
        Ok(changed > 0)
    }

    /// 读取全部历史，按 (类别, 编码, 参考日期, 写入顺序) 排序
    pub fn load_all_ordered(&self) -> RepositoryResult<Vec<HistoryEvent>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT seq, item_code, item_kind, reference_date, maintenance_type, description
            FROM maintenance_history
            ORDER BY item_kind, item_code, reference_date, seq
            "#,
        )?;
        let events = stmt
            .query_map([], map_event)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }

    /// 单个条目的审计历史
    pub fn history_for_item(&self, kind: ItemKind, code: i64) -> RepositoryResult<Vec<HistoryEvent>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT seq, item_code, item_kind, reference_date, maintenance_type, description
            FROM maintenance_history
            WHERE item_kind = ?1 AND item_code = ?2
            ORDER BY reference_date, seq
            "#,
        )?;
        let events = stmt
            .query_map(params![kind.as_str(), code], map_event)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }

    pub fn count(&self) -> RepositoryResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM maintenance_history", [], |row| row.get(0))?;
        Ok(n)
    }
}
