// ==========================================
// SINAPI 目录同步 - 目录数据仓储
// ==========================================
// 存储: elementary_item / assembly_item
// 红线: upsert 只写 description/unit/classification，status 仅经 set_status 修改
// ==========================================

use crate::domain::{CatalogEntry, CatalogItem, ItemKind, ItemStatus};
use crate::repository::error::RepositoryResult;
use crate::repository::parse_text_column;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;

/// upsert 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

pub struct CatalogRepository<'a> {
    conn: &'a Connection,
}

impl<'a> CatalogRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn exists(&self, kind: ItemKind, code: i64) -> RepositoryResult<bool> {
        let sql = format!("SELECT 1 FROM {} WHERE code = ?1", kind.catalog_table());
        let found = self
            .conn
            .query_row(&sql, params![code], |_row| Ok(true))
            .optional()?
            .unwrap_or(false);
        Ok(found)
    }

    /// 合并目录行
    ///
    /// # 说明
    /// - 新编码：插入，status 取列默认值 ACTIVE
    /// - 已有编码：仅当描述字段有变化时更新，status 不参与
    pub fn upsert(&self, kind: ItemKind, entry: &CatalogEntry) -> RepositoryResult<UpsertOutcome> {
        let existed = self.exists(kind, entry.code)?;
        let sql = format!(
            r#"
            INSERT INTO {table} (code, description, unit, classification)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(code) DO UPDATE SET
                description = excluded.description,
                unit = excluded.unit,
                classification = excluded.classification,
                updated_at = datetime('now')
            WHERE {table}.description IS NOT excluded.description
               OR {table}.unit IS NOT excluded.unit
               OR {table}.classification IS NOT excluded.classification
            "#,
            table = kind.catalog_table()
        );
        let changed = self.conn.execute(
            &sql,
            params![entry.code, entry.description, entry.unit, entry.classification],
        )?;

        Ok(match (existed, changed > 0) {
            (false, _) => UpsertOutcome::Inserted,
            (true, true) => UpsertOutcome::Updated,
            (true, false) => UpsertOutcome::Unchanged,
        })
    }

    /// 仅在编码不存在时插入（占位行）
    pub fn insert_if_absent(&self, kind: ItemKind, entry: &CatalogEntry) -> RepositoryResult<bool> {
        let sql = format!(
            "INSERT OR IGNORE INTO {} (code, description, unit, classification) VALUES (?1, ?2, ?3, ?4)",
            kind.catalog_table()
        );
        let changed = self.conn.execute(
            &sql,
            params![entry.code, entry.description, entry.unit, entry.classification],
        )?;
        Ok(changed > 0)
    }

    /// 写入派生状态
    ///
    /// # 返回
    /// - Ok(1): 状态发生变化
    /// - Ok(0): 状态未变，或目录中无此编码
    pub fn set_status(&self, kind: ItemKind, code: i64, status: ItemStatus) -> RepositoryResult<usize> {
        let sql = format!(
            "UPDATE {} SET status = ?1, updated_at = datetime('now') WHERE code = ?2 AND status <> ?1",
            kind.catalog_table()
        );
        let changed = self.conn.execute(&sql, params![status.as_str(), code])?;
        Ok(changed)
    }

    pub fn find(&self, kind: ItemKind, code: i64) -> RepositoryResult<Option<CatalogItem>> {
        let sql = format!(
            "SELECT code, description, unit, classification, status FROM {} WHERE code = ?1",
            kind.catalog_table()
        );
        let item = self
            .conn
            .query_row(&sql, params![code], |row| {
                Ok(CatalogItem {
                    kind,
                    code: row.get(0)?,
                    description: row.get(1)?,
                    unit: row.get(2)?,
                    classification: row.get(3)?,
                    status: parse_text_column(row, 4)?,
                })
            })
            .optional()?;
        Ok(item)
    }

    /// 某一类别的全部编码
    pub fn codes(&self, kind: ItemKind) -> RepositoryResult<HashSet<i64>> {
        let sql = format!("SELECT code FROM {}", kind.catalog_table());
        let mut stmt = self.conn.prepare(&sql)?;
        let codes = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(codes)
    }

    pub fn count(&self, kind: ItemKind) -> RepositoryResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", kind.catalog_table());
        let n = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(n)
    }
}
