// ==========================================
// SINAPI 目录同步 - 区域月度事实数据仓储
// ==========================================
// 存储: elementary_price_monthly / assembly_cost_monthly
// 主键: (item_code, region_code, reference_date, regime)
// ==========================================

use crate::domain::{FactKey, FactKind, RegionalFact, Regime};
use crate::repository::error::RepositoryResult;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

pub struct FactRepository<'a> {
    conn: &'a Connection,
}

impl<'a> FactRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 按键读取事实值
    pub fn get_value(&self, kind: FactKind, key: &FactKey) -> RepositoryResult<Option<f64>> {
        let sql = format!(
            r#"
            SELECT value FROM {}
            WHERE item_code = ?1 AND region_code = ?2 AND reference_date = ?3 AND regime = ?4
            "#,
            kind.table()
        );
        let value = self
            .conn
            .query_row(
                &sql,
                params![key.item_code, key.region_code, key.reference_date, key.regime.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 删除指定键，返回删除行数
    pub fn delete_key(&self, kind: FactKind, key: &FactKey) -> RepositoryResult<usize> {
        let sql = format!(
            r#"
            DELETE FROM {}
            WHERE item_code = ?1 AND region_code = ?2 AND reference_date = ?3 AND regime = ?4
            "#,
            kind.table()
        );
        let deleted = self.conn.execute(
            &sql,
            params![key.item_code, key.region_code, key.reference_date, key.regime.as_str()],
        )?;
        Ok(deleted)
    }

    pub fn insert(&self, fact: &RegionalFact) -> RepositoryResult<()> {
        let sql = format!(
            "INSERT INTO {} (item_code, region_code, reference_date, regime, value) VALUES (?1, ?2, ?3, ?4, ?5)",
            fact.kind.table()
        );
        self.conn.execute(
            &sql,
            params![
                fact.key.item_code,
                fact.key.region_code,
                fact.key.reference_date,
                fact.key.regime.as_str(),
                fact.value,
            ],
        )?;
        Ok(())
    }

    /// 条件写入：键已存在时保留旧值
    pub fn insert_if_absent(&self, fact: &RegionalFact) -> RepositoryResult<bool> {
        let sql = format!(
            "INSERT OR IGNORE INTO {} (item_code, region_code, reference_date, regime, value) VALUES (?1, ?2, ?3, ?4, ?5)",
            fact.kind.table()
        );
        let changed = self.conn.execute(
            &sql,
            params![
                fact.key.item_code,
                fact.key.region_code,
                fact.key.reference_date,
                fact.key.regime.as_str(),
                fact.value,
            ],
        )?;
        Ok(changed > 0)
    }

    /// 时点查询：取参考日期不晚于 `as_of` 的最近一期值
    ///
    /// # 返回
    /// - Some((参考日期, 值))
    /// - None: 该日期之前无任何报价
    pub fn value_at(
        &self,
        kind: FactKind,
        item_code: i64,
        region_code: &str,
        regime: Regime,
        as_of: NaiveDate,
    ) -> RepositoryResult<Option<(NaiveDate, f64)>> {
        let sql = format!(
            r#"
            SELECT reference_date, value FROM {}
            WHERE item_code = ?1 AND region_code = ?2 AND regime = ?3 AND reference_date <= ?4
            ORDER BY reference_date DESC
            LIMIT 1
            "#,
            kind.table()
        );
        let found = self
            .conn
            .query_row(
                &sql,
                params![item_code, region_code, regime.as_str(), as_of],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(found)
    }

    pub fn count(&self, kind: FactKind) -> RepositoryResult<i64> {
        let n = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", kind.table()), [], |row| row.get(0))?;
        Ok(n)
    }
}
