// ==========================================
// SINAPI 目录同步 - 区域事实装载器
// ==========================================
// 职责: 将本期区域价格/成本追加到月度事实表
// 策略:
// - Replace: 删除即将写入的同键旧行，再写入新行
// - Aggregate: 仅写入库中不存在的键，已有键保留旧值
// 规则:
// - 值缺失/非数值的行单独拒绝；编码不在目录中 → 引用完整性拒绝
// - 参考日期缺失时取本期参考日期
// - 同一次装载内重复的键首行生效
// - 按 batch_size 分批，每批一个事务
// ==========================================

use crate::domain::{
    DuplicatePolicy, FactKey, FactKind, PhaseReport, ReferenceExtract, RegionalFact,
    RegionalFactRecord, SyncPhase,
};
use crate::engine::error::RecordError;
use crate::repository::{CatalogRepository, FactRepository, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy)]
pub struct FactLoader {
    policy: DuplicatePolicy,
    batch_size: usize,
}

impl FactLoader {
    pub fn new(policy: DuplicatePolicy, batch_size: usize) -> Self {
        Self {
            policy,
            batch_size: batch_size.max(1),
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// 校验并规范化单行（地区码去空白大写）
    pub fn validate(
        kind: FactKind,
        record: &RegionalFactRecord,
        period: NaiveDate,
    ) -> Result<RegionalFact, RecordError> {
        let row = record.row_number;
        let item_code = record
            .item_code
            .filter(|c| *c > 0)
            .ok_or_else(|| RecordError::missing(row, "item_code"))?;
        let region_code = record
            .region_code
            .as_deref()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RecordError::missing(row, "region_code"))?;
        let regime = record
            .regime
            .ok_or_else(|| RecordError::missing(row, "regime"))?;
        let value = record
            .value
            .filter(|v| v.is_finite())
            .ok_or_else(|| RecordError::missing(row, "value"))?;

        Ok(RegionalFact {
            kind,
            key: FactKey {
                item_code,
                region_code,
                reference_date: record.reference_date.unwrap_or(period),
                regime,
            },
            value,
        })
    }

    /// 装载本期价格与成本
    pub fn load_reference(
        &self,
        conn: &mut Connection,
        reference: &ReferenceExtract,
        period: NaiveDate,
    ) -> RepositoryResult<PhaseReport> {
        let mut report = self.load(conn, FactKind::Price, &reference.prices, period)?;
        let costs = self.load(conn, FactKind::Cost, &reference.costs, period)?;
        report.tables.extend(costs.tables);
        report.rejections.extend(costs.rejections);
        Ok(report)
    }

    /// 装载一类事实
    #[instrument(skip_all, fields(kind = %kind, rows = records.len(), policy = %self.policy))]
    pub fn load(
        &self,
        conn: &mut Connection,
        kind: FactKind,
        records: &[RegionalFactRecord],
        period: NaiveDate,
    ) -> RepositoryResult<PhaseReport> {
        let table = kind.table();
        let mut report = PhaseReport::new(SyncPhase::Facts);
        report.table_mut(table);

        // 目录在事实阶段内不变，一次读取
        let known_codes = CatalogRepository::new(conn).codes(kind.item_kind())?;

        let mut seen: HashSet<FactKey> = HashSet::new();
        let mut accepted = Vec::with_capacity(records.len());
        for record in records {
            let checked = Self::validate(kind, record, period).and_then(|fact| {
                if !known_codes.contains(&fact.key.item_code) {
                    return Err(RecordError::ReferentialIntegrity {
                        row: record.row_number,
                        kind: kind.item_kind(),
                        code: fact.key.item_code,
                    });
                }
                if !seen.insert(fact.key.clone()) {
                    return Err(RecordError::duplicate(record.row_number, "item_code/region_code/reference_date/regime"));
                }
                Ok(fact)
            });

            match checked {
                Ok(fact) => accepted.push(fact),
                Err(e) => {
                    debug!(table, row = record.row_number, error = %e, "事实行被拒绝");
                    report.reject(table, e.into_rejection(SyncPhase::Facts, table));
                }
            }
        }

        for (batch_no, batch) in accepted.chunks(self.batch_size).enumerate() {
            let tx = conn.transaction()?;
            {
                let repo = FactRepository::new(&tx);
                let stats = report.table_mut(table);
                for fact in batch {
                    match self.policy {
                        DuplicatePolicy::Replace => {
                            let previous = repo.get_value(kind, &fact.key)?;
                            if previous.is_some() {
                                repo.delete_key(kind, &fact.key)?;
                            }
                            repo.insert(fact)?;
                            match previous {
                                None => stats.inserted += 1,
                                Some(old) if old != fact.value => stats.updated += 1,
                                Some(_) => stats.skipped += 1,
                            }
                        }
                        DuplicatePolicy::Aggregate => {
                            if repo.insert_if_absent(fact)? {
                                stats.inserted += 1;
                            } else {
                                stats.skipped += 1;
                            }
                        }
                    }
                }
            }
            tx.commit()?;
            debug!(table, batch = batch_no + 1, rows = batch.len(), "事实批次已提交");
        }

        let stats = report.table_mut(table).clone();
        if stats.rejected > 0 {
            warn!(table, rejected = stats.rejected, "部分事实行被排除");
        }
        info!(
            table,
            inserted = stats.inserted,
            updated = stats.updated,
            unchanged = stats.skipped,
            rejected = stats.rejected,
            "区域事实装载完成"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Regime, RejectionKind};

    fn period() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
    }

    fn price(row: usize, code: i64, region: &str, value: Option<f64>) -> RegionalFactRecord {
        RegionalFactRecord {
            row_number: row,
            item_code: Some(code),
            region_code: Some(region.to_string()),
            reference_date: None,
            regime: Some(Regime::NaoDesonerado),
            value,
        }
    }

    fn seeded() -> Connection {
        let conn = crate::db::open_in_memory().unwrap();
        conn.execute("INSERT INTO elementary_item (code, description) VALUES (10, 'CIMENTO')", [])
            .unwrap();
        conn
    }

    #[test]
    fn test_missing_reference_date_defaults_to_period() {
        let fact = FactLoader::validate(FactKind::Price, &price(1, 10, " sp ", Some(1.0)), period()).unwrap();
        assert_eq!(fact.key.reference_date, period());
        assert_eq!(fact.key.region_code, "SP");
    }

    #[test]
    fn test_rejections_do_not_stop_the_batch() {
        let mut conn = seeded();
        let rows = vec![
            price(1, 10, "SP", None),
            price(2, 999, "SP", Some(5.0)),
            price(3, 10, "SP", Some(5.0)),
            price(4, 10, "SP", Some(6.0)),
            price(5, 10, "RJ", Some(7.0)),
        ];

        let report = FactLoader::new(DuplicatePolicy::Replace, 1)
            .load(&mut conn, FactKind::Price, &rows, period())
            .unwrap();

        assert_eq!(report.records_inserted(), 2);
        let kinds: Vec<_> = report.rejections.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RejectionKind::MalformedRecord,
                RejectionKind::ReferentialIntegrity,
                RejectionKind::MalformedRecord,
            ]
        );
    }

    #[test]
    fn test_reload_with_identical_input_inserts_nothing() {
        for policy in [DuplicatePolicy::Replace, DuplicatePolicy::Aggregate] {
            let mut conn = seeded();
            let rows = vec![price(1, 10, "SP", Some(5.0))];
            let loader = FactLoader::new(policy, 100);

            loader.load(&mut conn, FactKind::Price, &rows, period()).unwrap();
            let second = loader.load(&mut conn, FactKind::Price, &rows, period()).unwrap();

            assert_eq!(second.records_inserted(), 0, "policy {}", policy);
            assert_eq!(FactRepository::new(&conn).count(FactKind::Price).unwrap(), 1);
        }
    }
}
