// ==========================================
// SINAPI 目录同步 - 维护历史写入器
// ==========================================
// 职责: 将本期维护事件追加到不可变历史日志
// 规则: 自然键已存在 → 静默跳过（幂等重跑）
// 失败: 键字段缺失的行单独拒绝，不中断本批次
// ==========================================

use crate::domain::{HistoryEventRecord, NewHistoryEvent, PhaseReport, SyncPhase};
use crate::engine::error::RecordError;
use crate::repository::{HistoryRepository, RepositoryResult};
use rusqlite::Connection;
use tracing::{debug, info, instrument, warn};

const TABLE: &str = "maintenance_history";

#[derive(Debug, Default)]
pub struct HistoryIngestor;

impl HistoryIngestor {
    pub fn new() -> Self {
        Self
    }

    /// 校验并规范化单条事件（维护类型统一大写去空白）
    pub fn validate(record: &HistoryEventRecord) -> Result<NewHistoryEvent, RecordError> {
        let row = record.row_number;
        let item_code = record
            .item_code
            .filter(|c| *c > 0)
            .ok_or_else(|| RecordError::missing(row, "item_code"))?;
        let item_kind = record
            .item_kind
            .ok_or_else(|| RecordError::missing(row, "item_kind"))?;
        let reference_date = record
            .reference_date
            .ok_or_else(|| RecordError::missing(row, "reference_date"))?;
        let maintenance_type = record
            .maintenance_type
            .as_deref()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RecordError::missing(row, "maintenance_type"))?;
        let description = record
            .description
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(NewHistoryEvent {
            item_code,
            item_kind,
            reference_date,
            maintenance_type,
            description,
        })
    }

    /// 写入一批维护事件（单事务）
    #[instrument(skip_all, fields(rows = records.len()))]
    pub fn ingest(
        &self,
        conn: &mut Connection,
        records: &[HistoryEventRecord],
    ) -> RepositoryResult<PhaseReport> {
        let mut report = PhaseReport::new(SyncPhase::History);
        report.table_mut(TABLE);

        let tx = conn.transaction()?;
        {
            let repo = HistoryRepository::new(&tx);
            for record in records {
                let event = match Self::validate(record) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(row = record.row_number, error = %e, "维护事件被拒绝");
                        report.reject(TABLE, e.into_rejection(SyncPhase::History, TABLE));
                        continue;
                    }
                };

                if repo.insert_if_absent(&event)? {
                    report.table_mut(TABLE).inserted += 1;
                } else {
                    debug!(item_code = event.item_code, "维护事件已存在，跳过");
                    report.table_mut(TABLE).skipped += 1;
                }
            }
        }
        tx.commit()?;

        let stats = report.table_mut(TABLE).clone();
        info!(
            inserted = stats.inserted,
            skipped = stats.skipped,
            rejected = stats.rejected,
            "维护历史写入完成"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ItemKind, RejectionKind};
    use chrono::NaiveDate;

    fn record(row: usize, code: Option<i64>, mt: Option<&str>) -> HistoryEventRecord {
        HistoryEventRecord {
            row_number: row,
            item_code: code,
            item_kind: Some(ItemKind::Elementary),
            reference_date: NaiveDate::from_ymd_opt(2025, 7, 1),
            maintenance_type: mt.map(|s| s.to_string()),
            description: Some("  TUBO PVC  ".to_string()),
        }
    }

    #[test]
    fn test_validate_normalizes_maintenance_type() {
        let event = HistoryIngestor::validate(&record(1, Some(7001), Some(" desativação "))).unwrap();
        assert_eq!(event.maintenance_type, "DESATIVAÇÃO");
        assert_eq!(event.description.as_deref(), Some("TUBO PVC"));
    }

    #[test]
    fn test_ingest_rejects_malformed_rows_and_continues() {
        let mut conn = crate::db::open_in_memory().unwrap();
        let records = vec![
            record(1, Some(7001), Some("DESATIVAÇÃO")),
            record(2, None, Some("DESATIVAÇÃO")),
            record(3, Some(7002), None),
            record(4, Some(7003), Some("INCLUSÃO")),
        ];

        let report = HistoryIngestor::new().ingest(&mut conn, &records).unwrap();

        assert_eq!(report.tables[0].inserted, 2);
        assert_eq!(report.tables[0].rejected, 2);
        assert!(report
            .rejections
            .iter()
            .all(|r| r.kind == RejectionKind::MalformedRecord));
        assert_eq!(report.rejections[0].row_number, 2);
    }

    #[test]
    fn test_ingest_twice_is_noop() {
        let mut conn = crate::db::open_in_memory().unwrap();
        let records = vec![record(1, Some(7001), Some("DESATIVAÇÃO"))];

        HistoryIngestor::new().ingest(&mut conn, &records).unwrap();
        let second = HistoryIngestor::new().ingest(&mut conn, &records).unwrap();

        assert_eq!(second.records_inserted(), 0);
        assert_eq!(second.tables[0].skipped, 1);
        assert_eq!(HistoryRepository::new(&conn).count().unwrap(), 1);
    }
}
