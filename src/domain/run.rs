// ==========================================
// SINAPI 目录同步 - 运行报告
// ==========================================
// 职责: 阶段报告 / 行级拒绝 / 运行汇总
// 红线: 行级拒绝只收集不中断；阶段失败终止运行
// ==========================================

use crate::domain::types::{RunState, RunStatus, SyncPhase};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// RejectionKind - 行级拒绝类别
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionKind {
    MalformedRecord,      // 行本身缺陷（键缺失/值非法/批内重复）
    ReferentialIntegrity, // 引用了目录中不存在的编码
}

// ==========================================
// RecordRejection - 被排除的行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordRejection {
    pub phase: SyncPhase,
    pub table: String,
    pub row_number: usize,
    pub kind: RejectionKind,
    pub message: String,
}

// ==========================================
// TableStats - 单表写入统计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
    pub table: String,
    pub inserted: usize, // 此前不存在的新行
    pub updated: usize,  // 内容发生变化的已有行
    pub deleted: usize,  // 被移除且未重新写入的行
    pub skipped: usize,  // 已存在且保持不变的行
    pub rejected: usize, // 行级拒绝
}

impl TableStats {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Default::default()
        }
    }

    pub fn touched(&self) -> bool {
        self.inserted + self.updated + self.deleted > 0
    }

    pub fn merge(&mut self, other: &TableStats) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.skipped += other.skipped;
        self.rejected += other.rejected;
    }
}

// ==========================================
// PhaseReport - 单阶段结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub phase: SyncPhase,
    pub tables: Vec<TableStats>,
    pub rejections: Vec<RecordRejection>,
}

impl PhaseReport {
    pub fn new(phase: SyncPhase) -> Self {
        Self {
            phase,
            tables: Vec::new(),
            rejections: Vec::new(),
        }
    }

    /// 取得（或新建）指定表的统计
    pub fn table_mut(&mut self, table: &str) -> &mut TableStats {
        match self.tables.iter().position(|t| t.table == table) {
            Some(idx) => &mut self.tables[idx],
            None => {
                self.tables.push(TableStats::new(table));
                let last = self.tables.len() - 1;
                &mut self.tables[last]
            }
        }
    }

    /// 记录一条行级拒绝，并计入对应表的 rejected
    pub fn reject(&mut self, table: &str, rejection: RecordRejection) {
        self.table_mut(table).rejected += 1;
        self.rejections.push(rejection);
    }

    pub fn records_inserted(&self) -> usize {
        self.tables.iter().map(|t| t.inserted).sum()
    }
}

// ==========================================
// RunSummary - 运行汇总（对外输出契约）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub reference_date: NaiveDate,
    pub status: RunStatus,
    pub message: String,
    pub records_inserted: usize,
    pub tables_updated: Vec<String>,
    pub last_completed_phase: RunState,
    pub final_state: RunState,
    pub table_stats: Vec<TableStats>,
    pub rejections: Vec<RecordRejection>,
}

impl RunSummary {
    /// 完成但有行级排除
    pub fn has_rejections(&self) -> bool {
        !self.rejections.is_empty()
    }

    pub fn is_success(&self) -> bool {
        !matches!(self.status, RunStatus::Failure)
    }

    pub fn stats_for(&self, table: &str) -> Option<&TableStats> {
        self.table_stats.iter().find(|t| t.table == table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::SyncPhase;

    #[test]
    fn test_phase_report_reject_counts_per_table() {
        let mut report = PhaseReport::new(SyncPhase::Catalog);
        report.table_mut("elementary_item").inserted += 2;
        report.reject(
            "elementary_item",
            RecordRejection {
                phase: SyncPhase::Catalog,
                table: "elementary_item".to_string(),
                row_number: 7,
                kind: RejectionKind::MalformedRecord,
                message: "code missing".to_string(),
            },
        );

        assert_eq!(report.tables.len(), 1);
        assert_eq!(report.tables[0].rejected, 1);
        assert_eq!(report.records_inserted(), 2);
        assert!(report.tables[0].touched());
    }

    #[test]
    fn test_table_stats_merge() {
        let mut a = TableStats::new("t");
        a.inserted = 1;
        let mut b = TableStats::new("t");
        b.updated = 2;
        b.skipped = 3;
        a.merge(&b);
        assert_eq!((a.inserted, a.updated, a.skipped), (1, 2, 3));
    }
}
